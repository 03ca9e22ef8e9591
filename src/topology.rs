// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Topology Installation
//!
//! This module issues the broker round trips that build the topology: the exchange
//! declaration, queue declarations and queue-to-exchange bindings. Each call is
//! awaited before the next one starts, so a queue is always declared before any
//! of its bindings and bindings go out in key order.
//!
//! Nothing here is rolled back. When a call fails, whatever was declared or bound
//! before it stays on the broker.

use crate::{
    channel::AmqpChannel,
    errors::AmqpError,
    exchange::ExchangeDefinition,
    queue::{Queue, QueueBinding},
};
use lapin::options::{QueueBindOptions, QueueDeclareOptions};
use tracing::{debug, error};

/// Declaration options for every queue registered through the manager: durable,
/// not auto-deleted, not exclusive, confirmed by the broker.
pub const QUEUE_DECLARE_OPTIONS: QueueDeclareOptions = QueueDeclareOptions {
    passive: false,
    durable: true,
    exclusive: false,
    auto_delete: false,
    nowait: false,
};

/// Installs exchanges, queues and bindings through one channel.
pub struct AmqpTopology<'tp> {
    channel: &'tp dyn AmqpChannel,
}

impl<'tp> AmqpTopology<'tp> {
    pub fn new(channel: &'tp dyn AmqpChannel) -> AmqpTopology<'tp> {
        AmqpTopology { channel }
    }

    /// Declares the exchange described by `def`.
    pub async fn install_exchange(&self, def: &ExchangeDefinition<'_>) -> Result<(), AmqpError> {
        debug!("creating exchange: {}", def.name);

        match self
            .channel
            .exchange_declare(def.name, def.kind.into(), def.options())
            .await
        {
            Err(err) => {
                error!(
                    error = err.to_string(),
                    name = def.name,
                    "error to declare the exchange"
                );
                Err(AmqpError::DeclareExchangeError(
                    def.name.to_owned(),
                    err.to_string(),
                ))
            }
            _ => {
                debug!("exchange: {} was created", def.name);
                Ok(())
            }
        }
    }

    /// Declares `queue` and binds it to `exchange` once per routing key.
    ///
    /// The first failing binding stops the remaining ones.
    pub async fn install_queue(&self, queue: &Queue, exchange: &str) -> Result<(), AmqpError> {
        self.declare_queue(queue).await?;

        for binding in queue.bindings(exchange) {
            self.bind_queue(&binding).await?;
        }

        Ok(())
    }

    async fn declare_queue(&self, queue: &Queue) -> Result<(), AmqpError> {
        debug!("creating queue: {}", queue.name);

        match self
            .channel
            .queue_declare(&queue.name, QUEUE_DECLARE_OPTIONS)
            .await
        {
            Err(err) => {
                error!(
                    error = err.to_string(),
                    name = queue.name.as_str(),
                    "error to declare the queue"
                );
                Err(AmqpError::DeclareQueueError(
                    queue.name.clone(),
                    err.to_string(),
                ))
            }
            _ => {
                debug!("queue: {} was created", queue.name);
                Ok(())
            }
        }
    }

    async fn bind_queue(&self, binding: &QueueBinding<'_>) -> Result<(), AmqpError> {
        debug!(
            "binding queue: {} to the exchange: {} with the key: {}",
            binding.queue_name, binding.exchange_name, binding.routing_key
        );

        match self
            .channel
            .queue_bind(
                binding.queue_name,
                binding.exchange_name,
                binding.routing_key,
                QueueBindOptions { nowait: false },
            )
            .await
        {
            Err(err) => {
                error!(error = err.to_string(), "error to bind queue to exchange");

                Err(AmqpError::BindingExchangeToQueueError {
                    exchange: binding.exchange_name.to_owned(),
                    queue: binding.queue_name.to_owned(),
                    key: binding.routing_key.to_owned(),
                    reason: err.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}
