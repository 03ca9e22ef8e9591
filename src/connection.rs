// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Connection Manager
//!
//! The `ConnectionManager` owns one broker connection, the channel opened on it, the
//! topic exchange both are bound to, and the registry of queues declared through it.
//!
//! Lifecycle:
//! 1. `ConnectionManager::new` creates an uninitialized manager.
//! 2. `init_connection` dials the broker, opens the channel and declares the exchange.
//! 3. `add_queue` / `add_queues` register queues, declaring and binding each one.
//! 4. `consume` starts one auto-ack consumer per registered queue.
//! 5. `close_channel` and `close_connection` release the broker resources.
//!
//! Registry mutation takes `&mut self`, so the topology has to be built by a single
//! owner before the manager is shared with the tasks draining the delivery streams.
//!
//! Registering a queue name twice overwrites the registry entry but never removes
//! bindings from the broker: broker-side bindings are the union of every key set
//! registered under that name.

use crate::{
    channel::{
        new_amqp_channel, AmqpChannel, AmqpConnection, AmqpConnector, LapinConnector,
        AMQP_REPLY_SUCCESS,
    },
    delivery::DeliveryStream,
    errors::AmqpError,
    exchange::ExchangeDefinition,
    queue::Queue,
    reporter::{ErrorReporter, DEFAULT_ERROR_CAPACITY},
    topology::AmqpTopology,
};
use lapin::options::BasicConsumeOptions;
use std::collections::HashMap;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info, warn};

/// Consumer options used for every queue: auto-ack, not exclusive, confirmed by
/// the broker. Deliveries count as acknowledged as soon as they are dispatched.
pub const CONSUME_OPTIONS: BasicConsumeOptions = BasicConsumeOptions {
    no_local: false,
    no_ack: true,
    exclusive: false,
    nowait: false,
};

const CLOSE_REPLY_TEXT: &str = "Normal shutdown";

struct Session {
    connection: Box<dyn AmqpConnection>,
    channel: Box<dyn AmqpChannel>,
    exchange: String,
}

pub struct ConnectionManager {
    connector: Box<dyn AmqpConnector>,
    session: Option<Session>,
    queues: HashMap<String, Queue>,
    reporter: ErrorReporter,
    errors: Option<Receiver<AmqpError>>,
}

impl ConnectionManager {
    /// Creates an uninitialized manager that dials through `connector`.
    pub fn new(connector: impl AmqpConnector + 'static) -> Self {
        Self::with_error_capacity(connector, DEFAULT_ERROR_CAPACITY)
    }

    /// Like `new`, buffering at most `capacity` reported errors.
    pub fn with_error_capacity(connector: impl AmqpConnector + 'static, capacity: usize) -> Self {
        let (reporter, errors) = ErrorReporter::channel(capacity);

        ConnectionManager {
            connector: Box::new(connector),
            session: None,
            queues: HashMap::default(),
            reporter,
            errors: Some(errors),
        }
    }

    /// Connects to `url`, opens the channel and declares `exchange` as a durable
    /// topic exchange.
    ///
    /// On success the connection, channel, exchange and a fresh empty registry
    /// replace whatever the manager held before. On failure the manager is left
    /// untouched; a connection opened before a channel or exchange failure is not
    /// closed here.
    pub async fn init_connection(&mut self, url: &str, exchange: &str) -> Result<(), AmqpError> {
        let (connection, channel) = new_amqp_channel(self.connector.as_ref(), url).await?;

        AmqpTopology::new(channel.as_ref())
            .install_exchange(&ExchangeDefinition::durable_topic(exchange))
            .await?;

        self.session = Some(Session {
            connection,
            channel,
            exchange: exchange.to_owned(),
        });
        self.queues = HashMap::default();

        info!(exchange, "amqp connection initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Name of the exchange queues are bound to, once initialized.
    pub fn exchange(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.exchange.as_str())
    }

    /// Registers `queue`, declares it and binds it once per routing key.
    ///
    /// The registry entry is written before the broker calls, so it survives a
    /// failed declaration or binding. Nothing already declared or bound is undone.
    pub async fn add_queue(&mut self, queue: Queue) -> Result<(), AmqpError> {
        let session = self.session.as_ref().ok_or(AmqpError::NotInitialized)?;

        if queue.name.is_empty() {
            error!("refusing to declare a queue without a name");
            return Err(AmqpError::DeclareQueueError(
                String::new(),
                "queue name must not be empty".to_owned(),
            ));
        }

        if let Some(previous) = self.queues.insert(queue.name.clone(), queue.clone()) {
            if previous != queue {
                warn!(
                    queue = queue.name.as_str(),
                    "queue re-registered with different keys, previous bindings are kept"
                );
            }
        }

        AmqpTopology::new(session.channel.as_ref())
            .install_queue(&queue, &session.exchange)
            .await
    }

    /// Registers queues in order, stopping at the first failure.
    ///
    /// Queues before the failing one stay registered and declared on the broker.
    pub async fn add_queues<I>(&mut self, queues: I) -> Result<(), AmqpError>
    where
        I: IntoIterator<Item = Queue>,
    {
        for queue in queues {
            self.add_queue(queue).await?;
        }

        Ok(())
    }

    /// Looks up a registered queue by name. Never touches the broker.
    pub fn get_queue(&self, name: &str) -> Result<&Queue, AmqpError> {
        self.queues
            .get(name)
            .ok_or_else(|| AmqpError::QueueNotFound(name.to_owned()))
    }

    pub fn queues(&self) -> impl Iterator<Item = &Queue> {
        self.queues.values()
    }

    /// Starts one consumer per registered queue and returns their delivery streams
    /// keyed by queue name.
    ///
    /// Consumers are registered one after the other. If any registration fails the
    /// error is returned and no streams are handed out; consumers started earlier
    /// in the same call keep running on the broker until the channel closes.
    pub async fn consume(&self) -> Result<HashMap<String, DeliveryStream>, AmqpError> {
        let session = self.session.as_ref().ok_or(AmqpError::NotInitialized)?;
        let mut deliveries = HashMap::with_capacity(self.queues.len());

        for name in self.queues.keys() {
            debug!("creating consumer for queue: {}", name);

            let stream = match session.channel.basic_consume(name, "", CONSUME_OPTIONS).await {
                Err(err) => {
                    error!(
                        error = err.to_string(),
                        queue = name.as_str(),
                        "failure to create the consumer"
                    );
                    Err(AmqpError::BindingConsumerError(
                        name.clone(),
                        err.to_string(),
                    ))
                }
                Ok(s) => Ok(s),
            }?;

            deliveries.insert(name.clone(), stream);
        }

        Ok(deliveries)
    }

    /// Closes the channel. Every delivery stream on it ends.
    pub async fn close_channel(&self) -> Result<(), AmqpError> {
        let session = self.session.as_ref().ok_or(AmqpError::NotInitialized)?;

        debug!("closing amqp channel...");
        session
            .channel
            .close(AMQP_REPLY_SUCCESS, CLOSE_REPLY_TEXT)
            .await
            .map_err(|err| {
                error!(error = err.to_string(), "failure to close channel");
                AmqpError::CloseChannelError(err.to_string())
            })
    }

    /// Closes the connection, and with it any channel still open on it.
    pub async fn close_connection(&self) -> Result<(), AmqpError> {
        let session = self.session.as_ref().ok_or(AmqpError::NotInitialized)?;

        debug!("closing amqp connection...");
        session
            .connection
            .close(AMQP_REPLY_SUCCESS, CLOSE_REPLY_TEXT)
            .await
            .map_err(|err| {
                error!(error = err.to_string(), "failure to close connection");
                AmqpError::CloseConnectionError(err.to_string())
            })
    }

    /// Reports an error raised outside a synchronous call. Never blocks; returns
    /// false when the error had to be dropped.
    pub fn raise_error(&self, err: AmqpError) -> bool {
        self.reporter.raise(err)
    }

    /// A reporter feeding the same channel as `raise_error`, for consumer tasks.
    pub fn error_reporter(&self) -> ErrorReporter {
        self.reporter.clone()
    }

    /// Hands out the receiving side of the error channel. Only the first call
    /// gets it.
    pub fn take_error_receiver(&mut self) -> Option<Receiver<AmqpError>> {
        self.errors.take()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        ConnectionManager::new(LapinConnector::default())
    }
}
