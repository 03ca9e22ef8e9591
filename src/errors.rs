// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types for the RabbitMQ Topology Layer
//!
//! This module provides the error type returned by every broker-facing operation.
//! The `AmqpError` enum covers connection and channel setup, exchange and queue
//! declaration, bindings, consumer registration, registry lookups and close
//! operations. Variants carry the underlying transport error message so callers
//! can surface it without holding on to lapin types.

use thiserror::Error;

/// Represents errors that can occur while managing the broker topology.
///
/// Every variant is returned to the immediate caller; nothing is retried or
/// swallowed internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmqpError {
    /// The manager was used before `init_connection` succeeded
    #[error("connection was not initialized")]
    NotInitialized,

    /// Error dialing the RabbitMQ server
    #[error("failure to connect: {0}")]
    ConnectionError(String),

    /// Error opening a channel on an established connection
    #[error("failure to create a channel: {0}")]
    ChannelError(String),

    /// Error declaring an exchange with the given name
    #[error("failure to declare an exchange `{0}`: {1}")]
    DeclareExchangeError(String, String),

    /// Error declaring a queue with the given name
    #[error("failure to declare a queue `{0}`: {1}")]
    DeclareQueueError(String, String),

    /// Error binding a queue to the exchange with a routing key
    #[error("failure to bind exchange `{exchange}` to queue `{queue}` with key `{key}`: {reason}")]
    BindingExchangeToQueueError {
        exchange: String,
        queue: String,
        key: String,
        reason: String,
    },

    /// Error registering a consumer on a queue
    #[error("failure to declare consumer for queue `{0}`: {1}")]
    BindingConsumerError(String, String),

    /// No queue with the given name was registered
    #[error("queue `{0}` not found")]
    QueueNotFound(String),

    /// Error closing the channel
    #[error("failure to close channel: {0}")]
    CloseChannelError(String),

    /// Error closing the connection
    #[error("failure to close connection: {0}")]
    CloseConnectionError(String),

    /// Error reported by the broker while a delivery stream was being read
    #[error("failure to receive delivery: {0}")]
    DeliveryError(String),

    /// Error returned by a delivery handler
    #[error("failure to consume message `{0}`")]
    ConsumerError(String),
}

impl AmqpError {
    /// Returns true for exchange/queue declaration and binding failures.
    pub fn is_topology(&self) -> bool {
        matches!(
            self,
            AmqpError::DeclareExchangeError(..)
                | AmqpError::DeclareQueueError(..)
                | AmqpError::BindingExchangeToQueueError { .. }
        )
    }
}
