// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Connection and Channel Management
//!
//! This module defines the broker surface the topology layer depends on: a connector
//! that dials the broker, the connection it returns, and the channel opened on it.
//! The traits are implemented for lapin's `Connection` and `Channel`; the connection
//! manager only sees the trait objects, which keeps the broker swappable in tests.
//!
//! Declarations always go out with empty argument tables.

use crate::{
    delivery::{Delivery, DeliveryStream},
    errors::AmqpError,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::{
    options::{BasicConsumeOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::{FieldTable, LongString},
    Channel, Connection, ConnectionProperties,
};
use tracing::{debug, error};

/// Reply code sent with a normal channel or connection close.
pub const AMQP_REPLY_SUCCESS: u16 = 200;

/// Dials the broker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AmqpConnector: Send + Sync {
    async fn connect(&self, uri: &str) -> Result<Box<dyn AmqpConnection>, lapin::Error>;
}

/// An open broker connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AmqpConnection: Send + Sync {
    async fn create_channel(&self) -> Result<Box<dyn AmqpChannel>, lapin::Error>;

    async fn close(&self, reply_code: u16, reply_text: &str) -> Result<(), lapin::Error>;
}

/// A channel opened on a broker connection.
///
/// Every call is a synchronous round trip to the broker unless the options ask
/// for no-wait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AmqpChannel: Send + Sync {
    async fn exchange_declare(
        &self,
        exchange: &str,
        kind: lapin::ExchangeKind,
        options: ExchangeDeclareOptions,
    ) -> Result<(), lapin::Error>;

    async fn queue_declare(
        &self,
        queue: &str,
        options: QueueDeclareOptions,
    ) -> Result<(), lapin::Error>;

    async fn queue_bind(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
        options: QueueBindOptions,
    ) -> Result<(), lapin::Error>;

    /// Starts a consumer and returns its delivery stream.
    ///
    /// An empty `consumer_tag` lets the broker assign one.
    async fn basic_consume(
        &self,
        queue: &str,
        consumer_tag: &str,
        options: BasicConsumeOptions,
    ) -> Result<DeliveryStream, lapin::Error>;

    async fn close(&self, reply_code: u16, reply_text: &str) -> Result<(), lapin::Error>;
}

/// Connector backed by lapin.
#[derive(Clone, Default)]
pub struct LapinConnector {
    properties: ConnectionProperties,
}

impl LapinConnector {
    /// Creates a connector that names its connections after `app_name`.
    ///
    /// The name shows up in the broker's management UI.
    pub fn new(app_name: &str) -> Self {
        LapinConnector {
            properties: ConnectionProperties::default()
                .with_connection_name(LongString::from(app_name.to_owned())),
        }
    }
}

#[async_trait]
impl AmqpConnector for LapinConnector {
    async fn connect(&self, uri: &str) -> Result<Box<dyn AmqpConnection>, lapin::Error> {
        let conn = Connection::connect(uri, self.properties.clone()).await?;
        Ok(Box::new(conn))
    }
}

#[async_trait]
impl AmqpConnection for Connection {
    async fn create_channel(&self) -> Result<Box<dyn AmqpChannel>, lapin::Error> {
        let channel = Connection::create_channel(self).await?;
        Ok(Box::new(channel))
    }

    async fn close(&self, reply_code: u16, reply_text: &str) -> Result<(), lapin::Error> {
        Connection::close(self, reply_code, reply_text).await
    }
}

#[async_trait]
impl AmqpChannel for Channel {
    async fn exchange_declare(
        &self,
        exchange: &str,
        kind: lapin::ExchangeKind,
        options: ExchangeDeclareOptions,
    ) -> Result<(), lapin::Error> {
        Channel::exchange_declare(self, exchange, kind, options, FieldTable::default()).await
    }

    async fn queue_declare(
        &self,
        queue: &str,
        options: QueueDeclareOptions,
    ) -> Result<(), lapin::Error> {
        Channel::queue_declare(self, queue, options, FieldTable::default()).await?;
        Ok(())
    }

    async fn queue_bind(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
        options: QueueBindOptions,
    ) -> Result<(), lapin::Error> {
        Channel::queue_bind(
            self,
            queue,
            exchange,
            routing_key,
            options,
            FieldTable::default(),
        )
        .await
    }

    async fn basic_consume(
        &self,
        queue: &str,
        consumer_tag: &str,
        options: BasicConsumeOptions,
    ) -> Result<DeliveryStream, lapin::Error> {
        let consumer =
            Channel::basic_consume(self, queue, consumer_tag, options, FieldTable::default())
                .await?;

        Ok(consumer
            .map(|result| {
                result
                    .map(Delivery::from)
                    .map_err(|err| AmqpError::DeliveryError(err.to_string()))
            })
            .boxed())
    }

    async fn close(&self, reply_code: u16, reply_text: &str) -> Result<(), lapin::Error> {
        Channel::close(self, reply_code, reply_text).await
    }
}

/// Dials the broker at `uri` and opens one channel on the new connection.
///
/// When the channel cannot be opened the connection is dropped without an explicit
/// close.
pub async fn new_amqp_channel(
    connector: &dyn AmqpConnector,
    uri: &str,
) -> Result<(Box<dyn AmqpConnection>, Box<dyn AmqpChannel>), AmqpError> {
    debug!("creating amqp connection...");
    let conn = match connector.connect(uri).await {
        Ok(c) => Ok(c),
        Err(err) => {
            error!(error = err.to_string(), "failure to connect");
            Err(AmqpError::ConnectionError(err.to_string()))
        }
    }?;
    debug!("amqp connected");

    debug!("creating amqp channel...");
    match conn.create_channel().await {
        Ok(c) => {
            debug!("channel created");
            Ok((conn, c))
        }
        Err(err) => {
            error!(error = err.to_string(), "error to create the channel");
            Err(AmqpError::ChannelError(err.to_string()))
        }
    }
}
