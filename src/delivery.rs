// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Delivery Records
//!
//! A `Delivery` is one message handed from the broker to a consumer: the body plus
//! the metadata the broker attaches to it. Consumers run in auto-acknowledge mode,
//! so the record carries no acker.

use crate::errors::AmqpError;
use futures_util::stream::BoxStream;
use lapin::BasicProperties;

/// Lazy, non-restartable sequence of deliveries for one queue.
///
/// The stream ends when the owning channel or connection is closed, the queue is
/// deleted, or the broker cancels the consumer.
pub type DeliveryStream = BoxStream<'static, Result<Delivery, AmqpError>>;

#[derive(Debug, Clone)]
pub struct Delivery {
    pub delivery_tag: u64,
    pub exchange: String,
    pub routing_key: String,
    pub redelivered: bool,
    pub properties: BasicProperties,
    pub data: Vec<u8>,
}

impl Delivery {
    /// Builds a delivery with default properties.
    pub fn new(delivery_tag: u64, exchange: &str, routing_key: &str, data: Vec<u8>) -> Self {
        Delivery {
            delivery_tag,
            exchange: exchange.to_owned(),
            routing_key: routing_key.to_owned(),
            redelivered: false,
            properties: BasicProperties::default(),
            data,
        }
    }

    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn body_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

impl From<lapin::message::Delivery> for Delivery {
    fn from(delivery: lapin::message::Delivery) -> Self {
        Delivery {
            delivery_tag: delivery.delivery_tag,
            exchange: delivery.exchange.to_string(),
            routing_key: delivery.routing_key.to_string(),
            redelivered: delivery.redelivered,
            properties: delivery.properties,
            data: delivery.data,
        }
    }
}
