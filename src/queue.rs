// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Definitions
//!
//! This module provides the `Queue` value handed to the connection manager: a queue
//! name plus the ordered routing-key patterns it should be bound with. A `Queue`
//! never talks to the broker itself; declaring and binding is done by the manager.

use serde::{Deserialize, Serialize};

/// A named queue and the routing-key patterns used to bind it to the exchange.
///
/// Keys keep insertion order and are not deduplicated. Patterns use the broker's
/// topic syntax (`*` matches one segment, `#` matches zero or more).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Queue {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) keys: Vec<String>,
}

impl Queue {
    /// Creates a queue with no routing keys.
    ///
    /// A queue without keys is declared on the broker but never bound.
    pub fn new(name: &str) -> Queue {
        Queue {
            name: name.to_owned(),
            keys: vec![],
        }
    }

    /// Creates a queue with the given routing keys.
    pub fn with_keys<I, K>(name: &str, keys: I) -> Queue
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let mut queue = Queue::new(name);
        queue.add_keys(keys);
        queue
    }

    /// Adds a routing key, returning self for method chaining.
    pub fn key(mut self, key: &str) -> Self {
        self.add_key(key);
        self
    }

    /// Appends one routing-key pattern.
    pub fn add_key(&mut self, key: impl Into<String>) {
        self.keys.push(key.into());
    }

    /// Appends routing-key patterns in order.
    pub fn add_keys<I, K>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.keys.extend(keys.into_iter().map(Into::into));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Returns one binding per routing key against `exchange`, in key order.
    pub fn bindings<'q>(&'q self, exchange: &'q str) -> impl Iterator<Item = QueueBinding<'q>> {
        self.keys.iter().map(move |key| {
            QueueBinding::new(&self.name)
                .exchange(exchange)
                .routing_key(key)
        })
    }
}

/// Configuration for binding a queue to an exchange.
///
/// Queue bindings define how messages flow from exchanges to queues based on
/// routing keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueBinding<'qeb> {
    pub(crate) queue_name: &'qeb str,
    pub(crate) exchange_name: &'qeb str,
    pub(crate) routing_key: &'qeb str,
}

impl<'qeb> QueueBinding<'qeb> {
    /// Creates a new queue binding for the given queue.
    ///
    /// By default, the exchange name and routing key are empty strings.
    /// These should be set using the `exchange` and `routing_key` methods.
    pub fn new(queue: &'qeb str) -> QueueBinding<'qeb> {
        QueueBinding {
            queue_name: queue,
            exchange_name: "",
            routing_key: "",
        }
    }

    /// Sets the exchange to bind the queue to.
    pub fn exchange(mut self, exchange: &'qeb str) -> Self {
        self.exchange_name = exchange;
        self
    }

    /// Sets the routing key for the binding.
    pub fn routing_key(mut self, key: &'qeb str) -> Self {
        self.routing_key = key;
        self
    }
}
