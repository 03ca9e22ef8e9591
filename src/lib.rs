// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

mod consumer;
mod otel;

pub mod channel;
pub mod configs;
pub mod connection;
pub mod delivery;
pub mod dispatcher;
pub mod errors;
pub mod exchange;
pub mod queue;
pub mod reporter;
pub mod topology;

pub use connection::ConnectionManager;
pub use delivery::{Delivery, DeliveryStream};
pub use errors::AmqpError;
pub use queue::Queue;
