// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Asynchronous Error Reporting
//!
//! Errors that happen outside a synchronous call, typically inside a task draining a
//! delivery stream, are pushed through an `ErrorReporter`. The channel is bounded and
//! sends never wait: when the buffer is full or nobody holds the receiver, the error
//! is logged and dropped.

use crate::errors::AmqpError;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tracing::warn;

/// Default number of reported errors buffered before new ones are dropped.
pub const DEFAULT_ERROR_CAPACITY: usize = 64;

/// Sending half of the error-reporting channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    sender: Sender<AmqpError>,
}

impl ErrorReporter {
    /// Creates a reporter and the receiver that drains it.
    ///
    /// A capacity of zero is raised to one.
    pub fn channel(capacity: usize) -> (ErrorReporter, Receiver<AmqpError>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (ErrorReporter { sender }, receiver)
    }

    /// Reports `err` without waiting. Returns false if the error was dropped.
    pub fn raise(&self, err: AmqpError) -> bool {
        match self.sender.try_send(err) {
            Ok(()) => true,
            Err(TrySendError::Full(err)) => {
                warn!(error = err.to_string(), "error channel is full, dropping error");
                false
            }
            Err(TrySendError::Closed(err)) => {
                warn!(error = err.to_string(), "error channel has no receiver, dropping error");
                false
            }
        }
    }
}
