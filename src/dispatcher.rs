// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Delivery Dispatcher
//!
//! Fans the delivery streams returned by `ConnectionManager::consume` out to one
//! task per queue. Each task drains its own stream and calls the registered
//! `DeliveryHandler` for every delivery, one at a time. Handler failures and
//! broker-side stream errors are logged and pushed through the error reporter; they
//! never stop the task.
//!
//! A task ends when its stream ends, which happens when the channel or connection
//! is closed or the broker cancels the consumer.

use crate::{
    consumer::consume,
    delivery::{Delivery, DeliveryStream},
    errors::AmqpError,
    reporter::ErrorReporter,
};
use async_trait::async_trait;
use futures_util::{future::join_all, StreamExt};
use opentelemetry::{global, Context};
use std::{collections::HashMap, sync::Arc};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Processes deliveries for one or more queues.
#[async_trait]
pub trait DeliveryHandler: Send + Sync {
    /// Handles one delivery received from `queue`.
    ///
    /// `ctx` carries the trace context propagated by the publisher, if any.
    async fn handle(
        &self,
        ctx: &Context,
        queue: &str,
        delivery: &Delivery,
    ) -> Result<(), AmqpError>;
}

pub struct Dispatcher {
    handler: Arc<dyn DeliveryHandler>,
    errors: ErrorReporter,
}

impl Dispatcher {
    pub fn new(handler: Arc<dyn DeliveryHandler>, errors: ErrorReporter) -> Self {
        Dispatcher { handler, errors }
    }

    /// Spawns one task per queue and returns their handles keyed by queue name.
    pub fn spawn(
        &self,
        streams: HashMap<String, DeliveryStream>,
    ) -> HashMap<String, JoinHandle<()>> {
        streams
            .into_iter()
            .map(|(queue, stream)| {
                let handle = tokio::spawn(drain(
                    queue.clone(),
                    stream,
                    self.handler.clone(),
                    self.errors.clone(),
                ));
                (queue, handle)
            })
            .collect()
    }

    /// Spawns the queue tasks and waits until every stream has ended.
    pub async fn run(&self, streams: HashMap<String, DeliveryStream>) -> Result<(), AmqpError> {
        let spawned = join_all(self.spawn(streams).into_values()).await;

        for res in spawned {
            if let Err(err) = res {
                error!(error = err.to_string(), "tokio process error");
                return Err(AmqpError::ConsumerError(err.to_string()));
            }
        }

        Ok(())
    }
}

async fn drain(
    queue: String,
    mut stream: DeliveryStream,
    handler: Arc<dyn DeliveryHandler>,
    errors: ErrorReporter,
) {
    let tracer = global::tracer("amqp consumer");
    debug!("consuming queue: {}", queue);

    while let Some(result) = stream.next().await {
        match result {
            Ok(delivery) => {
                // failures are already logged and reported by consume
                let _ = consume(&tracer, &queue, &delivery, handler.as_ref(), &errors).await;
            }
            Err(err) => {
                error!(
                    error = err.to_string(),
                    queue = queue.as_str(),
                    "errors consume msg"
                );
                errors.raise(err);
            }
        }
    }

    debug!("delivery stream for queue: {} ended", queue);
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl DeliveryHandler for Recorder {
        async fn handle(
            &self,
            _: &Context,
            queue: &str,
            delivery: &Delivery,
        ) -> Result<(), AmqpError> {
            self.seen
                .lock()
                .unwrap()
                .push((queue.to_owned(), delivery.body_lossy().into_owned()));

            if delivery.data == b"bad" {
                return Err(AmqpError::ConsumerError("bad payload".into()));
            }
            Ok(())
        }
    }

    fn stream_of(items: Vec<Result<Delivery, AmqpError>>) -> DeliveryStream {
        stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn every_delivery_reaches_the_handler_of_its_queue() {
        let recorder = Arc::new(Recorder::default());
        let (reporter, mut errors) = ErrorReporter::channel(8);
        let dispatcher = Dispatcher::new(recorder.clone(), reporter);

        let mut streams = HashMap::new();
        streams.insert(
            "error".to_owned(),
            stream_of(vec![
                Ok(Delivery::new(1, "logs", "error.detail", b"e1".to_vec())),
                Ok(Delivery::new(2, "logs", "error.detail", b"e2".to_vec())),
            ]),
        );
        streams.insert(
            "info".to_owned(),
            stream_of(vec![Ok(Delivery::new(1, "logs", "info.debug", b"i1".to_vec()))]),
        );

        dispatcher.run(streams).await.unwrap();

        let mut seen = recorder.seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(
            seen,
            vec![
                ("error".to_owned(), "e1".to_owned()),
                ("error".to_owned(), "e2".to_owned()),
                ("info".to_owned(), "i1".to_owned()),
            ]
        );
        assert!(errors.try_recv().is_err());
    }

    #[tokio::test]
    async fn failures_are_reported_and_consumption_continues() {
        let recorder = Arc::new(Recorder::default());
        let (reporter, mut errors) = ErrorReporter::channel(8);
        let dispatcher = Dispatcher::new(recorder.clone(), reporter);

        let mut streams = HashMap::new();
        streams.insert(
            "error".to_owned(),
            stream_of(vec![
                Ok(Delivery::new(1, "logs", "error.detail", b"bad".to_vec())),
                Err(AmqpError::DeliveryError("consumer canceled".into())),
                Ok(Delivery::new(2, "logs", "error.detail", b"ok".to_vec())),
            ]),
        );

        dispatcher.run(streams).await.unwrap();

        assert_eq!(recorder.seen.lock().unwrap().len(), 2);
        assert_eq!(
            errors.try_recv().ok(),
            Some(AmqpError::ConsumerError("bad payload".into()))
        );
        assert_eq!(
            errors.try_recv().ok(),
            Some(AmqpError::DeliveryError("consumer canceled".into()))
        );
    }

    #[tokio::test]
    async fn no_streams_finishes_immediately() {
        let (reporter, _errors) = ErrorReporter::channel(1);
        let dispatcher = Dispatcher::new(Arc::new(Recorder::default()), reporter);

        assert!(dispatcher.spawn(HashMap::new()).is_empty());
        assert!(dispatcher.run(HashMap::new()).await.is_ok());
    }
}
