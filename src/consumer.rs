// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Delivery Consumption
//!
//! Runs a single delivery through a handler inside an OpenTelemetry consumer span.
//! Deliveries arrive already acknowledged (auto-ack), so a failing handler cannot
//! requeue the message; the failure is recorded on the span and reported through
//! the error reporter instead.

use crate::{
    delivery::Delivery, dispatcher::DeliveryHandler, errors::AmqpError, otel,
    reporter::ErrorReporter,
};
use opentelemetry::{
    global::BoxedTracer,
    trace::{Span, Status},
};
use std::borrow::Cow;
use tracing::{debug, error};

/// Hands `delivery`, received from `queue`, to `handler`.
pub(crate) async fn consume(
    tracer: &BoxedTracer,
    queue: &str,
    delivery: &Delivery,
    handler: &dyn DeliveryHandler,
    errors: &ErrorReporter,
) -> Result<(), AmqpError> {
    let (ctx, mut span) = otel::new_span(&delivery.properties, tracer, queue);

    debug!(
        "received: {} - exchange: {} - queue: {}",
        delivery.routing_key, delivery.exchange, queue,
    );

    match handler.handle(&ctx, queue, delivery).await {
        Ok(()) => {
            debug!("message successfully processed");
            span.set_status(Status::Ok);
            Ok(())
        }
        Err(err) => {
            error!(
                error = err.to_string(),
                queue,
                routing_key = delivery.routing_key.as_str(),
                "error whiling handling msg"
            );
            span.record_error(&err);
            span.set_status(Status::Error {
                description: Cow::from(err.to_string()),
            });
            errors.raise(err.clone());
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use opentelemetry::{global, Context};

    struct Failing;

    #[async_trait]
    impl DeliveryHandler for Failing {
        async fn handle(&self, _: &Context, queue: &str, _: &Delivery) -> Result<(), AmqpError> {
            Err(AmqpError::ConsumerError(queue.to_owned()))
        }
    }

    struct Succeeding;

    #[async_trait]
    impl DeliveryHandler for Succeeding {
        async fn handle(&self, _: &Context, _: &str, _: &Delivery) -> Result<(), AmqpError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn handler_failure_is_reported() {
        let (reporter, mut errors) = ErrorReporter::channel(4);
        let delivery = Delivery::new(7, "logs", "error.detail", b"disk full".to_vec());

        let result = consume(
            &global::tracer("test"),
            "error",
            &delivery,
            &Failing,
            &reporter,
        )
        .await;

        assert_eq!(result, Err(AmqpError::ConsumerError("error".into())));
        assert_eq!(
            errors.try_recv().ok(),
            Some(AmqpError::ConsumerError("error".into()))
        );
    }

    #[tokio::test]
    async fn handler_success_reports_nothing() {
        let (reporter, mut errors) = ErrorReporter::channel(4);
        let delivery = Delivery::new(1, "logs", "info.debug", vec![]);

        let result = consume(
            &global::tracer("test"),
            "info",
            &delivery,
            &Succeeding,
            &reporter,
        )
        .await;

        assert!(result.is_ok());
        assert!(errors.try_recv().is_err());
    }
}
