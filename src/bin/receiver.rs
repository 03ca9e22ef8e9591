// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Declares the configured topology and logs every message delivered to its queues
//! until Ctrl+C, then closes the channel and the connection.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use opentelemetry::Context;
use rabbitmq_tools::{
    channel::LapinConnector,
    configs::RabbitMQConfigs,
    dispatcher::{DeliveryHandler, Dispatcher},
    AmqpError, ConnectionManager, Delivery,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

struct LogHandler;

#[async_trait]
impl DeliveryHandler for LogHandler {
    async fn handle(
        &self,
        _: &Context,
        queue: &str,
        delivery: &Delivery,
    ) -> Result<(), AmqpError> {
        info!(
            queue,
            routing_key = delivery.routing_key.as_str(),
            "Received a message: {}",
            delivery.body_lossy()
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = RabbitMQConfigs::load().context("failed to load configuration")?;

    let mut manager = ConnectionManager::with_error_capacity(
        LapinConnector::new(&cfg.app_name),
        cfg.error_capacity,
    );
    manager
        .init_connection(&cfg.uri(), &cfg.exchange)
        .await
        .context("failed to initialize the broker connection")?;
    info!("Connected");

    let mut errors = manager
        .take_error_receiver()
        .context("error receiver already taken")?;
    tokio::spawn(async move {
        while let Some(err) = errors.recv().await {
            error!(error = err.to_string(), "consumer error");
        }
    });

    manager
        .add_queues(cfg.queues.clone())
        .await
        .context("failed to declare the queues")?;

    let deliveries = manager.consume().await.context("failed to start consumers")?;
    let dispatcher = Dispatcher::new(Arc::new(LogHandler), manager.error_reporter());
    let handles = dispatcher.spawn(deliveries);

    info!(" [*] Waiting for messages. To exit press CTRL+C");
    tokio::signal::ctrl_c().await?;

    let closed_channel = manager.close_channel().await;
    let closed_connection = manager.close_connection().await;

    for (queue, handle) in handles {
        if let Err(err) = handle.await {
            error!(
                error = err.to_string(),
                queue = queue.as_str(),
                "consumer task failed"
            );
        }
    }

    closed_channel.context("failed to close channel")?;
    closed_connection.context("failed to close connection")?;

    Ok(())
}
