// Copyright (c) 2025 - Cowboy AI, Inc.
//! Token Projector Service
//!
//! Listens to NATS JetStream aggregate events and projects them into the
//! platform-states and token-generation-states key-value buckets.
//!
//! - Events → JetStream → Consumer → Projector → NATS KV buckets
//!
//! Run with: cargo run --bin token-projector
//!
//! Prerequisites:
//! 1. NATS server with JetStream enabled (default: localhost:4222)
//! 2. Optional overrides through NATS_URL, NATS_STREAM, NATS_CONSUMER,
//!    PLATFORM_STATES_TABLE, TOKEN_GENERATION_STATES_TABLE, BATCH_SIZE, ...

use anyhow::{Context, Result};
use async_nats::jetstream::{self, AckKind};
use authz_state_projector::{
    config::ProjectorConfig,
    events::EventEnvelope,
    jetstream::{create_consumer, create_event_stream, open_projector, Disposition, JetStreamConfig},
    Outcome, ProjectionError,
};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting Token Projector Service");

    let config = ProjectorConfig::from_env().context("Invalid projector configuration")?;
    let js_config = JetStreamConfig::from_env().context("Invalid JetStream configuration")?;
    info!("Configuration loaded:");
    info!("  - NATS URL: {}", js_config.nats_url);
    info!("  - Stream: {}", js_config.stream_name);
    info!("  - Consumer: {}", js_config.consumer_name);
    info!("  - Platform states bucket: {}", config.platform_states_table);
    info!("  - Token generation states bucket: {}", config.token_generation_states_table);

    info!("Connecting to NATS at {}", js_config.nats_url);
    let client = async_nats::connect(&js_config.nats_url)
        .await
        .context("Failed to connect to NATS")?;
    let jetstream = jetstream::new(client);

    let stream = create_event_stream(&jetstream, &js_config)
        .await
        .context("Failed to set up event stream")?;
    let consumer = create_consumer(&stream, &js_config)
        .await
        .context("Failed to set up consumer")?;
    let projector = open_projector(&jetstream, &config)
        .await
        .context("Failed to open key-value buckets")?;
    info!("Projector ready");

    let messages = consumer
        .stream()
        .max_messages_per_batch(10)
        .messages()
        .await
        .context("Failed to start consuming messages")?;

    tokio::pin!(messages);

    let mut event_count = 0u64;
    let mut error_count = 0u64;

    while let Some(message) = messages.next().await {
        let msg = match message {
            Ok(msg) => msg,
            Err(e) => {
                error_count += 1;
                error!("Error receiving message: {} (total errors: {})", e, error_count);
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        debug!("Received message from subject: {}", msg.subject);

        let result = match js_config.aggregate_for_subject(&msg.subject) {
            Some(aggregate) => match EventEnvelope::from_slice(&msg.payload) {
                Ok(envelope) => projector.dispatch(aggregate, &envelope).await,
                Err(e) => Err(e),
            },
            None => Err(ProjectionError::Configuration(format!(
                "no aggregate routed for subject {}",
                msg.subject
            ))),
        };

        match &result {
            Ok(outcome) => {
                event_count += 1;
                if *outcome == Outcome::Applied {
                    debug!("Projected message from {} (total: {})", msg.subject, event_count);
                }
            }
            Err(e) => {
                error_count += 1;
                error!(
                    subject = %msg.subject,
                    retryable = e.is_retryable(),
                    "Failed to project event: {} (total errors: {})",
                    e,
                    error_count
                );
            }
        }

        let acked = match Disposition::for_result(&result) {
            Disposition::Ack => msg.ack().await,
            Disposition::Nak => msg.ack_with(AckKind::Nak(None)).await,
            Disposition::Term => msg.ack_with(AckKind::Term).await,
        };
        if let Err(e) = acked {
            error!("Failed to acknowledge message: {}", e);
        }

        if (event_count + error_count) % 100 == 0 {
            info!(
                "Statistics: {} events processed, {} errors",
                event_count, error_count
            );
        }
    }

    warn!("Message stream ended unexpectedly");
    Ok(())
}
