// Copyright (c) 2025 - Cowboy AI, Inc.

//! JetStream wiring for the projector service
//!
//! Events arrive on a persistent stream with one subject per aggregate type.
//! A single durable pull consumer feeds them to the [`Projector`] one at a
//! time, which keeps the per-aggregate ordering the stream provides.
//!
//! # Subjects
//!
//! ```text
//! events.agreement      -> AggregateKind::Agreement
//! events.purpose        -> AggregateKind::Purpose
//! events.catalog        -> AggregateKind::Catalog
//! events.authorization  -> AggregateKind::Authorization
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use authz_state_projector::config::ProjectorConfig;
//! use authz_state_projector::jetstream::{create_event_stream, open_projector, JetStreamConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = async_nats::connect("nats://localhost:4222").await?;
//!     let jetstream = async_nats::jetstream::new(client);
//!
//!     let config = JetStreamConfig::default();
//!     let _stream = create_event_stream(&jetstream, &config).await?;
//!     let _projector = open_projector(&jetstream, &ProjectorConfig::default()).await?;
//!
//!     Ok(())
//! }
//! ```

use async_nats::jetstream::{self, consumer::PullConsumer, stream::Stream};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ProjectorConfig;
use crate::consumers::{AggregateKind, Outcome, Projector};
use crate::errors::{ProjectionError, ProjectionResult};
use crate::model::{PlatformStatesEntry, TokenGenerationStatesEntry};
use crate::store::{NatsKvTable, PlatformStatesStore, Table, TokenGenerationStatesStore};

/// Configuration for the event stream and the projector's consumer
#[derive(Debug, Clone)]
pub struct JetStreamConfig {
    /// NATS server URL
    pub nats_url: String,

    /// Stream carrying the aggregate events
    pub stream_name: String,

    /// Durable consumer name (survives restarts)
    pub consumer_name: String,

    /// Subject prefix; the aggregate type is the next token
    pub subject_prefix: String,

    /// Maximum age of messages (default: 30 days)
    pub max_age: Duration,

    /// Deliveries before the server gives up on a nak'd message
    pub max_deliver: i64,
}

impl Default for JetStreamConfig {
    fn default() -> Self {
        Self {
            nats_url: "localhost:4222".to_string(),
            stream_name: "AUTHZ_EVENTS".to_string(),
            consumer_name: "token-projector".to_string(),
            subject_prefix: "events".to_string(),
            max_age: Duration::from_secs(30 * 24 * 60 * 60), // 30 days
            max_deliver: 10,
        }
    }
}

impl JetStreamConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ProjectionResult<Self> {
        let defaults = Self::default();

        let max_deliver = match std::env::var("NATS_MAX_DELIVER") {
            Ok(raw) => raw.parse().map_err(|_| {
                ProjectionError::Configuration(format!("NATS_MAX_DELIVER is not a number: {}", raw))
            })?,
            Err(_) => defaults.max_deliver,
        };

        Ok(Self {
            nats_url: std::env::var("NATS_URL").unwrap_or(defaults.nats_url),
            stream_name: std::env::var("NATS_STREAM").unwrap_or(defaults.stream_name),
            consumer_name: std::env::var("NATS_CONSUMER").unwrap_or(defaults.consumer_name),
            subject_prefix: std::env::var("NATS_SUBJECT_PREFIX").unwrap_or(defaults.subject_prefix),
            max_age: defaults.max_age,
            max_deliver,
        })
    }

    /// Subjects the stream captures, one per aggregate type
    pub fn subjects(&self) -> Vec<String> {
        AggregateKind::ALL
            .iter()
            .map(|kind| self.subject_for(*kind))
            .collect()
    }

    pub fn subject_for(&self, kind: AggregateKind) -> String {
        format!("{}.{}", self.subject_prefix, kind)
    }

    /// Aggregate type an event subject belongs to
    pub fn aggregate_for_subject(&self, subject: &str) -> Option<AggregateKind> {
        let rest = subject.strip_prefix(&self.subject_prefix)?.strip_prefix('.')?;
        let token = rest.split('.').next()?;
        token.parse().ok()
    }
}

/// What to tell the server about a processed message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Done with the message
    Ack,
    /// Redeliver later
    Nak,
    /// Never redeliver
    Term,
}

impl Disposition {
    /// Exhausted fan-out batches are acknowledged; the affected rows stay
    /// stale until a later event rewrites them.
    pub fn for_result(result: &ProjectionResult<Outcome>) -> Self {
        match result {
            Ok(_) => Disposition::Ack,
            Err(ProjectionError::BatchWriteExhausted { .. }) => Disposition::Ack,
            Err(err) if err.is_retryable() => Disposition::Nak,
            Err(_) => Disposition::Term,
        }
    }
}

/// Create the event stream, or return it if it already exists
pub async fn create_event_stream(
    jetstream: &jetstream::Context,
    config: &JetStreamConfig,
) -> ProjectionResult<Stream> {
    let stream_config = jetstream::stream::Config {
        name: config.stream_name.clone(),
        subjects: config.subjects(),
        max_age: config.max_age,
        storage: jetstream::stream::StorageType::File,
        retention: jetstream::stream::RetentionPolicy::Limits,
        ..Default::default()
    };

    jetstream
        .get_or_create_stream(stream_config)
        .await
        .map_err(|e| ProjectionError::Store(e.to_string()))
}

/// Durable pull consumer with explicit acknowledgement
pub async fn create_consumer(
    stream: &Stream,
    config: &JetStreamConfig,
) -> ProjectionResult<PullConsumer> {
    stream
        .get_or_create_consumer(
            &config.consumer_name,
            jetstream::consumer::pull::Config {
                durable_name: Some(config.consumer_name.clone()),
                ack_policy: jetstream::consumer::AckPolicy::Explicit,
                deliver_policy: jetstream::consumer::DeliverPolicy::All,
                max_deliver: config.max_deliver,
                ..Default::default()
            },
        )
        .await
        .map_err(|e| ProjectionError::Store(e.to_string()))
}

/// Projector over the two key-value buckets named in the configuration
pub async fn open_projector(
    jetstream: &jetstream::Context,
    config: &ProjectorConfig,
) -> ProjectionResult<Projector> {
    let platform: Arc<dyn Table<PlatformStatesEntry>> = Arc::new(
        NatsKvTable::<PlatformStatesEntry>::open(jetstream, &config.platform_states_table).await?,
    );
    let tokens: Arc<dyn Table<TokenGenerationStatesEntry>> = Arc::new(
        NatsKvTable::<TokenGenerationStatesEntry>::open(jetstream, &config.token_generation_states_table)
            .await?,
    );

    Ok(Projector::new(
        PlatformStatesStore::new(platform, config),
        TokenGenerationStatesStore::new(tokens, config),
    ))
}
