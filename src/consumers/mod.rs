// Copyright (c) 2025 - Cowboy AI, Inc.
//! Projection Consumers
//!
//! One consumer per aggregate type, each with an entry point per schema
//! generation. Every invocation follows the same path:
//!
//! ```text
//! envelope ──> decode ──> derive row ──> gated platform write ──> fan-out
//!                │                             │
//!             no-op type                  stale/duplicate
//!                ▼                             ▼
//!             Ignored                       Skipped
//! ```
//!
//! Consumers keep no state between events; every invocation re-reads what it
//! needs from the store. Fan-out runs after an applied platform-states write
//! and again on redelivery of the same stream version, writing only rows that
//! still differ; an older delivery leaves both tables untouched.
//!
//! # Entry Points
//!
//! - [`Projector::handle_agreement_event_v1`] / [`Projector::handle_agreement_event_v2`]
//! - [`Projector::handle_purpose_event_v1`] / [`Projector::handle_purpose_event_v2`]
//! - [`Projector::handle_catalog_event_v1`] / [`Projector::handle_catalog_event_v2`]
//! - [`Projector::handle_authorization_event_v1`] / [`Projector::handle_authorization_event_v2`]
//! - [`Projector::dispatch`] picks one of the above from the schema version

pub mod agreement;
pub mod authorization;
pub mod catalog;
mod fanout;
pub mod purpose;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::config::ProjectorConfig;
use crate::errors::{ProjectionError, ProjectionResult};
use crate::events::{EventEnvelope, SchemaVersion};
use crate::model::{PlatformStatesEntry, TokenGenerationStatesEntry};
use crate::store::{
    MemoryTable, PlatformStatesStore, Table, TokenGenerationStatesStore, WriteOutcome,
};

/// What a consumer did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Rows written
    Applied,
    /// Stale or duplicate delivery, nothing written
    Skipped,
    /// Event type or state never projected
    Ignored,
}

impl From<WriteOutcome> for Outcome {
    fn from(outcome: WriteOutcome) -> Self {
        match outcome {
            WriteOutcome::Applied => Outcome::Applied,
            WriteOutcome::Stale { .. } | WriteOutcome::Absent => Outcome::Skipped,
        }
    }
}

/// Aggregate type an event stream belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    Agreement,
    Purpose,
    Catalog,
    Authorization,
}

impl AggregateKind {
    pub const ALL: [AggregateKind; 4] = [
        AggregateKind::Agreement,
        AggregateKind::Purpose,
        AggregateKind::Catalog,
        AggregateKind::Authorization,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AggregateKind::Agreement => "agreement",
            AggregateKind::Purpose => "purpose",
            AggregateKind::Catalog => "catalog",
            AggregateKind::Authorization => "authorization",
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateKind {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregateKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProjectionError::Configuration(format!("unknown aggregate kind: {}", s)))
    }
}

/// The projection engine: both state tables plus the per-aggregate consumers
pub struct Projector {
    platform: PlatformStatesStore,
    tokens: TokenGenerationStatesStore,
}

impl Projector {
    pub fn new(platform: PlatformStatesStore, tokens: TokenGenerationStatesStore) -> Self {
        Self { platform, tokens }
    }

    /// Projector over two in-memory tables
    pub fn in_memory(config: &ProjectorConfig) -> Self {
        let platform: Arc<dyn Table<PlatformStatesEntry>> =
            Arc::new(MemoryTable::<PlatformStatesEntry>::with_page_size(
                config.platform_states_table.clone(),
                config.page_size,
            ));
        let tokens: Arc<dyn Table<TokenGenerationStatesEntry>> =
            Arc::new(MemoryTable::<TokenGenerationStatesEntry>::with_page_size(
                config.token_generation_states_table.clone(),
                config.page_size,
            ));

        Self::new(
            PlatformStatesStore::new(platform, config),
            TokenGenerationStatesStore::new(tokens, config),
        )
    }

    pub fn platform(&self) -> &PlatformStatesStore {
        &self.platform
    }

    pub fn tokens(&self) -> &TokenGenerationStatesStore {
        &self.tokens
    }

    /// Route an event to the consumer for its aggregate and schema generation
    pub async fn dispatch(
        &self,
        aggregate: AggregateKind,
        envelope: &EventEnvelope,
    ) -> ProjectionResult<Outcome> {
        let schema = envelope.schema()?;
        debug!(
            aggregate = %aggregate,
            stream_id = %envelope.stream_id,
            version = envelope.stream_version,
            event_type = %envelope.event_type,
            "Dispatching event"
        );

        match (aggregate, schema) {
            (AggregateKind::Agreement, SchemaVersion::V1) => self.handle_agreement_event_v1(envelope).await,
            (AggregateKind::Agreement, SchemaVersion::V2) => self.handle_agreement_event_v2(envelope).await,
            (AggregateKind::Purpose, SchemaVersion::V1) => self.handle_purpose_event_v1(envelope).await,
            (AggregateKind::Purpose, SchemaVersion::V2) => self.handle_purpose_event_v2(envelope).await,
            (AggregateKind::Catalog, SchemaVersion::V1) => self.handle_catalog_event_v1(envelope).await,
            (AggregateKind::Catalog, SchemaVersion::V2) => self.handle_catalog_event_v2(envelope).await,
            (AggregateKind::Authorization, SchemaVersion::V1) => {
                self.handle_authorization_event_v1(envelope).await
            }
            (AggregateKind::Authorization, SchemaVersion::V2) => {
                self.handle_authorization_event_v2(envelope).await
            }
        }
    }
}

/// Whether an event's fan-out still has to run after its platform write.
///
/// A write gated at the event's own version, or a delete finding the row
/// already gone, is a redelivery whose earlier fan-out may have failed part
/// way. Only rows that still differ get written, so a clean replay is a no-op.
fn fanout_pending(outcome: WriteOutcome, version: u64) -> bool {
    match outcome {
        WriteOutcome::Applied | WriteOutcome::Absent => true,
        WriteOutcome::Stale { stored_version } => stored_version == version,
    }
}

/// Outcome of an event once its fan-out has run; `rows` counts fan-out writes
fn settle(outcome: WriteOutcome, rows: usize) -> Outcome {
    if outcome.is_applied() || rows > 0 {
        Outcome::Applied
    } else {
        outcome.into()
    }
}

fn ignored(envelope: &EventEnvelope) -> Outcome {
    debug!(
        stream_id = %envelope.stream_id,
        event_type = %envelope.event_type,
        "Event type not projected"
    );
    Outcome::Ignored
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_aggregate_kind_parsing() {
        for kind in AggregateKind::ALL {
            assert_eq!(kind.as_str().parse::<AggregateKind>().unwrap(), kind);
        }
        assert!("invoice".parse::<AggregateKind>().is_err());
    }

    #[test]
    fn test_write_outcome_mapping() {
        assert_eq!(Outcome::from(WriteOutcome::Applied), Outcome::Applied);
        assert_eq!(Outcome::from(WriteOutcome::Absent), Outcome::Skipped);
        assert_eq!(
            Outcome::from(WriteOutcome::Stale { stored_version: 3 }),
            Outcome::Skipped
        );
    }

    #[test]
    fn test_fanout_pending_on_redelivery() {
        assert!(fanout_pending(WriteOutcome::Applied, 4));
        assert!(fanout_pending(WriteOutcome::Absent, 4));
        assert!(fanout_pending(WriteOutcome::Stale { stored_version: 4 }, 4));
        assert!(!fanout_pending(WriteOutcome::Stale { stored_version: 5 }, 4));

        assert_eq!(settle(WriteOutcome::Stale { stored_version: 4 }, 0), Outcome::Skipped);
        assert_eq!(settle(WriteOutcome::Stale { stored_version: 4 }, 2), Outcome::Applied);
        assert_eq!(settle(WriteOutcome::Absent, 0), Outcome::Skipped);
        assert_eq!(settle(WriteOutcome::Applied, 0), Outcome::Applied);
    }

    #[tokio::test]
    async fn test_dispatch_rejects_unknown_schema() {
        let projector = Projector::in_memory(&ProjectorConfig::default());
        let mut envelope = EventEnvelope::new("x", 1, "ClientAdded", SchemaVersion::V2, json!({}));
        envelope.schema_version = 9;

        let err = projector
            .dispatch(AggregateKind::Authorization, &envelope)
            .await
            .unwrap_err();
        assert!(matches!(err, ProjectionError::UnsupportedSchemaVersion(9)));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_type_is_fatal() {
        let projector = Projector::in_memory(&ProjectorConfig::default());
        let envelope = EventEnvelope::new("x", 1, "SomethingHappened", SchemaVersion::V1, json!({}));

        for kind in AggregateKind::ALL {
            let err = projector.dispatch(kind, &envelope).await.unwrap_err();
            assert!(err.is_fatal());
        }
    }
}
