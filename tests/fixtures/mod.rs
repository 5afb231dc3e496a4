// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for authz-state-projector
//!
//! Provides deterministic event envelopes and table rows for the integration
//! and property tests. All UUIDs and timestamps are fixed constants so runs
//! are reproducible.
//!
//! # Design Principles
//! - Envelopes are built here, tests never hand-write payload JSON
//! - Fixed identifiers: one consumer, one e-service, one descriptor, one purpose
//! - Every builder takes the stream version explicitly

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use authz_state_projector::config::ProjectorConfig;
use authz_state_projector::keys;
use authz_state_projector::model::{PlatformStatesEntry, TokenClientKind, TokenGenerationStatesEntry};
use authz_state_projector::store::{
    BatchWriteOutcome, Item, MemoryTable, Page, PageToken, PlatformStatesStore, Table,
    TokenGenerationStatesStore, WriteCondition, WriteRequest,
};
use authz_state_projector::{EventEnvelope, ProjectionError, ProjectionResult, Projector, SchemaVersion};

pub const CONSUMER_ID: &str = "01934f4a-2000-7000-8000-000000002000";
pub const PRODUCER_ID: &str = "01934f4a-2001-7000-8000-000000002001";
pub const ESERVICE_ID: &str = "01934f4a-3000-7000-8000-000000003000";
pub const DESCRIPTOR_ID: &str = "01934f4a-3001-7000-8000-000000003001";
pub const PURPOSE_ID: &str = "01934f4a-4000-7000-8000-000000004000";
pub const PURPOSE_VERSION_1: &str = "01934f4a-4001-7000-8000-000000004001";
pub const PURPOSE_VERSION_2: &str = "01934f4a-4002-7000-8000-000000004002";
pub const AGREEMENT_A: &str = "01934f4a-5001-7000-8000-000000005001";
pub const AGREEMENT_B: &str = "01934f4a-5002-7000-8000-000000005002";
pub const CLIENT_ID: &str = "01934f4a-6000-7000-8000-000000006000";

// Fixed test timestamp (2026-01-19T12:00:00Z)
pub const FIXED_TIMESTAMP: &str = "2026-01-19T12:00:00Z";

/// Parse a fixed UUID from a constant string
pub fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).expect("Invalid UUID in test fixture")
}

/// Parse the fixed timestamp
pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(FIXED_TIMESTAMP)
        .expect("Invalid timestamp in test fixture")
        .with_timezone(&Utc)
}

/// Fixed timestamp shifted by whole minutes
pub fn at_minute(minutes: i64) -> DateTime<Utc> {
    fixed_timestamp() + Duration::minutes(minutes)
}

pub fn consumer_id() -> Uuid {
    parse_uuid(CONSUMER_ID)
}

pub fn eservice_id() -> Uuid {
    parse_uuid(ESERVICE_ID)
}

pub fn descriptor_id() -> Uuid {
    parse_uuid(DESCRIPTOR_ID)
}

pub fn purpose_id() -> Uuid {
    parse_uuid(PURPOSE_ID)
}

pub fn client_id() -> Uuid {
    parse_uuid(CLIENT_ID)
}

/// In-memory projector with the given query page size
pub fn projector(page_size: usize) -> Projector {
    Projector::in_memory(&ProjectorConfig {
        page_size,
        ..ProjectorConfig::default()
    })
}

// ============================================================================
// Envelopes
// ============================================================================

/// Second generation agreement event for (CONSUMER_ID, ESERVICE_ID)
pub fn agreement_event(
    event_type: &str,
    version: u64,
    agreement_id: &str,
    state: &str,
    activated_minute: i64,
) -> EventEnvelope {
    EventEnvelope::new(
        agreement_id,
        version,
        event_type,
        SchemaVersion::V2,
        json!({
            "agreement": {
                "id": agreement_id,
                "eserviceId": ESERVICE_ID,
                "descriptorId": DESCRIPTOR_ID,
                "producerId": PRODUCER_ID,
                "consumerId": CONSUMER_ID,
                "state": state,
                "createdAt": at_minute(-60),
                "stamps": {"activation": {"when": at_minute(activated_minute)}}
            }
        }),
    )
}

/// Purpose version entry for [`purpose_event`]
pub fn purpose_version(id: &str, state: &str, created_minute: i64) -> Value {
    json!({"id": id, "state": state, "createdAt": at_minute(created_minute), "dailyCalls": 100})
}

/// Second generation purpose event for PURPOSE_ID
pub fn purpose_event(event_type: &str, version: u64, versions: Vec<Value>) -> EventEnvelope {
    EventEnvelope::new(
        PURPOSE_ID,
        version,
        event_type,
        SchemaVersion::V2,
        json!({
            "purpose": {
                "id": PURPOSE_ID,
                "eserviceId": ESERVICE_ID,
                "consumerId": CONSUMER_ID,
                "title": "fixture purpose",
                "versions": versions
            }
        }),
    )
}

/// Second generation catalog event about DESCRIPTOR_ID
pub fn descriptor_event(event_type: &str, version: u64, state: &str) -> EventEnvelope {
    EventEnvelope::new(
        ESERVICE_ID,
        version,
        event_type,
        SchemaVersion::V2,
        json!({
            "eservice": {
                "id": ESERVICE_ID,
                "producerId": PRODUCER_ID,
                "name": "fixture e-service",
                "descriptors": [{
                    "id": DESCRIPTOR_ID,
                    "version": "1",
                    "state": state,
                    "audience": ["api.fixture.example"],
                    "voucherLifespan": 600
                }]
            },
            "descriptorId": DESCRIPTOR_ID
        }),
    )
}

/// Second generation client event for a consumer client
pub fn client_event(event_type: &str, version: u64, purposes: &[&str], kids: &[&str]) -> EventEnvelope {
    let keys: Vec<Value> = kids
        .iter()
        .map(|kid| json!({"kid": kid, "encodedPem": format!("-----PEM {}-----", kid), "algorithm": "RS256"}))
        .collect();
    EventEnvelope::new(
        CLIENT_ID,
        version,
        event_type,
        SchemaVersion::V2,
        json!({
            "client": {
                "id": CLIENT_ID,
                "consumerId": CONSUMER_ID,
                "kind": "consumer",
                "purposes": purposes,
                "keys": keys,
                "createdAt": fixed_timestamp()
            },
            "kid": kids.first().copied().unwrap_or("unused"),
            "purposeId": purposes.first().copied().unwrap_or(PURPOSE_ID)
        }),
    )
}

// ============================================================================
// Fan-out rows
// ============================================================================

/// Fan-out rows bound to PURPOSE_ID in the (CONSUMER_ID, ESERVICE_ID) group,
/// one per client, each already carrying purpose fields in the given state.
pub fn purpose_rows(count: usize, purpose_version: &str, inactive: bool) -> Vec<TokenGenerationStatesEntry> {
    use authz_state_projector::ItemState;

    (0..count)
        .map(|n| {
            let mut row = TokenGenerationStatesEntry::new(
                Uuid::from_u128(0x7000 + n as u128),
                "kid-1",
                Some(purpose_id()),
                consumer_id(),
                TokenClientKind::Consumer,
                "-----PEM kid-1-----",
                fixed_timestamp(),
            );
            row.purpose_state = Some(if inactive {
                ItemState::Inactive
            } else {
                ItemState::Active
            });
            row.purpose_version_id = Some(parse_uuid(purpose_version));
            row.consumer_eservice = Some(keys::consumer_eservice_key(consumer_id(), eservice_id()));
            row.eservice_descriptor = Some(keys::eservice_descriptor_key(eservice_id(), descriptor_id()));
            row
        })
        .collect()
}

/// Every fan-out row stored under the given purpose, sorted by key
pub async fn rows_for_purpose(projector: &Projector) -> Vec<TokenGenerationStatesEntry> {
    use authz_state_projector::TokenQuery;

    let mut rows = projector
        .tokens()
        .query_all(&TokenQuery::Purpose(purpose_id()))
        .await
        .expect("query fan-out rows");
    rows.sort_by(|a, b| a.pk.cmp(&b.pk));
    rows
}

// ============================================================================
// Transient store failures
// ============================================================================

/// In-memory table whose next queries or batch writes fail with a
/// retryable store error
pub struct FlakyTable<T: Item> {
    inner: MemoryTable<T>,
    failing_queries: AtomicUsize,
    failing_batches: AtomicUsize,
}

impl<T: Item> FlakyTable<T> {
    pub fn new(name: &str, page_size: usize) -> Self {
        Self {
            inner: MemoryTable::with_page_size(name, page_size),
            failing_queries: AtomicUsize::new(0),
            failing_batches: AtomicUsize::new(0),
        }
    }

    pub fn fail_next_queries(&self, count: usize) {
        self.failing_queries.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_batches(&self, count: usize) {
        self.failing_batches.store(count, Ordering::SeqCst);
    }

    fn take(counter: &AtomicUsize) -> ProjectionResult<()> {
        match counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1)) {
            Ok(_) => Err(ProjectionError::Store("transient network error".to_string())),
            Err(_) => Ok(()),
        }
    }
}

#[async_trait]
impl<T: Item> Table<T> for FlakyTable<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, pk: &str) -> ProjectionResult<Option<T>> {
        self.inner.get(pk).await
    }

    async fn put(&self, item: T, condition: WriteCondition) -> ProjectionResult<()> {
        self.inner.put(item, condition).await
    }

    async fn delete(&self, pk: &str, condition: WriteCondition) -> ProjectionResult<()> {
        self.inner.delete(pk, condition).await
    }

    async fn query(
        &self,
        index: T::Index,
        key: &str,
        start_after: Option<&PageToken>,
        limit: usize,
    ) -> ProjectionResult<Page<T>> {
        Self::take(&self.failing_queries)?;
        self.inner.query(index, key, start_after, limit).await
    }

    async fn batch_write(
        &self,
        requests: Vec<WriteRequest<T>>,
    ) -> ProjectionResult<BatchWriteOutcome<T>> {
        Self::take(&self.failing_batches)?;
        self.inner.batch_write(requests).await
    }
}

/// Projector over two flaky tables, with a single batch attempt so store
/// failures surface to the caller
pub struct FlakyProjector {
    pub projector: Projector,
    pub platform: Arc<FlakyTable<PlatformStatesEntry>>,
    pub tokens: Arc<FlakyTable<TokenGenerationStatesEntry>>,
}

pub fn flaky_projector(page_size: usize) -> FlakyProjector {
    let config = ProjectorConfig {
        page_size,
        batch_retry_attempts: 1,
        batch_retry_min_delay: std::time::Duration::from_millis(1),
        batch_retry_max_delay: std::time::Duration::from_millis(1),
        ..ProjectorConfig::default()
    };
    let platform = Arc::new(FlakyTable::new("platform-states", page_size));
    let tokens = Arc::new(FlakyTable::new("token-generation-states", page_size));

    let projector = Projector::new(
        PlatformStatesStore::new(platform.clone() as Arc<dyn Table<PlatformStatesEntry>>, &config),
        TokenGenerationStatesStore::new(
            tokens.clone() as Arc<dyn Table<TokenGenerationStatesEntry>>,
            &config,
        ),
    );

    FlakyProjector {
        projector,
        platform,
        tokens,
    }
}
