// Copyright (c) 2025 - Cowboy AI, Inc.
//! Upstream Domain Events
//!
//! Every event arrives in the same envelope; `eventVersion` picks one of two
//! payload generations and `type` picks the event within the aggregate's
//! catalog.
//!
//! ```text
//! {"streamId", "version", "type", "eventVersion", "data", "logDate"}
//!      │           │         │          │            │
//!  aggregate   stream      event     schema 1|2   payload
//!     id       version     type
//! ```
//!
//! # Schema Generations
//!
//! - **V1**: SCREAMING_SNAKE_CASE enums, epoch-millisecond timestamps, older
//!   field names. Payloads are converted into the [`crate::domain`] snapshots.
//! - **V2**: camelCase enums, RFC 3339 timestamps, snapshots decode directly.
//!
//! Each aggregate catalog decodes into a per-generation enum, then into one
//! generation-free update the consumers act on. Event types that never affect
//! the projection decode to an explicit no-op; types outside the catalog are
//! rejected with [`ProjectionError::UnknownEventType`].
//!
//! # Module Organization
//!
//! - [`agreement`] - agreement lifecycle events
//! - [`purpose`] - purpose and purpose version events
//! - [`catalog`] - e-service and descriptor events
//! - [`authorization`] - client, key and purpose binding events

pub mod agreement;
pub mod authorization;
pub mod catalog;
pub mod purpose;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{ProjectionError, ProjectionResult};

pub use agreement::{AgreementEventV1, AgreementEventV2, AgreementTrigger, AgreementUpdate};
pub use authorization::{AuthorizationEventV1, AuthorizationEventV2, ClientUpdate};
pub use catalog::{CatalogEventV1, CatalogEventV2, CatalogScope, CatalogUpdate};
pub use purpose::{PurposeEventV1, PurposeEventV2, PurposeUpdate};

/// Payload generation of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVersion {
    V1,
    V2,
}

impl SchemaVersion {
    pub fn as_u8(self) -> u8 {
        match self {
            SchemaVersion::V1 => 1,
            SchemaVersion::V2 => 2,
        }
    }
}

impl TryFrom<u8> for SchemaVersion {
    type Error = ProjectionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SchemaVersion::V1),
            2 => Ok(SchemaVersion::V2),
            other => Err(ProjectionError::UnsupportedSchemaVersion(other)),
        }
    }
}

/// Envelope wrapping every upstream event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Aggregate id
    #[serde(rename = "streamId")]
    pub stream_id: String,

    /// Position of the event in the aggregate stream
    #[serde(rename = "version")]
    pub stream_version: u64,

    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(rename = "eventVersion")]
    pub schema_version: u8,

    #[serde(rename = "data", default)]
    pub payload: serde_json::Value,

    #[serde(rename = "logDate", default, skip_serializing_if = "Option::is_none")]
    pub emitted_at: Option<DateTime<Utc>>,
}

impl EventEnvelope {
    pub fn new(
        stream_id: impl Into<String>,
        stream_version: u64,
        event_type: impl Into<String>,
        schema_version: SchemaVersion,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            stream_version,
            event_type: event_type.into(),
            schema_version: schema_version.as_u8(),
            payload,
            emitted_at: Some(Utc::now()),
        }
    }

    /// Decode an envelope from raw message bytes
    pub fn from_slice(bytes: &[u8]) -> ProjectionResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ProjectionError::invalid_payload("envelope", e))
    }

    pub fn schema(&self) -> ProjectionResult<SchemaVersion> {
        SchemaVersion::try_from(self.schema_version)
    }

    /// Decode the payload into the shape expected for this event type
    pub(crate) fn payload<P: DeserializeOwned>(&self) -> ProjectionResult<P> {
        P::deserialize(&self.payload).map_err(|e| ProjectionError::invalid_payload(&self.event_type, e))
    }

    pub(crate) fn unknown_type(&self) -> ProjectionError {
        ProjectionError::UnknownEventType {
            event_type: self.event_type.clone(),
            schema_version: self.schema_version,
        }
    }
}
