// Copyright (c) 2025 - Cowboy AI, Inc.
//! Purpose events
//!
//! Every projected purpose event is state-driven: the consumer recomputes the
//! winning version from the snapshot, whatever the event type. Only the first
//! generation `PurposeDeleted` is handled differently, as a plain tombstone.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::EventEnvelope;
use crate::domain::{Purpose, PurposeVersion, PurposeVersionState};
use crate::errors::ProjectionResult;

/// Generation-free purpose change
#[derive(Debug, Clone, PartialEq)]
pub enum PurposeUpdate {
    /// Derive the row from the snapshot
    Snapshot(Purpose),
    /// Purpose removed upstream; drop the row without fan-out
    Removal(Purpose),
}

#[derive(Debug, Clone, Deserialize)]
struct PurposePayloadV2 {
    purpose: Purpose,
}

/// Second generation purpose events
#[derive(Debug, Clone, PartialEq)]
pub enum PurposeEventV2 {
    PurposeActivated(Purpose),
    PurposeVersionActivated(Purpose),
    NewPurposeVersionActivated(Purpose),
    PurposeVersionSuspendedByConsumer(Purpose),
    PurposeVersionSuspendedByProducer(Purpose),
    PurposeVersionUnsuspendedByConsumer(Purpose),
    PurposeVersionUnsuspendedByProducer(Purpose),
    PurposeVersionOverQuotaUnsuspended(Purpose),
    PurposeArchived(Purpose),
    NoOp(String),
}

impl PurposeEventV2 {
    pub fn decode(envelope: &EventEnvelope) -> ProjectionResult<Self> {
        use PurposeEventV2::*;

        let snapshot =
            || -> ProjectionResult<Purpose> { Ok(envelope.payload::<PurposePayloadV2>()?.purpose) };

        Ok(match envelope.event_type.as_str() {
            "PurposeActivated" => PurposeActivated(snapshot()?),
            "PurposeVersionActivated" => PurposeVersionActivated(snapshot()?),
            "NewPurposeVersionActivated" => NewPurposeVersionActivated(snapshot()?),
            "PurposeVersionSuspendedByConsumer" => PurposeVersionSuspendedByConsumer(snapshot()?),
            "PurposeVersionSuspendedByProducer" => PurposeVersionSuspendedByProducer(snapshot()?),
            "PurposeVersionUnsuspendedByConsumer" => PurposeVersionUnsuspendedByConsumer(snapshot()?),
            "PurposeVersionUnsuspendedByProducer" => PurposeVersionUnsuspendedByProducer(snapshot()?),
            "PurposeVersionOverQuotaUnsuspended" => PurposeVersionOverQuotaUnsuspended(snapshot()?),
            "PurposeArchived" => PurposeArchived(snapshot()?),
            "PurposeAdded"
            | "DraftPurposeUpdated"
            | "PurposeWaitingForApproval"
            | "NewPurposeVersionWaitingForApproval"
            | "PurposeVersionRejected"
            | "DraftPurposeDeleted"
            | "WaitingForApprovalPurposeDeleted"
            | "WaitingForApprovalPurposeVersionDeleted"
            | "PurposeCloned" => NoOp(envelope.event_type.clone()),
            _ => return Err(envelope.unknown_type()),
        })
    }

    pub fn into_update(self) -> Option<PurposeUpdate> {
        use PurposeEventV2::*;

        match self {
            PurposeActivated(p)
            | PurposeVersionActivated(p)
            | NewPurposeVersionActivated(p)
            | PurposeVersionSuspendedByConsumer(p)
            | PurposeVersionSuspendedByProducer(p)
            | PurposeVersionUnsuspendedByConsumer(p)
            | PurposeVersionUnsuspendedByProducer(p)
            | PurposeVersionOverQuotaUnsuspended(p)
            | PurposeArchived(p) => Some(PurposeUpdate::Snapshot(p)),
            NoOp(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum PurposeVersionStateV1 {
    Draft,
    Active,
    Suspended,
    Archived,
    WaitingForApproval,
    Rejected,
}

impl From<PurposeVersionStateV1> for PurposeVersionState {
    fn from(state: PurposeVersionStateV1) -> Self {
        match state {
            PurposeVersionStateV1::Draft => PurposeVersionState::Draft,
            PurposeVersionStateV1::Active => PurposeVersionState::Active,
            PurposeVersionStateV1::Suspended => PurposeVersionState::Suspended,
            PurposeVersionStateV1::Archived => PurposeVersionState::Archived,
            PurposeVersionStateV1::WaitingForApproval => PurposeVersionState::WaitingForApproval,
            PurposeVersionStateV1::Rejected => PurposeVersionState::Rejected,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurposeVersionV1 {
    id: Uuid,
    state: PurposeVersionStateV1,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
    #[serde(default)]
    daily_calls: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurposeV1 {
    id: Uuid,
    eservice_id: Uuid,
    consumer_id: Uuid,
    #[serde(default)]
    title: String,
    #[serde(default)]
    versions: Vec<PurposeVersionV1>,
}

impl From<PurposeV1> for Purpose {
    fn from(v1: PurposeV1) -> Self {
        Purpose {
            id: v1.id,
            eservice_id: v1.eservice_id,
            consumer_id: v1.consumer_id,
            title: v1.title,
            versions: v1
                .versions
                .into_iter()
                .map(|v| PurposeVersion {
                    id: v.id,
                    state: v.state.into(),
                    created_at: v.created_at,
                    daily_calls: v.daily_calls,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct PurposePayloadV1 {
    purpose: PurposeV1,
}

/// First generation purpose events
#[derive(Debug, Clone, PartialEq)]
pub enum PurposeEventV1 {
    PurposeVersionActivated(Purpose),
    PurposeVersionSuspended(Purpose),
    PurposeVersionArchived(Purpose),
    PurposeUpdated(Purpose),
    PurposeVersionUpdated(Purpose),
    PurposeDeleted(Purpose),
    NoOp(String),
}

impl PurposeEventV1 {
    pub fn decode(envelope: &EventEnvelope) -> ProjectionResult<Self> {
        use PurposeEventV1::*;

        let snapshot = || -> ProjectionResult<Purpose> {
            Ok(envelope.payload::<PurposePayloadV1>()?.purpose.into())
        };

        Ok(match envelope.event_type.as_str() {
            "PurposeVersionActivated" => PurposeVersionActivated(snapshot()?),
            "PurposeVersionSuspended" => PurposeVersionSuspended(snapshot()?),
            "PurposeVersionArchived" => PurposeVersionArchived(snapshot()?),
            "PurposeUpdated" => PurposeUpdated(snapshot()?),
            "PurposeVersionUpdated" => PurposeVersionUpdated(snapshot()?),
            "PurposeDeleted" => PurposeDeleted(snapshot()?),
            "PurposeCreated"
            | "PurposeVersionCreated"
            | "PurposeVersionWaitedForApproval"
            | "PurposeVersionRejected"
            | "PurposeVersionDeleted" => NoOp(envelope.event_type.clone()),
            _ => return Err(envelope.unknown_type()),
        })
    }

    pub fn into_update(self) -> Option<PurposeUpdate> {
        use PurposeEventV1::*;

        match self {
            PurposeVersionActivated(p)
            | PurposeVersionSuspended(p)
            | PurposeVersionArchived(p)
            | PurposeUpdated(p)
            | PurposeVersionUpdated(p) => Some(PurposeUpdate::Snapshot(p)),
            PurposeDeleted(p) => Some(PurposeUpdate::Removal(p)),
            NoOp(_) => None,
        }
    }
}
