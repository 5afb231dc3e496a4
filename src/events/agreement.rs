// Copyright (c) 2025 - Cowboy AI, Inc.
//! Agreement events
//!
//! Both generations carry the full agreement snapshot. The event type only
//! decides how the change reaches the fan-out rows ([`AgreementTrigger`]);
//! the platform-states row itself is derived from the snapshot state.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::EventEnvelope;
use crate::domain::{Agreement, AgreementStamp, AgreementStamps, AgreementState};
use crate::errors::ProjectionResult;

/// How an agreement change propagates to fan-out rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgreementTrigger {
    /// Activation or upgrade: agreement fields plus descriptor back-fill
    Activation,
    /// Suspension state changed: agreement fields only
    StateChange,
    /// Archived: row removed whatever the snapshot state, fan-out flipped to
    /// inactive when the agreement was the latest of its group
    Archiving,
    /// Deleted upstream: row removed, fan-out untouched
    Removal,
}

/// Generation-free agreement change
#[derive(Debug, Clone, PartialEq)]
pub struct AgreementUpdate {
    pub trigger: AgreementTrigger,
    pub agreement: Agreement,
}

#[derive(Debug, Clone, Deserialize)]
struct AgreementPayloadV2 {
    agreement: Agreement,
}

/// Second generation agreement events
#[derive(Debug, Clone, PartialEq)]
pub enum AgreementEventV2 {
    Activated(Agreement),
    SuspendedByConsumer(Agreement),
    SuspendedByProducer(Agreement),
    SuspendedByPlatform(Agreement),
    UnsuspendedByConsumer(Agreement),
    UnsuspendedByProducer(Agreement),
    UnsuspendedByPlatform(Agreement),
    Upgraded(Agreement),
    ArchivedByConsumer(Agreement),
    ArchivedByUpgrade(Agreement),
    /// Known event type that never affects the projection
    NoOp(String),
}

impl AgreementEventV2 {
    pub fn decode(envelope: &EventEnvelope) -> ProjectionResult<Self> {
        use AgreementEventV2::*;

        let snapshot = || -> ProjectionResult<Agreement> {
            Ok(envelope.payload::<AgreementPayloadV2>()?.agreement)
        };

        Ok(match envelope.event_type.as_str() {
            "AgreementActivated" => Activated(snapshot()?),
            "AgreementSuspendedByConsumer" => SuspendedByConsumer(snapshot()?),
            "AgreementSuspendedByProducer" => SuspendedByProducer(snapshot()?),
            "AgreementSuspendedByPlatform" => SuspendedByPlatform(snapshot()?),
            "AgreementUnsuspendedByConsumer" => UnsuspendedByConsumer(snapshot()?),
            "AgreementUnsuspendedByProducer" => UnsuspendedByProducer(snapshot()?),
            "AgreementUnsuspendedByPlatform" => UnsuspendedByPlatform(snapshot()?),
            "AgreementUpgraded" => Upgraded(snapshot()?),
            "AgreementArchivedByConsumer" => ArchivedByConsumer(snapshot()?),
            "AgreementArchivedByUpgrade" => ArchivedByUpgrade(snapshot()?),
            "AgreementAdded"
            | "AgreementDeleted"
            | "DraftAgreementUpdated"
            | "AgreementSubmitted"
            | "AgreementRejected"
            | "AgreementConsumerDocumentAdded"
            | "AgreementConsumerDocumentRemoved"
            | "AgreementSetDraftByPlatform"
            | "AgreementSetMissingCertifiedAttributesByPlatform" => NoOp(envelope.event_type.clone()),
            _ => return Err(envelope.unknown_type()),
        })
    }

    pub fn into_update(self) -> Option<AgreementUpdate> {
        use AgreementEventV2::*;

        let (trigger, agreement) = match self {
            Activated(a) | Upgraded(a) => (AgreementTrigger::Activation, a),
            SuspendedByConsumer(a)
            | SuspendedByProducer(a)
            | SuspendedByPlatform(a)
            | UnsuspendedByConsumer(a)
            | UnsuspendedByProducer(a)
            | UnsuspendedByPlatform(a) => (AgreementTrigger::StateChange, a),
            ArchivedByConsumer(a) | ArchivedByUpgrade(a) => (AgreementTrigger::Archiving, a),
            NoOp(_) => return None,
        };
        Some(AgreementUpdate { trigger, agreement })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum AgreementStateV1 {
    Draft,
    Pending,
    Active,
    Suspended,
    Archived,
    Rejected,
    MissingCertifiedAttributes,
}

impl From<AgreementStateV1> for AgreementState {
    fn from(state: AgreementStateV1) -> Self {
        match state {
            AgreementStateV1::Draft => AgreementState::Draft,
            AgreementStateV1::Pending => AgreementState::Pending,
            AgreementStateV1::Active => AgreementState::Active,
            AgreementStateV1::Suspended => AgreementState::Suspended,
            AgreementStateV1::Archived => AgreementState::Archived,
            AgreementStateV1::Rejected => AgreementState::Rejected,
            AgreementStateV1::MissingCertifiedAttributes => AgreementState::MissingCertifiedAttributes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct StampV1 {
    #[serde(default)]
    who: Option<Uuid>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    when: DateTime<Utc>,
}

impl From<StampV1> for AgreementStamp {
    fn from(stamp: StampV1) -> Self {
        AgreementStamp {
            who: stamp.who,
            when: stamp.when,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StampsV1 {
    #[serde(default)]
    activation: Option<StampV1>,
    #[serde(default)]
    suspension_by_consumer: Option<StampV1>,
    #[serde(default)]
    suspension_by_producer: Option<StampV1>,
    #[serde(default)]
    archiving: Option<StampV1>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgreementV1 {
    id: Uuid,
    #[serde(rename = "eServiceId")]
    eservice_id: Uuid,
    descriptor_id: Uuid,
    producer_id: Uuid,
    consumer_id: Uuid,
    state: AgreementStateV1,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
    #[serde(default)]
    stamps: StampsV1,
}

impl From<AgreementV1> for Agreement {
    fn from(v1: AgreementV1) -> Self {
        Agreement {
            id: v1.id,
            eservice_id: v1.eservice_id,
            descriptor_id: v1.descriptor_id,
            producer_id: v1.producer_id,
            consumer_id: v1.consumer_id,
            state: v1.state.into(),
            created_at: v1.created_at,
            stamps: AgreementStamps {
                activation: v1.stamps.activation.map(Into::into),
                suspension_by_consumer: v1.stamps.suspension_by_consumer.map(Into::into),
                suspension_by_producer: v1.stamps.suspension_by_producer.map(Into::into),
                archiving: v1.stamps.archiving.map(Into::into),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct AgreementPayloadV1 {
    agreement: AgreementV1,
}

/// First generation agreement events
#[derive(Debug, Clone, PartialEq)]
pub enum AgreementEventV1 {
    Activated(Agreement),
    Suspended(Agreement),
    /// Generic update; the snapshot state decides
    Updated(Agreement),
    Deactivated(Agreement),
    Deleted(Agreement),
    NoOp(String),
}

impl AgreementEventV1 {
    pub fn decode(envelope: &EventEnvelope) -> ProjectionResult<Self> {
        use AgreementEventV1::*;

        let snapshot = || -> ProjectionResult<Agreement> {
            Ok(envelope.payload::<AgreementPayloadV1>()?.agreement.into())
        };

        Ok(match envelope.event_type.as_str() {
            "AgreementActivated" => Activated(snapshot()?),
            "AgreementSuspended" => Suspended(snapshot()?),
            "AgreementUpdated" => Updated(snapshot()?),
            "AgreementDeactivated" => Deactivated(snapshot()?),
            "AgreementDeleted" => Deleted(snapshot()?),
            "AgreementAdded"
            | "VerifiedAttributeUpdated"
            | "AgreementContractAdded"
            | "AgreementConsumerDocumentAdded"
            | "AgreementConsumerDocumentRemoved" => NoOp(envelope.event_type.clone()),
            _ => return Err(envelope.unknown_type()),
        })
    }

    pub fn into_update(self) -> Option<AgreementUpdate> {
        use AgreementEventV1::*;

        let (trigger, agreement) = match self {
            Activated(a) => (AgreementTrigger::Activation, a),
            Suspended(a) => (AgreementTrigger::StateChange, a),
            Updated(a) => match a.state {
                AgreementState::Archived => (AgreementTrigger::Archiving, a),
                _ => (AgreementTrigger::StateChange, a),
            },
            Deactivated(a) => (AgreementTrigger::Archiving, a),
            Deleted(a) => (AgreementTrigger::Removal, a),
            NoOp(_) => return None,
        };
        Some(AgreementUpdate { trigger, agreement })
    }
}
