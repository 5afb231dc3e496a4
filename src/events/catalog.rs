// Copyright (c) 2025 - Cowboy AI, Inc.
//! Catalog events
//!
//! E-service events carry the whole e-service with its descriptors. Depending
//! on the event the consumer reconciles every descriptor of the snapshot or a
//! single one named by `descriptorId`.

use serde::Deserialize;
use uuid::Uuid;

use super::EventEnvelope;
use crate::domain::{Descriptor, DescriptorState, EService};
use crate::errors::{ProjectionError, ProjectionResult};

/// Descriptors an update applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogScope {
    /// Every descriptor in the snapshot
    AllDescriptors,
    /// One descriptor, which must be in the snapshot
    Descriptor(Uuid),
    /// One descriptor removed upstream; drop its row without fan-out
    Removal(Uuid),
}

/// Generation-free catalog change
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogUpdate {
    pub scope: CatalogScope,
    pub eservice: EService,
}

/// E-service snapshot plus the descriptor an event is about
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorChange {
    pub eservice: EService,
    pub descriptor_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogPayloadV2 {
    eservice: EService,
    #[serde(default)]
    descriptor_id: Option<Uuid>,
}

fn require_descriptor(
    envelope: &EventEnvelope,
    eservice: EService,
    descriptor_id: Option<Uuid>,
) -> ProjectionResult<DescriptorChange> {
    let descriptor_id = descriptor_id
        .ok_or_else(|| ProjectionError::invalid_payload(&envelope.event_type, "missing descriptorId"))?;
    Ok(DescriptorChange {
        eservice,
        descriptor_id,
    })
}

/// Second generation catalog events
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEventV2 {
    DescriptorPublished(DescriptorChange),
    DescriptorActivated(DescriptorChange),
    DescriptorSuspended(DescriptorChange),
    DescriptorArchived(DescriptorChange),
    DescriptorQuotasUpdated(DescriptorChange),
    NoOp(String),
}

impl CatalogEventV2 {
    pub fn decode(envelope: &EventEnvelope) -> ProjectionResult<Self> {
        use CatalogEventV2::*;

        let change = || -> ProjectionResult<DescriptorChange> {
            let payload = envelope.payload::<CatalogPayloadV2>()?;
            require_descriptor(envelope, payload.eservice, payload.descriptor_id)
        };

        Ok(match envelope.event_type.as_str() {
            "EServiceDescriptorPublished" => DescriptorPublished(change()?),
            "EServiceDescriptorActivated" => DescriptorActivated(change()?),
            "EServiceDescriptorSuspended" => DescriptorSuspended(change()?),
            "EServiceDescriptorArchived" => DescriptorArchived(change()?),
            "EServiceDescriptorQuotasUpdated" => DescriptorQuotasUpdated(change()?),
            "EServiceAdded"
            | "DraftEServiceUpdated"
            | "EServiceCloned"
            | "EServiceDeleted"
            | "EServiceDescriptorAdded"
            | "DraftEServiceDescriptorUpdated"
            | "DraftEServiceDescriptorDeleted"
            | "EServiceDescriptionUpdated"
            | "EServiceDescriptorDocumentAdded"
            | "EServiceDescriptorDocumentUpdated"
            | "EServiceDescriptorDocumentDeleted" => NoOp(envelope.event_type.clone()),
            _ => return Err(envelope.unknown_type()),
        })
    }

    pub fn into_update(self) -> Option<CatalogUpdate> {
        use CatalogEventV2::*;

        match self {
            // Publishing deprecates or archives the predecessor in the same snapshot
            DescriptorPublished(c) => Some(CatalogUpdate {
                scope: CatalogScope::AllDescriptors,
                eservice: c.eservice,
            }),
            DescriptorActivated(c)
            | DescriptorSuspended(c)
            | DescriptorArchived(c)
            | DescriptorQuotasUpdated(c) => Some(CatalogUpdate {
                scope: CatalogScope::Descriptor(c.descriptor_id),
                eservice: c.eservice,
            }),
            NoOp(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum DescriptorStateV1 {
    Draft,
    WaitingForApproval,
    Published,
    Deprecated,
    Suspended,
    Archived,
}

impl From<DescriptorStateV1> for DescriptorState {
    fn from(state: DescriptorStateV1) -> Self {
        match state {
            DescriptorStateV1::Draft => DescriptorState::Draft,
            DescriptorStateV1::WaitingForApproval => DescriptorState::WaitingForApproval,
            DescriptorStateV1::Published => DescriptorState::Published,
            DescriptorStateV1::Deprecated => DescriptorState::Deprecated,
            DescriptorStateV1::Suspended => DescriptorState::Suspended,
            DescriptorStateV1::Archived => DescriptorState::Archived,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptorV1 {
    id: Uuid,
    #[serde(default)]
    version: String,
    state: DescriptorStateV1,
    #[serde(default)]
    audience: Vec<String>,
    voucher_lifespan: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EServiceV1 {
    id: Uuid,
    producer_id: Uuid,
    #[serde(default)]
    name: String,
    #[serde(default)]
    descriptors: Vec<DescriptorV1>,
}

impl From<EServiceV1> for EService {
    fn from(v1: EServiceV1) -> Self {
        EService {
            id: v1.id,
            producer_id: v1.producer_id,
            name: v1.name,
            descriptors: v1
                .descriptors
                .into_iter()
                .map(|d| Descriptor {
                    id: d.id,
                    version: d.version,
                    state: d.state.into(),
                    audience: d.audience,
                    voucher_lifespan: d.voucher_lifespan,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogPayloadV1 {
    #[serde(rename = "eService")]
    eservice: EServiceV1,
    #[serde(default)]
    descriptor_id: Option<Uuid>,
}

/// First generation catalog events
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEventV1 {
    EServiceAdded(EService),
    ClonedEServiceAdded(EService),
    EServiceUpdated(EService),
    DescriptorAdded(DescriptorChange),
    DescriptorUpdated(DescriptorChange),
    WithDescriptorsDeleted(DescriptorChange),
    NoOp(String),
}

impl CatalogEventV1 {
    pub fn decode(envelope: &EventEnvelope) -> ProjectionResult<Self> {
        use CatalogEventV1::*;

        let eservice = || -> ProjectionResult<EService> {
            Ok(envelope.payload::<CatalogPayloadV1>()?.eservice.into())
        };
        let change = || -> ProjectionResult<DescriptorChange> {
            let payload = envelope.payload::<CatalogPayloadV1>()?;
            require_descriptor(envelope, payload.eservice.into(), payload.descriptor_id)
        };

        Ok(match envelope.event_type.as_str() {
            "EServiceAdded" => EServiceAdded(eservice()?),
            "ClonedEServiceAdded" => ClonedEServiceAdded(eservice()?),
            "EServiceUpdated" => EServiceUpdated(eservice()?),
            "EServiceDescriptorAdded" => DescriptorAdded(change()?),
            "EServiceDescriptorUpdated" => DescriptorUpdated(change()?),
            "EServiceWithDescriptorsDeleted" => WithDescriptorsDeleted(change()?),
            "EServiceDeleted"
            | "EServiceDocumentAdded"
            | "EServiceDocumentUpdated"
            | "EServiceDocumentDeleted" => NoOp(envelope.event_type.clone()),
            _ => return Err(envelope.unknown_type()),
        })
    }

    pub fn into_update(self) -> Option<CatalogUpdate> {
        use CatalogEventV1::*;

        let (scope, eservice) = match self {
            EServiceAdded(e) | ClonedEServiceAdded(e) | EServiceUpdated(e) => {
                (CatalogScope::AllDescriptors, e)
            }
            DescriptorAdded(c) | DescriptorUpdated(c) => {
                (CatalogScope::Descriptor(c.descriptor_id), c.eservice)
            }
            WithDescriptorsDeleted(c) => (CatalogScope::Removal(c.descriptor_id), c.eservice),
            NoOp(_) => return None,
        };
        Some(CatalogUpdate { scope, eservice })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SchemaVersion;
    use serde_json::json;

    fn eservice_v2() -> serde_json::Value {
        json!({
            "id": "00000000-0000-0000-0000-000000000001",
            "producerId": "00000000-0000-0000-0000-000000000002",
            "descriptors": [{
                "id": "00000000-0000-0000-0000-000000000003",
                "state": "published",
                "audience": ["api.example"],
                "voucherLifespan": 600
            }]
        })
    }

    #[test]
    fn test_published_reconciles_every_descriptor() {
        let envelope = EventEnvelope::new(
            "e",
            3,
            "EServiceDescriptorPublished",
            SchemaVersion::V2,
            json!({"eservice": eservice_v2(), "descriptorId": "00000000-0000-0000-0000-000000000003"}),
        );
        let update = CatalogEventV2::decode(&envelope).unwrap().into_update().unwrap();
        assert_eq!(update.scope, CatalogScope::AllDescriptors);
        assert_eq!(update.eservice.descriptors[0].voucher_lifespan, 600);
    }

    #[test]
    fn test_descriptor_event_requires_descriptor_id() {
        let envelope = EventEnvelope::new(
            "e",
            3,
            "EServiceDescriptorSuspended",
            SchemaVersion::V2,
            json!({"eservice": eservice_v2()}),
        );
        assert!(matches!(
            CatalogEventV2::decode(&envelope),
            Err(ProjectionError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_v1_descriptor_deletion_is_removal() {
        let envelope = EventEnvelope::new(
            "e",
            9,
            "EServiceWithDescriptorsDeleted",
            SchemaVersion::V1,
            json!({
                "eService": {
                    "id": "00000000-0000-0000-0000-000000000001",
                    "producerId": "00000000-0000-0000-0000-000000000002",
                    "descriptors": [{
                        "id": "00000000-0000-0000-0000-000000000003",
                        "state": "DEPRECATED",
                        "voucherLifespan": 60
                    }]
                },
                "descriptorId": "00000000-0000-0000-0000-000000000003"
            }),
        );
        let update = CatalogEventV1::decode(&envelope).unwrap().into_update().unwrap();
        assert_eq!(update.scope, CatalogScope::Removal(uuid::Uuid::from_u128(3)));
        assert_eq!(update.eservice.descriptors[0].state, DescriptorState::Deprecated);
    }
}
