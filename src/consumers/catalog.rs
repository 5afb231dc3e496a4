// Copyright (c) 2025 - Cowboy AI, Inc.
//! Catalog consumer
//!
//! Maintains one `ESERVICEDESCRIPTOR#<eserviceId>#<descriptorId>` row per
//! projectable descriptor and pushes descriptor fields to the fan-out rows
//! referencing it. Deleting a descriptor row leaves the fan-out rows with
//! their last-known descriptor fields.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use super::{fanout_pending, ignored, settle, Outcome, Projector};
use crate::derivation::{self, Disposition};
use crate::domain::Descriptor;
use crate::errors::{ProjectionError, ProjectionResult};
use crate::events::{CatalogEventV1, CatalogEventV2, CatalogScope, CatalogUpdate, EventEnvelope};
use crate::keys;
use crate::model::{DescriptorFields, PlatformStatesEntry};
use crate::store::TokenQuery;

impl Projector {
    pub async fn handle_catalog_event_v1(
        &self,
        envelope: &EventEnvelope,
    ) -> ProjectionResult<Outcome> {
        match CatalogEventV1::decode(envelope)?.into_update() {
            Some(update) => self.apply_catalog(update, envelope.stream_version).await,
            None => Ok(ignored(envelope)),
        }
    }

    pub async fn handle_catalog_event_v2(
        &self,
        envelope: &EventEnvelope,
    ) -> ProjectionResult<Outcome> {
        match CatalogEventV2::decode(envelope)?.into_update() {
            Some(update) => self.apply_catalog(update, envelope.stream_version).await,
            None => Ok(ignored(envelope)),
        }
    }

    async fn apply_catalog(&self, update: CatalogUpdate, version: u64) -> ProjectionResult<Outcome> {
        let CatalogUpdate { scope, eservice } = update;

        let descriptors: Vec<&Descriptor> = match scope {
            CatalogScope::Removal(descriptor_id) => {
                let pk = keys::platform_descriptor_pk(eservice.id, descriptor_id);
                return Ok(self.platform().delete(&pk, version).await?.into());
            }
            CatalogScope::AllDescriptors => eservice.descriptors.iter().collect(),
            CatalogScope::Descriptor(descriptor_id) => {
                let descriptor = eservice.descriptor(descriptor_id).ok_or_else(|| {
                    ProjectionError::InconsistentPayload(format!(
                        "descriptor {} not found in e-service {}",
                        descriptor_id, eservice.id
                    ))
                })?;
                vec![descriptor]
            }
        };

        let mut outcomes = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            outcomes.push(self.apply_descriptor(eservice.id, descriptor, version).await?);
        }

        Ok(combine(&outcomes))
    }

    async fn apply_descriptor(
        &self,
        eservice_id: Uuid,
        descriptor: &Descriptor,
        version: u64,
    ) -> ProjectionResult<Outcome> {
        match derivation::descriptor_disposition(descriptor.state) {
            Disposition::Skip => {
                debug!(descriptor_id = %descriptor.id, state = ?descriptor.state, "Descriptor state not projected");
                Ok(Outcome::Ignored)
            }
            Disposition::Delete => {
                let pk = keys::platform_descriptor_pk(eservice_id, descriptor.id);
                let outcome = self.platform().delete(&pk, version).await?;
                if outcome.is_applied() {
                    info!(eservice_id = %eservice_id, descriptor_id = %descriptor.id, version, "Descriptor archived");
                }
                Ok(outcome.into())
            }
            Disposition::Upsert(_) => {
                let entry = derivation::platform_catalog_entry(eservice_id, descriptor, version, Utc::now());
                let outcome = self
                    .platform()
                    .upsert(PlatformStatesEntry::Catalog(entry.clone()))
                    .await?;
                if !fanout_pending(outcome, version) {
                    return Ok(outcome.into());
                }

                let fields = DescriptorFields::from(&entry);
                let query = TokenQuery::EServiceDescriptor {
                    eservice_id,
                    descriptor_id: descriptor.id,
                };
                let rows = self
                    .tokens()
                    .update_all(&query, |row| row.apply_descriptor(Some(&fields)))
                    .await?;

                info!(
                    eservice_id = %eservice_id,
                    descriptor_id = %descriptor.id,
                    state = ?entry.state,
                    version,
                    rows,
                    "Descriptor projected"
                );
                Ok(settle(outcome, rows))
            }
        }
    }
}

/// Applied if any descriptor was written, Skipped if any was stale
fn combine(outcomes: &[Outcome]) -> Outcome {
    if outcomes.contains(&Outcome::Applied) {
        Outcome::Applied
    } else if outcomes.contains(&Outcome::Skipped) {
        Outcome::Skipped
    } else {
        Outcome::Ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectorConfig;
    use crate::events::SchemaVersion;
    use crate::model::{ItemState, TokenClientKind, TokenGenerationStatesEntry};
    use serde_json::json;

    const ESERVICE: u128 = 1;

    fn catalog_envelope(
        event_type: &str,
        version: u64,
        descriptors: serde_json::Value,
        descriptor_id: u128,
    ) -> EventEnvelope {
        EventEnvelope::new(
            Uuid::from_u128(ESERVICE).to_string(),
            version,
            event_type,
            SchemaVersion::V2,
            json!({
                "eservice": {
                    "id": Uuid::from_u128(ESERVICE),
                    "producerId": Uuid::from_u128(2),
                    "descriptors": descriptors
                },
                "descriptorId": Uuid::from_u128(descriptor_id)
            }),
        )
    }

    fn descriptor(id: u128, state: &str) -> serde_json::Value {
        json!({"id": Uuid::from_u128(id), "state": state, "audience": ["aud"], "voucherLifespan": 60})
    }

    #[test]
    fn test_combine_outcomes() {
        assert_eq!(combine(&[Outcome::Ignored, Outcome::Applied]), Outcome::Applied);
        assert_eq!(combine(&[Outcome::Skipped, Outcome::Ignored]), Outcome::Skipped);
        assert_eq!(combine(&[]), Outcome::Ignored);
    }

    #[tokio::test]
    async fn test_publish_writes_every_projectable_descriptor() {
        let projector = Projector::in_memory(&ProjectorConfig::default());
        let envelope = catalog_envelope(
            "EServiceDescriptorPublished",
            4,
            json!([descriptor(10, "deprecated"), descriptor(11, "published"), descriptor(12, "draft")]),
            11,
        );

        assert_eq!(
            projector.handle_catalog_event_v2(&envelope).await.unwrap(),
            Outcome::Applied
        );

        let platform = projector.platform();
        let eservice = Uuid::from_u128(ESERVICE);
        let deprecated = platform.read_catalog(eservice, Uuid::from_u128(10)).await.unwrap().unwrap();
        assert_eq!(deprecated.state, ItemState::Active);
        assert!(platform.read_catalog(eservice, Uuid::from_u128(11)).await.unwrap().is_some());
        assert!(platform.read_catalog(eservice, Uuid::from_u128(12)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_descriptor_is_inconsistent() {
        let projector = Projector::in_memory(&ProjectorConfig::default());
        let envelope = catalog_envelope(
            "EServiceDescriptorSuspended",
            2,
            json!([descriptor(10, "suspended")]),
            99,
        );

        let err = projector.handle_catalog_event_v2(&envelope).await.unwrap_err();
        assert!(matches!(err, ProjectionError::InconsistentPayload(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_suspension_reaches_fanout() {
        let projector = Projector::in_memory(&ProjectorConfig::default());
        let mut row = TokenGenerationStatesEntry::new(
            Uuid::from_u128(50),
            "kid",
            Some(Uuid::from_u128(51)),
            Uuid::from_u128(52),
            TokenClientKind::Consumer,
            "pem",
            Utc::now(),
        );
        row.eservice_descriptor = Some(keys::eservice_descriptor_key(
            Uuid::from_u128(ESERVICE),
            Uuid::from_u128(10),
        ));
        let pk = row.pk.clone();
        projector.tokens().put_rows(vec![row]).await.unwrap();

        let envelope = catalog_envelope(
            "EServiceDescriptorSuspended",
            3,
            json!([descriptor(10, "suspended")]),
            10,
        );
        projector.handle_catalog_event_v2(&envelope).await.unwrap();

        let row = projector.tokens().get(&pk).await.unwrap().unwrap();
        assert_eq!(row.descriptor_state, Some(ItemState::Inactive));
        assert_eq!(row.descriptor_voucher_lifespan, Some(60));
        assert_eq!(row.descriptor_audience, Some(vec!["aud".to_string()]));
    }
}
