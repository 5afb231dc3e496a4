// Copyright (c) 2025 - Cowboy AI, Inc.
//! Purpose consumer
//!
//! Maintains `PURPOSE#<id>` rows from the winning version of each snapshot and
//! propagates purpose fields to every fan-out row bound to the purpose.
//! Rows that never saw an agreement are back-filled from the latest agreement
//! of the purpose's (consumer, e-service) group.

use chrono::Utc;
use tracing::{debug, info};

use super::{fanout, fanout_pending, ignored, settle, Outcome, Projector};
use crate::derivation::{self, Disposition};
use crate::domain::Purpose;
use crate::errors::ProjectionResult;
use crate::events::{EventEnvelope, PurposeEventV1, PurposeEventV2, PurposeUpdate};
use crate::keys;
use crate::model::{ItemState, PlatformStatesEntry};
use crate::store::TokenQuery;

impl Projector {
    pub async fn handle_purpose_event_v1(
        &self,
        envelope: &EventEnvelope,
    ) -> ProjectionResult<Outcome> {
        match PurposeEventV1::decode(envelope)?.into_update() {
            Some(update) => self.apply_purpose(update, envelope.stream_version).await,
            None => Ok(ignored(envelope)),
        }
    }

    pub async fn handle_purpose_event_v2(
        &self,
        envelope: &EventEnvelope,
    ) -> ProjectionResult<Outcome> {
        match PurposeEventV2::decode(envelope)?.into_update() {
            Some(update) => self.apply_purpose(update, envelope.stream_version).await,
            None => Ok(ignored(envelope)),
        }
    }

    async fn apply_purpose(&self, update: PurposeUpdate, version: u64) -> ProjectionResult<Outcome> {
        let purpose = match update {
            PurposeUpdate::Removal(purpose) => {
                let pk = keys::platform_purpose_pk(purpose.id);
                return Ok(self.platform().delete(&pk, version).await?.into());
            }
            PurposeUpdate::Snapshot(purpose) => purpose,
        };

        match derivation::purpose_disposition(&purpose) {
            Disposition::Skip => {
                debug!(purpose_id = %purpose.id, "No projectable purpose version");
                Ok(Outcome::Ignored)
            }
            Disposition::Upsert(_) => self.upsert_purpose(&purpose, version).await,
            Disposition::Delete => self.archive_purpose(&purpose, version).await,
        }
    }

    async fn upsert_purpose(&self, purpose: &Purpose, version: u64) -> ProjectionResult<Outcome> {
        let (Some(entry), Some(fields)) = (
            derivation::platform_purpose_entry(purpose, version, Utc::now()),
            derivation::purpose_fields(purpose),
        ) else {
            return Ok(Outcome::Ignored);
        };

        let outcome = self
            .platform()
            .upsert(PlatformStatesEntry::Purpose(entry.clone()))
            .await?;
        if !fanout_pending(outcome, version) {
            return Ok(outcome.into());
        }

        let context =
            fanout::agreement_context(self.platform(), purpose.consumer_id, purpose.eservice_id)
                .await?;
        let rows = self
            .tokens()
            .update_all(&TokenQuery::Purpose(purpose.id), |row| {
                row.apply_purpose(&fields);
                if let Some(context) = &context {
                    if !row.has_agreement() {
                        context.apply(row);
                    }
                }
            })
            .await?;

        info!(
            purpose_id = %purpose.id,
            purpose_version_id = %entry.purpose_version_id,
            state = ?entry.state,
            version,
            rows,
            "Purpose projected"
        );
        Ok(settle(outcome, rows))
    }

    async fn archive_purpose(&self, purpose: &Purpose, version: u64) -> ProjectionResult<Outcome> {
        let pk = keys::platform_purpose_pk(purpose.id);
        let outcome = self.platform().delete(&pk, version).await?;
        if !fanout_pending(outcome, version) {
            return Ok(outcome.into());
        }

        let rows = self
            .tokens()
            .update_all(&TokenQuery::Purpose(purpose.id), |row| {
                row.purpose_state = Some(ItemState::Inactive)
            })
            .await?;

        info!(purpose_id = %purpose.id, version, rows, "Purpose archived");
        Ok(settle(outcome, rows))
    }
}
