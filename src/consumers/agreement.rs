// Copyright (c) 2025 - Cowboy AI, Inc.
//! Agreement consumer
//!
//! Maintains `AGREEMENT#<id>` rows and, when the agreement is the latest of
//! its (consumer, e-service) group, the agreement fields of the fan-out rows
//! sharing that group.

use chrono::Utc;
use tracing::{debug, info};

use super::{fanout, fanout_pending, ignored, settle, Outcome, Projector};
use crate::derivation::{self, Disposition};
use crate::domain::Agreement;
use crate::errors::ProjectionResult;
use crate::events::{
    AgreementEventV1, AgreementEventV2, AgreementTrigger, AgreementUpdate, EventEnvelope,
};
use crate::keys;
use crate::model::{AgreementFields, ItemState, PlatformStatesEntry};
use crate::store::TokenQuery;

impl Projector {
    pub async fn handle_agreement_event_v1(
        &self,
        envelope: &EventEnvelope,
    ) -> ProjectionResult<Outcome> {
        match AgreementEventV1::decode(envelope)?.into_update() {
            Some(update) => self.apply_agreement(update, envelope.stream_version).await,
            None => Ok(ignored(envelope)),
        }
    }

    pub async fn handle_agreement_event_v2(
        &self,
        envelope: &EventEnvelope,
    ) -> ProjectionResult<Outcome> {
        match AgreementEventV2::decode(envelope)?.into_update() {
            Some(update) => self.apply_agreement(update, envelope.stream_version).await,
            None => Ok(ignored(envelope)),
        }
    }

    async fn apply_agreement(&self, update: AgreementUpdate, version: u64) -> ProjectionResult<Outcome> {
        let AgreementUpdate { trigger, agreement } = update;

        match (trigger, derivation::agreement_disposition(agreement.state)) {
            (AgreementTrigger::Removal, _) => {
                let pk = keys::platform_agreement_pk(agreement.id);
                Ok(self.platform().delete(&pk, version).await?.into())
            }
            (AgreementTrigger::Archiving, _) | (_, Disposition::Delete) => {
                self.archive_agreement(&agreement, version).await
            }
            (_, Disposition::Skip) => {
                debug!(agreement_id = %agreement.id, state = ?agreement.state, "Agreement state not projected");
                Ok(Outcome::Ignored)
            }
            (_, Disposition::Upsert(_)) => self.upsert_agreement(trigger, &agreement, version).await,
        }
    }

    async fn upsert_agreement(
        &self,
        trigger: AgreementTrigger,
        agreement: &Agreement,
        version: u64,
    ) -> ProjectionResult<Outcome> {
        let entry = derivation::platform_agreement_entry(agreement, version, Utc::now());
        let outcome = self
            .platform()
            .upsert(PlatformStatesEntry::Agreement(entry.clone()))
            .await?;
        if !fanout_pending(outcome, version) {
            return Ok(outcome.into());
        }

        let group = self
            .platform()
            .agreements_by_consumer_eservice(entry.consumer_id, entry.eservice_id)
            .await?;
        if !derivation::is_latest_agreement(entry.agreement_id, entry.agreement_timestamp, &group) {
            debug!(
                agreement_id = %entry.agreement_id,
                consumer_eservice = %entry.consumer_eservice,
                "Agreement is not the latest of its group, fan-out skipped"
            );
            return Ok(settle(outcome, 0));
        }

        let query = TokenQuery::ConsumerEService {
            consumer_id: entry.consumer_id,
            eservice_id: entry.eservice_id,
        };
        let fields = AgreementFields::from(&entry);
        let rows = if trigger == AgreementTrigger::Activation {
            let descriptor = fanout::descriptor_fields_for(self.platform(), &entry).await?;
            self.tokens()
                .update_all(&query, |row| {
                    row.apply_agreement(&fields);
                    row.apply_descriptor(descriptor.as_ref());
                })
                .await?
        } else {
            self.tokens()
                .update_all(&query, |row| row.apply_agreement(&fields))
                .await?
        };

        info!(
            agreement_id = %entry.agreement_id,
            state = ?entry.state,
            version,
            rows,
            "Agreement projected"
        );
        Ok(settle(outcome, rows))
    }

    async fn archive_agreement(&self, agreement: &Agreement, version: u64) -> ProjectionResult<Outcome> {
        let pk = keys::platform_agreement_pk(agreement.id);
        let outcome = self.platform().delete(&pk, version).await?;
        if !fanout_pending(outcome, version) {
            return Ok(outcome.into());
        }

        let remaining = self
            .platform()
            .agreements_by_consumer_eservice(agreement.consumer_id, agreement.eservice_id)
            .await?;
        if !derivation::is_latest_agreement(agreement.id, agreement.grouping_timestamp(), &remaining) {
            debug!(agreement_id = %agreement.id, "Archived agreement superseded, fan-out skipped");
            return Ok(settle(outcome, 0));
        }

        let query = TokenQuery::ConsumerEService {
            consumer_id: agreement.consumer_id,
            eservice_id: agreement.eservice_id,
        };
        let rows = self
            .tokens()
            .update_all(&query, |row| row.agreement_state = Some(ItemState::Inactive))
            .await?;

        info!(agreement_id = %agreement.id, version, rows, "Agreement archived");
        Ok(settle(outcome, rows))
    }
}
