// Copyright (c) 2025 - Cowboy AI, Inc.
//! Authorization consumer
//!
//! The only consumer that creates and deletes fan-out rows. Each client
//! snapshot is reconciled against the rows currently indexed under the client:
//!
//! ```text
//! desired = keys × purposes   (consumer client with purposes)
//!         = keys              (api client, or no purposes bound)
//!
//! delete  existing − desired
//! create  desired − existing, back-filled from platform-states
//! ```
//!
//! Rows present on both sides are left alone, so purpose, agreement and
//! descriptor fields already merged into them survive.

use chrono::Utc;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

use super::{fanout, fanout_pending, ignored, settle, Outcome, Projector};
use crate::derivation;
use crate::domain::Client;
use crate::errors::ProjectionResult;
use crate::events::{AuthorizationEventV1, AuthorizationEventV2, ClientUpdate, EventEnvelope};
use crate::keys;
use crate::model::PlatformStatesEntry;
use crate::store::TokenQuery;

impl Projector {
    pub async fn handle_authorization_event_v1(
        &self,
        envelope: &EventEnvelope,
    ) -> ProjectionResult<Outcome> {
        match AuthorizationEventV1::decode(envelope)?.into_update() {
            Some(update) => self.apply_client(update, envelope.stream_version).await,
            None => Ok(ignored(envelope)),
        }
    }

    pub async fn handle_authorization_event_v2(
        &self,
        envelope: &EventEnvelope,
    ) -> ProjectionResult<Outcome> {
        match AuthorizationEventV2::decode(envelope)?.into_update() {
            Some(update) => self.apply_client(update, envelope.stream_version).await,
            None => Ok(ignored(envelope)),
        }
    }

    async fn apply_client(&self, update: ClientUpdate, version: u64) -> ProjectionResult<Outcome> {
        match update {
            ClientUpdate::Snapshot(client) => self.reconcile_client(&client, version).await,
            ClientUpdate::Deletion(client_id) => self.delete_client(client_id, version).await,
        }
    }

    async fn reconcile_client(&self, client: &Client, version: u64) -> ProjectionResult<Outcome> {
        let now = Utc::now();
        let entry = derivation::platform_client_entry(client, version, now);
        let outcome = self.platform().upsert(PlatformStatesEntry::Client(entry)).await?;
        if !fanout_pending(outcome, version) {
            return Ok(outcome.into());
        }

        let desired = fanout::desired_rows(client, now);
        let existing = self.tokens().query_all(&TokenQuery::Client(client.id)).await?;

        let desired_pks: HashSet<&str> = desired.iter().map(|row| row.pk.as_str()).collect();
        let existing_pks: HashSet<&str> = existing.iter().map(|row| row.pk.as_str()).collect();

        let obsolete: Vec<String> = existing
            .iter()
            .filter(|row| !desired_pks.contains(row.pk.as_str()))
            .map(|row| row.pk.clone())
            .collect();

        let mut created = Vec::new();
        for mut row in desired
            .iter()
            .filter(|row| !existing_pks.contains(row.pk.as_str()))
            .cloned()
        {
            fanout::populate(self.platform(), &mut row).await?;
            created.push(row);
        }

        let deleted = self.tokens().delete_rows(obsolete).await?;
        let written = self.tokens().put_rows(created).await?;

        info!(
            client_id = %client.id,
            version,
            created = written,
            deleted,
            "Client projected"
        );
        Ok(settle(outcome, written + deleted))
    }

    async fn delete_client(&self, client_id: Uuid, version: u64) -> ProjectionResult<Outcome> {
        let pk = keys::platform_client_pk(client_id);
        let outcome = self.platform().delete(&pk, version).await?;
        if !fanout_pending(outcome, version) {
            return Ok(outcome.into());
        }

        let pks: Vec<String> = self
            .tokens()
            .query_all(&TokenQuery::Client(client_id))
            .await?
            .into_iter()
            .map(|row| row.pk)
            .collect();
        let deleted = self.tokens().delete_rows(pks).await?;

        info!(client_id = %client_id, version, deleted, "Client deleted");
        Ok(settle(outcome, deleted))
    }
}
