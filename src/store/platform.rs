// Copyright (c) 2025 - Cowboy AI, Inc.
//! Platform-states adapter
//!
//! Typed access to the per-entity table. Every write goes through the version
//! gate: a row is only created when absent and only replaced or removed when
//! the stored `version` is strictly below the incoming stream version. A gated
//! write is reported as [`WriteOutcome::Stale`], never as an error.

use std::mem::discriminant;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{Item, Paginator, Table, WriteCondition};
use crate::config::ProjectorConfig;
use crate::derivation;
use crate::errors::{ProjectionError, ProjectionResult};
use crate::keys;
use crate::model::{
    PlatformAgreementEntry, PlatformCatalogEntry, PlatformClientEntry, PlatformIndex,
    PlatformPurposeEntry, PlatformStatesEntry,
};

/// Result of a gated platform-states write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Row created, replaced or removed
    Applied,
    /// Stored row is at the same or a newer version; nothing written
    Stale { stored_version: u64 },
    /// Delete of a row that is not there
    Absent,
}

impl WriteOutcome {
    pub fn is_applied(self) -> bool {
        self == WriteOutcome::Applied
    }
}

#[derive(Clone)]
pub struct PlatformStatesStore {
    table: Arc<dyn Table<PlatformStatesEntry>>,
    page_size: usize,
}

impl PlatformStatesStore {
    pub fn new(table: Arc<dyn Table<PlatformStatesEntry>>, config: &ProjectorConfig) -> Self {
        Self {
            table,
            page_size: config.page_size,
        }
    }

    pub fn table(&self) -> &Arc<dyn Table<PlatformStatesEntry>> {
        &self.table
    }

    pub async fn get(&self, pk: &str) -> ProjectionResult<Option<PlatformStatesEntry>> {
        self.table.get(pk).await
    }

    async fn read_as<E>(
        &self,
        pk: String,
        expected: &'static str,
        pick: fn(PlatformStatesEntry) -> Option<E>,
    ) -> ProjectionResult<Option<E>> {
        match self.table.get(&pk).await? {
            None => Ok(None),
            Some(entry) => pick(entry)
                .map(Some)
                .ok_or(ProjectionError::UnexpectedEntry { pk, expected }),
        }
    }

    pub async fn read_purpose(&self, purpose_id: Uuid) -> ProjectionResult<Option<PlatformPurposeEntry>> {
        self.read_as(keys::platform_purpose_pk(purpose_id), "purpose", |entry| match entry {
            PlatformStatesEntry::Purpose(e) => Some(e),
            _ => None,
        })
        .await
    }

    pub async fn read_agreement(
        &self,
        agreement_id: Uuid,
    ) -> ProjectionResult<Option<PlatformAgreementEntry>> {
        self.read_as(keys::platform_agreement_pk(agreement_id), "agreement", |entry| match entry {
            PlatformStatesEntry::Agreement(e) => Some(e),
            _ => None,
        })
        .await
    }

    pub async fn read_catalog(
        &self,
        eservice_id: Uuid,
        descriptor_id: Uuid,
    ) -> ProjectionResult<Option<PlatformCatalogEntry>> {
        self.read_as(
            keys::platform_descriptor_pk(eservice_id, descriptor_id),
            "catalog",
            |entry| match entry {
                PlatformStatesEntry::Catalog(e) => Some(e),
                _ => None,
            },
        )
        .await
    }

    pub async fn read_client(&self, client_id: Uuid) -> ProjectionResult<Option<PlatformClientEntry>> {
        self.read_as(keys::platform_client_pk(client_id), "client", |entry| match entry {
            PlatformStatesEntry::Client(e) => Some(e),
            _ => None,
        })
        .await
    }

    /// Create or replace a row under the version gate
    pub async fn upsert(&self, entry: PlatformStatesEntry) -> ProjectionResult<WriteOutcome> {
        let pk = entry.pk().to_string();
        let version = entry.version().unwrap_or_default();

        let condition = match self.table.get(&pk).await? {
            None => WriteCondition::NotExists,
            Some(current) if discriminant(&current) != discriminant(&entry) => {
                return Err(ProjectionError::UnexpectedEntry {
                    pk,
                    expected: entry.kind_name(),
                });
            }
            Some(current) => {
                let stored_version = current.version().unwrap_or_default();
                if stored_version >= version {
                    debug!(pk = %pk, stored_version, version, "Stale write skipped");
                    return Ok(WriteOutcome::Stale { stored_version });
                }
                WriteCondition::VersionBelow(version)
            }
        };

        self.table.put(entry, condition).await?;
        debug!(pk = %pk, version, "Platform-states row written");
        Ok(WriteOutcome::Applied)
    }

    /// Remove a row under the version gate; removing an absent row is a no-op
    pub async fn delete(&self, pk: &str, version: u64) -> ProjectionResult<WriteOutcome> {
        let Some(current) = self.table.get(pk).await? else {
            debug!(pk = %pk, version, "Row already absent");
            return Ok(WriteOutcome::Absent);
        };

        let stored_version = current.version().unwrap_or_default();
        if stored_version >= version {
            debug!(pk = %pk, stored_version, version, "Stale delete skipped");
            return Ok(WriteOutcome::Stale { stored_version });
        }

        self.table
            .delete(pk, WriteCondition::AbsentOrVersionBelow(version))
            .await?;
        debug!(pk = %pk, version, "Platform-states row deleted");
        Ok(WriteOutcome::Applied)
    }

    /// Every agreement row of one (consumer, e-service) group, across all pages
    pub async fn agreements_by_consumer_eservice(
        &self,
        consumer_id: Uuid,
        eservice_id: Uuid,
    ) -> ProjectionResult<Vec<PlatformAgreementEntry>> {
        let rows = Paginator::new(
            self.table.clone(),
            PlatformIndex::ConsumerEService,
            keys::consumer_eservice_key(consumer_id, eservice_id),
            self.page_size,
        )
        .collect_all()
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|entry| match entry {
                PlatformStatesEntry::Agreement(e) => Some(e),
                _ => None,
            })
            .collect())
    }

    /// Group member with the greatest activation timestamp
    pub async fn latest_agreement(
        &self,
        consumer_id: Uuid,
        eservice_id: Uuid,
    ) -> ProjectionResult<Option<PlatformAgreementEntry>> {
        let group = self
            .agreements_by_consumer_eservice(consumer_id, eservice_id)
            .await?;
        Ok(derivation::latest_agreement(&group).cloned())
    }
}
