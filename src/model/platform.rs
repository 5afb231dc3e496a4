// Copyright (c) 2025 - Cowboy AI, Inc.
//! Platform-states rows
//!
//! One row per agreement, purpose, descriptor and client. A row exists only
//! while its aggregate has not reached a terminal state; absence means
//! archived. `version` is the stream version of the last applied event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::token::TokenClientKind;
use super::ItemState;
use crate::keys;
use crate::store::Item;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformPurposeEntry {
    #[serde(rename = "PK")]
    pub pk: String,
    pub state: ItemState,
    pub purpose_version_id: Uuid,
    pub purpose_eservice_id: Uuid,
    pub purpose_consumer_id: Uuid,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformAgreementEntry {
    #[serde(rename = "PK")]
    pub pk: String,
    pub state: ItemState,
    pub agreement_id: Uuid,
    pub consumer_id: Uuid,
    pub eservice_id: Uuid,
    #[serde(rename = "GSIPK_consumerId_eserviceId")]
    pub consumer_eservice: String,
    #[serde(rename = "GSISK_agreementTimestamp")]
    pub agreement_timestamp: DateTime<Utc>,
    pub agreement_descriptor_id: Uuid,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformCatalogEntry {
    #[serde(rename = "PK")]
    pub pk: String,
    pub state: ItemState,
    pub eservice_id: Uuid,
    pub descriptor_id: Uuid,
    pub descriptor_audience: Vec<String>,
    pub descriptor_voucher_lifespan: u32,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformClientEntry {
    #[serde(rename = "PK")]
    pub pk: String,
    pub state: ItemState,
    pub client_kind: TokenClientKind,
    pub client_consumer_id: Uuid,
    pub client_purposes_ids: Vec<Uuid>,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

/// Any row of the platform-states table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entryKind", rename_all = "camelCase")]
pub enum PlatformStatesEntry {
    Purpose(PlatformPurposeEntry),
    Agreement(PlatformAgreementEntry),
    Catalog(PlatformCatalogEntry),
    Client(PlatformClientEntry),
}

impl PlatformStatesEntry {
    pub fn kind_name(&self) -> &'static str {
        match self {
            PlatformStatesEntry::Purpose(_) => "purpose",
            PlatformStatesEntry::Agreement(_) => "agreement",
            PlatformStatesEntry::Catalog(_) => "catalog",
            PlatformStatesEntry::Client(_) => "client",
        }
    }
}

/// Secondary indexes of the platform-states table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformIndex {
    /// Agreements grouped by (consumer, e-service)
    ConsumerEService,
}

impl Item for PlatformStatesEntry {
    type Index = PlatformIndex;

    fn pk(&self) -> &str {
        match self {
            PlatformStatesEntry::Purpose(e) => &e.pk,
            PlatformStatesEntry::Agreement(e) => &e.pk,
            PlatformStatesEntry::Catalog(e) => &e.pk,
            PlatformStatesEntry::Client(e) => &e.pk,
        }
    }

    fn version(&self) -> Option<u64> {
        Some(match self {
            PlatformStatesEntry::Purpose(e) => e.version,
            PlatformStatesEntry::Agreement(e) => e.version,
            PlatformStatesEntry::Catalog(e) => e.version,
            PlatformStatesEntry::Client(e) => e.version,
        })
    }

    fn index_key(&self, index: PlatformIndex) -> Option<String> {
        match (index, self) {
            (PlatformIndex::ConsumerEService, PlatformStatesEntry::Agreement(e)) => {
                Some(e.consumer_eservice.clone())
            }
            _ => None,
        }
    }
}

impl PlatformAgreementEntry {
    /// Key of the descriptor this agreement was signed on
    pub fn eservice_descriptor(&self) -> String {
        keys::eservice_descriptor_key(self.eservice_id, self.agreement_descriptor_id)
    }
}
