// Copyright (c) 2025 - Cowboy AI, Inc.
//! Token-generation-states rows
//!
//! A fan-out row joins one client key (and, for consumer clients, one bound
//! purpose) with the current state of the related purpose, agreement and
//! descriptor. Every field sourced from platform-states is optional: it stays
//! unset until the owning entity has been projected at least once.
//!
//! Each aggregate owns a group of fields and only ever writes that group:
//!
//! | Owner      | Fields                                                      |
//! |------------|-------------------------------------------------------------|
//! | client     | key material, consumer, kind, client/kid/purpose indexes    |
//! | purpose    | [`PurposeFields`]                                           |
//! | agreement  | [`AgreementFields`]                                         |
//! | descriptor | [`DescriptorFields`]                                        |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::platform::{PlatformAgreementEntry, PlatformCatalogEntry, PlatformPurposeEntry};
use super::ItemState;
use crate::keys;
use crate::store::Item;

/// Client kind as seen by token issuance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenClientKind {
    Consumer,
    Api,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGenerationStatesEntry {
    #[serde(rename = "PK")]
    pub pk: String,
    pub consumer_id: Uuid,
    pub client_kind: TokenClientKind,
    pub public_key: String,
    #[serde(rename = "GSIPK_clientId")]
    pub client_id: Uuid,
    #[serde(rename = "GSIPK_kid")]
    pub kid: String,
    #[serde(
        rename = "GSIPK_clientId_purposeId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_purpose: Option<String>,
    #[serde(
        rename = "GSIPK_purposeId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub purpose_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose_state: Option<ItemState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose_version_id: Option<Uuid>,
    #[serde(
        rename = "GSIPK_consumerId_eserviceId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub consumer_eservice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement_state: Option<ItemState>,
    #[serde(
        rename = "GSIPK_eserviceId_descriptorId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub eservice_descriptor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor_state: Option<ItemState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor_audience: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor_voucher_lifespan: Option<u32>,
    pub updated_at: DateTime<Utc>,
}

/// Secondary indexes of the token-generation-states table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenIndex {
    Purpose,
    ConsumerEService,
    EServiceDescriptor,
    Client,
    ClientPurpose,
}

impl Item for TokenGenerationStatesEntry {
    type Index = TokenIndex;

    fn pk(&self) -> &str {
        &self.pk
    }

    fn version(&self) -> Option<u64> {
        None
    }

    fn index_key(&self, index: TokenIndex) -> Option<String> {
        match index {
            TokenIndex::Purpose => self.purpose_id.map(|id| id.to_string()),
            TokenIndex::ConsumerEService => self.consumer_eservice.clone(),
            TokenIndex::EServiceDescriptor => self.eservice_descriptor.clone(),
            TokenIndex::Client => Some(self.client_id.to_string()),
            TokenIndex::ClientPurpose => self.client_purpose.clone(),
        }
    }
}

/// Fields owned by the purpose projection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurposeFields {
    pub purpose_state: ItemState,
    pub purpose_version_id: Uuid,
    pub consumer_eservice: String,
}

/// Fields owned by the agreement projection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgreementFields {
    pub agreement_id: Uuid,
    pub agreement_state: ItemState,
    pub eservice_descriptor: String,
}

/// Fields owned by the catalog projection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorFields {
    pub descriptor_state: ItemState,
    pub descriptor_audience: Vec<String>,
    pub descriptor_voucher_lifespan: u32,
}

impl From<&PlatformPurposeEntry> for PurposeFields {
    fn from(entry: &PlatformPurposeEntry) -> Self {
        Self {
            purpose_state: entry.state,
            purpose_version_id: entry.purpose_version_id,
            consumer_eservice: keys::consumer_eservice_key(
                entry.purpose_consumer_id,
                entry.purpose_eservice_id,
            ),
        }
    }
}

impl From<&PlatformAgreementEntry> for AgreementFields {
    fn from(entry: &PlatformAgreementEntry) -> Self {
        Self {
            agreement_id: entry.agreement_id,
            agreement_state: entry.state,
            eservice_descriptor: entry.eservice_descriptor(),
        }
    }
}

impl From<&PlatformCatalogEntry> for DescriptorFields {
    fn from(entry: &PlatformCatalogEntry) -> Self {
        Self {
            descriptor_state: entry.state,
            descriptor_audience: entry.descriptor_audience.clone(),
            descriptor_voucher_lifespan: entry.descriptor_voucher_lifespan,
        }
    }
}

impl TokenGenerationStatesEntry {
    /// New row carrying only the client-owned fields
    pub fn new(
        client_id: Uuid,
        kid: &str,
        purpose_id: Option<Uuid>,
        consumer_id: Uuid,
        client_kind: TokenClientKind,
        public_key: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let pk = match purpose_id {
            Some(purpose_id) => keys::token_client_kid_purpose_pk(client_id, kid, purpose_id),
            None => keys::token_client_kid_pk(client_id, kid),
        };

        Self {
            pk,
            consumer_id,
            client_kind,
            public_key: public_key.to_string(),
            client_id,
            kid: kid.to_string(),
            client_purpose: purpose_id.map(|p| keys::client_purpose_key(client_id, p)),
            purpose_id,
            purpose_state: None,
            purpose_version_id: None,
            consumer_eservice: None,
            agreement_id: None,
            agreement_state: None,
            eservice_descriptor: None,
            descriptor_state: None,
            descriptor_audience: None,
            descriptor_voucher_lifespan: None,
            updated_at: now,
        }
    }

    pub fn apply_purpose(&mut self, fields: &PurposeFields) {
        self.purpose_state = Some(fields.purpose_state);
        self.purpose_version_id = Some(fields.purpose_version_id);
        self.consumer_eservice = Some(fields.consumer_eservice.clone());
    }

    pub fn apply_agreement(&mut self, fields: &AgreementFields) {
        self.agreement_id = Some(fields.agreement_id);
        self.agreement_state = Some(fields.agreement_state);
        self.eservice_descriptor = Some(fields.eservice_descriptor.clone());
    }

    /// Replace descriptor fields; `None` clears them
    pub fn apply_descriptor(&mut self, fields: Option<&DescriptorFields>) {
        self.descriptor_state = fields.map(|f| f.descriptor_state);
        self.descriptor_audience = fields.map(|f| f.descriptor_audience.clone());
        self.descriptor_voucher_lifespan = fields.map(|f| f.descriptor_voucher_lifespan);
    }

    pub fn has_agreement(&self) -> bool {
        self.agreement_id.is_some()
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Whether every joined entity is present and active
    pub fn is_authorizable(&self) -> bool {
        match self.client_kind {
            TokenClientKind::Api => true,
            TokenClientKind::Consumer => {
                [self.purpose_state, self.agreement_state, self.descriptor_state]
                    .into_iter()
                    .all(|state| state.is_some_and(ItemState::is_active))
            }
        }
    }
}
