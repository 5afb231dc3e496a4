// Copyright (c) 2025 - Cowboy AI, Inc.
//! Agreement snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Business state of an agreement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AgreementState {
    Draft,
    Pending,
    Active,
    Suspended,
    Archived,
    Rejected,
    MissingCertifiedAttributes,
}

/// Who did what, and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementStamp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub who: Option<Uuid>,
    pub when: DateTime<Utc>,
}

/// Lifecycle stamps relevant to the projection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementStamps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation: Option<AgreementStamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspension_by_consumer: Option<AgreementStamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspension_by_producer: Option<AgreementStamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archiving: Option<AgreementStamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agreement {
    pub id: Uuid,
    pub eservice_id: Uuid,
    pub descriptor_id: Uuid,
    pub producer_id: Uuid,
    pub consumer_id: Uuid,
    pub state: AgreementState,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub stamps: AgreementStamps,
}

impl Agreement {
    /// Timestamp that orders agreements sharing a (consumer, e-service) pair.
    ///
    /// Activation time when the agreement has been activated, creation time otherwise.
    pub fn grouping_timestamp(&self) -> DateTime<Utc> {
        self.stamps
            .activation
            .as_ref()
            .map(|stamp| stamp.when)
            .unwrap_or(self.created_at)
    }
}
