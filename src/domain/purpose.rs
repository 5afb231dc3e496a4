// Copyright (c) 2025 - Cowboy AI, Inc.
//! Purpose snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Business state of a single purpose version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PurposeVersionState {
    Draft,
    Active,
    Suspended,
    Archived,
    WaitingForApproval,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurposeVersion {
    pub id: Uuid,
    pub state: PurposeVersionState,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub daily_calls: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purpose {
    pub id: Uuid,
    pub eservice_id: Uuid,
    pub consumer_id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub versions: Vec<PurposeVersion>,
}
