// Copyright (c) 2025 - Cowboy AI, Inc.
//! E-service and descriptor snapshot

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Business state of an e-service descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DescriptorState {
    Draft,
    WaitingForApproval,
    Published,
    Deprecated,
    Suspended,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub id: Uuid,
    #[serde(default)]
    pub version: String,
    pub state: DescriptorState,
    #[serde(default)]
    pub audience: Vec<String>,
    /// Seconds a voucher issued against this descriptor stays valid
    pub voucher_lifespan: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EService {
    pub id: Uuid,
    pub producer_id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub descriptors: Vec<Descriptor>,
}

impl EService {
    pub fn descriptor(&self, descriptor_id: Uuid) -> Option<&Descriptor> {
        self.descriptors.iter().find(|d| d.id == descriptor_id)
    }
}
