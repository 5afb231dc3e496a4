// Copyright (c) 2025 - Cowboy AI, Inc.
//! Projection Rows
//!
//! Rows of the two state tables:
//!
//! - [`platform`] - one row per domain entity, carrying the stream `version`
//!   used for idempotent application
//! - [`token`] - fan-out rows joining client, key, purpose, agreement and
//!   descriptor state for single-lookup token issuance
//!
//! Both tiers expose the same two-valued [`ItemState`].

pub mod platform;
pub mod token;

use serde::{Deserialize, Serialize};

pub use platform::{
    PlatformAgreementEntry, PlatformCatalogEntry, PlatformClientEntry, PlatformIndex,
    PlatformPurposeEntry, PlatformStatesEntry,
};
pub use token::{
    AgreementFields, DescriptorFields, PurposeFields, TokenClientKind, TokenGenerationStatesEntry,
    TokenIndex,
};

/// Two-valued status carried by every projected row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemState {
    Active,
    Inactive,
}

impl ItemState {
    pub fn is_active(self) -> bool {
        self == ItemState::Active
    }
}
