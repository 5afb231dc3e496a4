// Copyright (c) 2025 - Cowboy AI, Inc.
//! State Derivation
//!
//! Pure functions turning aggregate snapshots into platform-states rows.
//! Business states map to a [`Disposition`] through lookup tables, so a new
//! business state only needs a new table line.
//!
//! ```text
//! snapshot ──> Disposition ──> Upsert(ItemState) | Delete | Skip
//! ```
//!
//! Two rules need more than a table:
//!
//! - **Winning purpose version**: among versions in `active`, `suspended` or
//!   `archived`, the one created last (ties: larger version id).
//!   [`winning_purpose_version`] is the only implementation and every caller
//!   goes through it.
//! - **Latest agreement**: among agreements sharing (consumer, e-service),
//!   the one with the greatest activation timestamp (ties: larger agreement
//!   id). Processing order is never used.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Agreement, AgreementState, Client, ClientKind, Descriptor, DescriptorState, Purpose,
    PurposeVersion, PurposeVersionState,
};
use crate::keys;
use crate::model::{
    ItemState, PlatformAgreementEntry, PlatformCatalogEntry, PlatformClientEntry,
    PlatformPurposeEntry, PurposeFields, TokenClientKind,
};

/// What a snapshot implies for its platform-states row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Row must exist with this state
    Upsert(ItemState),
    /// Terminal state reached, row must be absent
    Delete,
    /// State never projected
    Skip,
}

const AGREEMENT_DISPOSITIONS: &[(AgreementState, Disposition)] = &[
    (AgreementState::Active, Disposition::Upsert(ItemState::Active)),
    (AgreementState::Suspended, Disposition::Upsert(ItemState::Inactive)),
    (AgreementState::Archived, Disposition::Delete),
    (AgreementState::Draft, Disposition::Skip),
    (AgreementState::Pending, Disposition::Skip),
    (AgreementState::Rejected, Disposition::Skip),
    (AgreementState::MissingCertifiedAttributes, Disposition::Skip),
];

const DESCRIPTOR_DISPOSITIONS: &[(DescriptorState, Disposition)] = &[
    (DescriptorState::Published, Disposition::Upsert(ItemState::Active)),
    (DescriptorState::Deprecated, Disposition::Upsert(ItemState::Active)),
    (DescriptorState::Suspended, Disposition::Upsert(ItemState::Inactive)),
    (DescriptorState::Archived, Disposition::Delete),
    (DescriptorState::Draft, Disposition::Skip),
    (DescriptorState::WaitingForApproval, Disposition::Skip),
];

/// Purpose version states that can carry the winning version
const RELEVANT_PURPOSE_VERSION_STATES: &[PurposeVersionState] = &[
    PurposeVersionState::Active,
    PurposeVersionState::Suspended,
    PurposeVersionState::Archived,
];

fn lookup<S: PartialEq + Copy>(table: &[(S, Disposition)], state: S) -> Disposition {
    table
        .iter()
        .find(|(s, _)| *s == state)
        .map(|(_, d)| *d)
        .unwrap_or(Disposition::Skip)
}

pub fn agreement_disposition(state: AgreementState) -> Disposition {
    lookup(AGREEMENT_DISPOSITIONS, state)
}

pub fn descriptor_disposition(state: DescriptorState) -> Disposition {
    lookup(DESCRIPTOR_DISPOSITIONS, state)
}

/// `active` only for an active agreement
pub fn agreement_item_state(state: AgreementState) -> ItemState {
    match agreement_disposition(state) {
        Disposition::Upsert(item_state) => item_state,
        _ => ItemState::Inactive,
    }
}

/// `active` for published and deprecated descriptors
pub fn descriptor_item_state(state: DescriptorState) -> ItemState {
    match descriptor_disposition(state) {
        Disposition::Upsert(item_state) => item_state,
        _ => ItemState::Inactive,
    }
}

/// `active` if any version of the purpose is active
pub fn purpose_item_state(purpose: &Purpose) -> ItemState {
    if purpose
        .versions
        .iter()
        .any(|v| v.state == PurposeVersionState::Active)
    {
        ItemState::Active
    } else {
        ItemState::Inactive
    }
}

pub fn winning_purpose_version(purpose: &Purpose) -> Option<&PurposeVersion> {
    purpose
        .versions
        .iter()
        .filter(|v| RELEVANT_PURPOSE_VERSION_STATES.contains(&v.state))
        .max_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)))
}

pub fn purpose_disposition(purpose: &Purpose) -> Disposition {
    match winning_purpose_version(purpose) {
        None => Disposition::Skip,
        Some(v) if v.state == PurposeVersionState::Archived => Disposition::Delete,
        Some(_) => Disposition::Upsert(purpose_item_state(purpose)),
    }
}

/// Purpose-owned fan-out fields, `None` when no row would be projected
pub fn purpose_fields(purpose: &Purpose) -> Option<PurposeFields> {
    let Disposition::Upsert(purpose_state) = purpose_disposition(purpose) else {
        return None;
    };
    let winning = winning_purpose_version(purpose)?;

    Some(PurposeFields {
        purpose_state,
        purpose_version_id: winning.id,
        consumer_eservice: keys::consumer_eservice_key(purpose.consumer_id, purpose.eservice_id),
    })
}

pub fn token_client_kind(kind: ClientKind) -> TokenClientKind {
    match kind {
        ClientKind::Consumer => TokenClientKind::Consumer,
        ClientKind::Api => TokenClientKind::Api,
    }
}

/// Platform row for a purpose, `None` unless the purpose is projected
pub fn platform_purpose_entry(
    purpose: &Purpose,
    version: u64,
    now: DateTime<Utc>,
) -> Option<PlatformPurposeEntry> {
    let Disposition::Upsert(state) = purpose_disposition(purpose) else {
        return None;
    };
    let winning = winning_purpose_version(purpose)?;

    Some(PlatformPurposeEntry {
        pk: keys::platform_purpose_pk(purpose.id),
        state,
        purpose_version_id: winning.id,
        purpose_eservice_id: purpose.eservice_id,
        purpose_consumer_id: purpose.consumer_id,
        version,
        updated_at: now,
    })
}

pub fn platform_agreement_entry(
    agreement: &Agreement,
    version: u64,
    now: DateTime<Utc>,
) -> PlatformAgreementEntry {
    PlatformAgreementEntry {
        pk: keys::platform_agreement_pk(agreement.id),
        state: agreement_item_state(agreement.state),
        agreement_id: agreement.id,
        consumer_id: agreement.consumer_id,
        eservice_id: agreement.eservice_id,
        consumer_eservice: keys::consumer_eservice_key(agreement.consumer_id, agreement.eservice_id),
        agreement_timestamp: agreement.grouping_timestamp(),
        agreement_descriptor_id: agreement.descriptor_id,
        version,
        updated_at: now,
    }
}

pub fn platform_catalog_entry(
    eservice_id: Uuid,
    descriptor: &Descriptor,
    version: u64,
    now: DateTime<Utc>,
) -> PlatformCatalogEntry {
    PlatformCatalogEntry {
        pk: keys::platform_descriptor_pk(eservice_id, descriptor.id),
        state: descriptor_item_state(descriptor.state),
        eservice_id,
        descriptor_id: descriptor.id,
        descriptor_audience: descriptor.audience.clone(),
        descriptor_voucher_lifespan: descriptor.voucher_lifespan,
        version,
        updated_at: now,
    }
}

pub fn platform_client_entry(
    client: &Client,
    version: u64,
    now: DateTime<Utc>,
) -> PlatformClientEntry {
    PlatformClientEntry {
        pk: keys::platform_client_pk(client.id),
        state: ItemState::Active,
        client_kind: token_client_kind(client.kind),
        client_consumer_id: client.consumer_id,
        client_purposes_ids: client.purposes.clone(),
        version,
        updated_at: now,
    }
}

/// Group member allowed to drive the fan-out
pub fn latest_agreement<'a, I>(entries: I) -> Option<&'a PlatformAgreementEntry>
where
    I: IntoIterator<Item = &'a PlatformAgreementEntry>,
{
    entries
        .into_iter()
        .max_by(|a, b| (a.agreement_timestamp, a.agreement_id).cmp(&(b.agreement_timestamp, b.agreement_id)))
}

/// Whether an agreement with this timestamp beats every other group member
pub fn is_latest_agreement(
    agreement_id: Uuid,
    timestamp: DateTime<Utc>,
    group: &[PlatformAgreementEntry],
) -> bool {
    group
        .iter()
        .filter(|other| other.agreement_id != agreement_id)
        .all(|other| (timestamp, agreement_id) > (other.agreement_timestamp, other.agreement_id))
}
