// Copyright (c) 2025 - Cowboy AI, Inc.
//! Shared fan-out helpers
//!
//! Back-filling joins whatever platform-states rows exist at the moment of the
//! call. A missing row leaves the corresponding fields unset.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::derivation;
use crate::domain::Client;
use crate::errors::ProjectionResult;
use crate::model::{
    AgreementFields, DescriptorFields, PlatformAgreementEntry, PurposeFields, TokenClientKind,
    TokenGenerationStatesEntry,
};
use crate::store::PlatformStatesStore;

/// Agreement and descriptor fields of the group's latest agreement
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AgreementContext {
    pub agreement: AgreementFields,
    pub descriptor: Option<DescriptorFields>,
}

impl AgreementContext {
    pub(crate) fn apply(&self, row: &mut TokenGenerationStatesEntry) {
        row.apply_agreement(&self.agreement);
        row.apply_descriptor(self.descriptor.as_ref());
    }
}

pub(crate) async fn descriptor_fields_for(
    platform: &PlatformStatesStore,
    agreement: &PlatformAgreementEntry,
) -> ProjectionResult<Option<DescriptorFields>> {
    Ok(platform
        .read_catalog(agreement.eservice_id, agreement.agreement_descriptor_id)
        .await?
        .as_ref()
        .map(DescriptorFields::from))
}

/// Context of the latest agreement for (consumer, e-service), if any exists
pub(crate) async fn agreement_context(
    platform: &PlatformStatesStore,
    consumer_id: Uuid,
    eservice_id: Uuid,
) -> ProjectionResult<Option<AgreementContext>> {
    let Some(latest) = platform.latest_agreement(consumer_id, eservice_id).await? else {
        return Ok(None);
    };

    Ok(Some(AgreementContext {
        agreement: AgreementFields::from(&latest),
        descriptor: descriptor_fields_for(platform, &latest).await?,
    }))
}

/// Rows a client snapshot requires: one per key and bound purpose for
/// consumer clients, one per key when there is no purpose to bind.
pub(crate) fn desired_rows(client: &Client, now: DateTime<Utc>) -> Vec<TokenGenerationStatesEntry> {
    let kind = derivation::token_client_kind(client.kind);
    let purposes: Vec<Option<Uuid>> = match kind {
        TokenClientKind::Consumer if !client.purposes.is_empty() => {
            client.purposes.iter().copied().map(Some).collect()
        }
        _ => vec![None],
    };

    client
        .keys
        .iter()
        .flat_map(|key| {
            purposes.iter().map(move |purpose_id| {
                TokenGenerationStatesEntry::new(
                    client.id,
                    &key.kid,
                    *purpose_id,
                    client.consumer_id,
                    kind,
                    &key.encoded_pem,
                    now,
                )
            })
        })
        .collect()
}

/// Fill a brand-new row from the purpose, agreement and descriptor rows
/// currently in platform-states.
pub(crate) async fn populate(
    platform: &PlatformStatesStore,
    row: &mut TokenGenerationStatesEntry,
) -> ProjectionResult<()> {
    let Some(purpose_id) = row.purpose_id else {
        return Ok(());
    };
    let Some(purpose) = platform.read_purpose(purpose_id).await? else {
        return Ok(());
    };

    row.apply_purpose(&PurposeFields::from(&purpose));
    if let Some(context) =
        agreement_context(platform, purpose.purpose_consumer_id, purpose.purpose_eservice_id).await?
    {
        context.apply(row);
    }
    Ok(())
}
