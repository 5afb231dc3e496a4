// Copyright (c) 2025 - Cowboy AI, Inc.
//! Key Composer
//!
//! Pure functions mapping aggregate identifiers to primary keys and
//! secondary-index keys of the two state tables. No I/O.
//!
//! ```text
//! platform-states                        token-generation-states
//! ───────────────                        ───────────────────────
//! PURPOSE#<purposeId>                    CLIENTKIDPURPOSE#<clientId>#<kid>#<purposeId>
//! AGREEMENT#<agreementId>                CLIENTKID#<clientId>#<kid>
//! ESERVICEDESCRIPTOR#<eserviceId>#<descriptorId>
//! CLIENT#<clientId>
//! ```
//!
//! Composite index keys join their parts with `#`.

use uuid::Uuid;

const PURPOSE_PREFIX: &str = "PURPOSE";
const AGREEMENT_PREFIX: &str = "AGREEMENT";
const DESCRIPTOR_PREFIX: &str = "ESERVICEDESCRIPTOR";
const CLIENT_PREFIX: &str = "CLIENT";
const CLIENT_KID_PURPOSE_PREFIX: &str = "CLIENTKIDPURPOSE";
const CLIENT_KID_PREFIX: &str = "CLIENTKID";

pub const SEPARATOR: char = '#';

pub fn platform_purpose_pk(purpose_id: Uuid) -> String {
    format!("{}#{}", PURPOSE_PREFIX, purpose_id)
}

pub fn platform_agreement_pk(agreement_id: Uuid) -> String {
    format!("{}#{}", AGREEMENT_PREFIX, agreement_id)
}

pub fn platform_descriptor_pk(eservice_id: Uuid, descriptor_id: Uuid) -> String {
    format!("{}#{}#{}", DESCRIPTOR_PREFIX, eservice_id, descriptor_id)
}

pub fn platform_client_pk(client_id: Uuid) -> String {
    format!("{}#{}", CLIENT_PREFIX, client_id)
}

/// Fan-out row of a consumer client bound to a purpose
pub fn token_client_kid_purpose_pk(client_id: Uuid, kid: &str, purpose_id: Uuid) -> String {
    format!(
        "{}#{}#{}#{}",
        CLIENT_KID_PURPOSE_PREFIX, client_id, kid, purpose_id
    )
}

/// Fan-out row of an api client, or of a consumer client without purposes
pub fn token_client_kid_pk(client_id: Uuid, kid: &str) -> String {
    format!("{}#{}#{}", CLIENT_KID_PREFIX, client_id, kid)
}

/// Grouping key shared by agreements of one consumer on one e-service
pub fn consumer_eservice_key(consumer_id: Uuid, eservice_id: Uuid) -> String {
    format!("{}#{}", consumer_id, eservice_id)
}

pub fn eservice_descriptor_key(eservice_id: Uuid, descriptor_id: Uuid) -> String {
    format!("{}#{}", eservice_id, descriptor_id)
}

pub fn client_purpose_key(client_id: Uuid, purpose_id: Uuid) -> String {
    format!("{}#{}", client_id, purpose_id)
}

/// Components of a token-generation-states primary key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEntryKey {
    pub client_id: Uuid,
    pub kid: String,
    pub purpose_id: Option<Uuid>,
}

/// Split a token-generation-states primary key back into its parts
pub fn parse_token_pk(pk: &str) -> Option<TokenEntryKey> {
    let (prefix, rest) = pk.split_once(SEPARATOR)?;
    let (client, rest) = rest.split_once(SEPARATOR)?;
    let client_id = Uuid::parse_str(client).ok()?;

    match prefix {
        CLIENT_KID_PURPOSE_PREFIX => {
            let (kid, purpose) = rest.rsplit_once(SEPARATOR)?;
            if kid.is_empty() {
                return None;
            }
            Some(TokenEntryKey {
                client_id,
                kid: kid.to_string(),
                purpose_id: Some(Uuid::parse_str(purpose).ok()?),
            })
        }
        CLIENT_KID_PREFIX if !rest.is_empty() => Some(TokenEntryKey {
            client_id,
            kid: rest.to_string(),
            purpose_id: None,
        }),
        _ => None,
    }
}
