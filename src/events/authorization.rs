// Copyright (c) 2025 - Cowboy AI, Inc.
//! Authorization client events
//!
//! Client events carry the client snapshot with its keys and bound purposes;
//! the consumer reconciles fan-out rows against it. `ClientDeleted` only
//! carries the client id.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::EventEnvelope;
use crate::domain::{Client, ClientKey, ClientKind};
use crate::errors::{ProjectionError, ProjectionResult};

/// Generation-free client change
#[derive(Debug, Clone, PartialEq)]
pub enum ClientUpdate {
    /// Reconcile platform and fan-out rows with the snapshot
    Snapshot(Client),
    /// Client removed with all of its rows
    Deletion(Uuid),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientPayloadV2 {
    #[serde(default)]
    client: Option<Client>,
    #[serde(default)]
    client_id: Option<Uuid>,
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    purpose_id: Option<Uuid>,
}

fn missing(envelope: &EventEnvelope, field: &str) -> ProjectionError {
    ProjectionError::invalid_payload(&envelope.event_type, format!("missing {}", field))
}

/// Second generation client events
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorizationEventV2 {
    ClientAdded(Client),
    ClientKeyAdded { client: Client, kid: String },
    ClientKeyDeleted { client: Client, kid: String },
    ClientPurposeAdded { client: Client, purpose_id: Uuid },
    ClientPurposeRemoved { client: Client, purpose_id: Uuid },
    ClientDeleted(Uuid),
    NoOp(String),
}

impl AuthorizationEventV2 {
    pub fn decode(envelope: &EventEnvelope) -> ProjectionResult<Self> {
        use AuthorizationEventV2::*;

        let event_type = envelope.event_type.as_str();
        if matches!(
            event_type,
            "ClientUserAdded" | "ClientUserDeleted" | "ClientAdminSet" | "ClientAdminRemoved"
        ) {
            return Ok(NoOp(envelope.event_type.clone()));
        }
        if !matches!(
            event_type,
            "ClientAdded"
                | "ClientKeyAdded"
                | "ClientKeyDeleted"
                | "ClientPurposeAdded"
                | "ClientPurposeRemoved"
                | "ClientDeleted"
        ) {
            return Err(envelope.unknown_type());
        }

        let payload = envelope.payload::<ClientPayloadV2>()?;
        if event_type == "ClientDeleted" {
            let client_id = payload
                .client_id
                .or(payload.client.map(|c| c.id))
                .ok_or_else(|| missing(envelope, "clientId"))?;
            return Ok(ClientDeleted(client_id));
        }

        let client = payload.client.ok_or_else(|| missing(envelope, "client"))?;
        let kid = || payload.kid.clone().ok_or_else(|| missing(envelope, "kid"));
        let purpose_id = || payload.purpose_id.ok_or_else(|| missing(envelope, "purposeId"));

        let event = match event_type {
            "ClientKeyAdded" => ClientKeyAdded { kid: kid()?, client },
            "ClientKeyDeleted" => ClientKeyDeleted { kid: kid()?, client },
            "ClientPurposeAdded" => ClientPurposeAdded {
                purpose_id: purpose_id()?,
                client,
            },
            "ClientPurposeRemoved" => ClientPurposeRemoved {
                purpose_id: purpose_id()?,
                client,
            },
            _ => ClientAdded(client),
        };
        event.check_subject(envelope)?;
        Ok(event)
    }

    /// The key or purpose an event names must agree with the snapshot it
    /// carries: present after an addition, gone after a removal.
    fn check_subject(&self, envelope: &EventEnvelope) -> ProjectionResult<()> {
        use AuthorizationEventV2::*;

        let (subject, added, present) = match self {
            ClientKeyAdded { client, kid } => (format!("kid {}", kid), true, client.key(kid).is_some()),
            ClientKeyDeleted { client, kid } => (format!("kid {}", kid), false, client.key(kid).is_some()),
            ClientPurposeAdded { client, purpose_id } => {
                (format!("purpose {}", purpose_id), true, client.purposes.contains(purpose_id))
            }
            ClientPurposeRemoved { client, purpose_id } => {
                (format!("purpose {}", purpose_id), false, client.purposes.contains(purpose_id))
            }
            _ => return Ok(()),
        };
        if added == present {
            return Ok(());
        }
        Err(ProjectionError::InconsistentPayload(format!(
            "{} names {} {} the client snapshot",
            envelope.event_type,
            subject,
            if added { "missing from" } else { "still in" }
        )))
    }

    pub fn into_update(self) -> Option<ClientUpdate> {
        use AuthorizationEventV2::*;

        match self {
            ClientAdded(client)
            | ClientKeyAdded { client, .. }
            | ClientKeyDeleted { client, .. }
            | ClientPurposeAdded { client, .. }
            | ClientPurposeRemoved { client, .. } => Some(ClientUpdate::Snapshot(client)),
            ClientDeleted(client_id) => Some(ClientUpdate::Deletion(client_id)),
            NoOp(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum ClientKindV1 {
    Consumer,
    Api,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyV1 {
    kid: String,
    encoded_pem: String,
    #[serde(default, rename = "alg")]
    algorithm: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientV1 {
    id: Uuid,
    consumer_id: Uuid,
    kind: ClientKindV1,
    #[serde(default, rename = "purposesIds")]
    purposes: Vec<Uuid>,
    #[serde(default)]
    keys: Vec<KeyV1>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
}

impl From<ClientV1> for Client {
    fn from(v1: ClientV1) -> Self {
        Client {
            id: v1.id,
            consumer_id: v1.consumer_id,
            kind: match v1.kind {
                ClientKindV1::Consumer => ClientKind::Consumer,
                ClientKindV1::Api => ClientKind::Api,
            },
            purposes: v1.purposes,
            keys: v1
                .keys
                .into_iter()
                .map(|k| ClientKey {
                    kid: k.kid,
                    encoded_pem: k.encoded_pem,
                    algorithm: k.algorithm,
                })
                .collect(),
            created_at: v1.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientPayloadV1 {
    #[serde(default)]
    client: Option<ClientV1>,
    #[serde(default)]
    client_id: Option<Uuid>,
}

/// First generation client events
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorizationEventV1 {
    ClientAdded(Client),
    KeysAdded(Client),
    KeyDeleted(Client),
    ClientPurposeAdded(Client),
    ClientPurposeRemoved(Client),
    ClientDeleted(Uuid),
    NoOp(String),
}

impl AuthorizationEventV1 {
    pub fn decode(envelope: &EventEnvelope) -> ProjectionResult<Self> {
        use AuthorizationEventV1::*;

        let snapshot = || -> ProjectionResult<Client> {
            envelope
                .payload::<ClientPayloadV1>()?
                .client
                .map(Into::into)
                .ok_or_else(|| missing(envelope, "client"))
        };

        Ok(match envelope.event_type.as_str() {
            "ClientAdded" => ClientAdded(snapshot()?),
            "KeysAdded" => KeysAdded(snapshot()?),
            "KeyDeleted" => KeyDeleted(snapshot()?),
            "ClientPurposeAdded" => ClientPurposeAdded(snapshot()?),
            "ClientPurposeRemoved" => ClientPurposeRemoved(snapshot()?),
            "ClientDeleted" => {
                let payload = envelope.payload::<ClientPayloadV1>()?;
                let client_id = payload
                    .client_id
                    .or(payload.client.map(|c| c.id))
                    .ok_or_else(|| missing(envelope, "clientId"))?;
                ClientDeleted(client_id)
            }
            "RelationshipAdded" | "RelationshipRemoved" | "UserAdded" | "UserRemoved" => {
                NoOp(envelope.event_type.clone())
            }
            _ => return Err(envelope.unknown_type()),
        })
    }

    pub fn into_update(self) -> Option<ClientUpdate> {
        use AuthorizationEventV1::*;

        match self {
            ClientAdded(c) | KeysAdded(c) | KeyDeleted(c) | ClientPurposeAdded(c)
            | ClientPurposeRemoved(c) => Some(ClientUpdate::Snapshot(c)),
            ClientDeleted(client_id) => Some(ClientUpdate::Deletion(client_id)),
            NoOp(_) => None,
        }
    }
}
