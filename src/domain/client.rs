// Copyright (c) 2025 - Cowboy AI, Inc.
//! Authorization client snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Business kind of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientKind {
    Consumer,
    Api,
}

/// Public key registered on a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientKey {
    pub kid: String,
    pub encoded_pem: String,
    #[serde(default)]
    pub algorithm: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub consumer_id: Uuid,
    pub kind: ClientKind,
    #[serde(default)]
    pub purposes: Vec<Uuid>,
    #[serde(default)]
    pub keys: Vec<ClientKey>,
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn key(&self, kid: &str) -> Option<&ClientKey> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}
