// Copyright (c) 2025 - Cowboy AI, Inc.
//! Key-Value Store Contract
//!
//! The projection writes into a sorted key-value store offering:
//!
//! 1. get by primary key
//! 2. conditional put/delete keyed on the stored `version` or on absence
//! 3. query by secondary index with continuation tokens
//! 4. bounded batch writes reporting unprocessed items
//!
//! # Architecture
//!
//! ```text
//!                ┌──────────────────────┐      ┌─────────────────────────────┐
//! consumers ───> │ PlatformStatesStore  │      │ TokenGenerationStatesStore  │
//!                └──────────┬───────────┘      └──────┬───────────────┬──────┘
//!                           │                  Paginator (read)  BatchWriter (write)
//!                           ▼                         ▼               ▼
//!                ┌──────────────────────────────────────────────────────────┐
//!                │ Table<T>: MemoryTable | NatsKvTable                      │
//!                └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Read pagination and write batching are separate units so each can be
//! tested on its own.

pub mod batch;
pub mod memory;
pub mod nats_kv;
pub mod pagination;
pub mod platform;
pub mod token;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

use crate::errors::ProjectionResult;

pub use batch::BatchWriter;
pub use memory::MemoryTable;
pub use nats_kv::NatsKvTable;
pub use pagination::Paginator;
pub use platform::{PlatformStatesStore, WriteOutcome};
pub use token::{TokenGenerationStatesStore, TokenQuery};

/// A row stored in a [`Table`]
pub trait Item: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Secondary indexes the row can be queried by
    type Index: Copy + Eq + Debug + Send + Sync + 'static;

    fn pk(&self) -> &str;

    /// Stream version of the last applied event, for versioned rows
    fn version(&self) -> Option<u64>;

    /// Key of this row in the given index, `None` if the row is not indexed there
    fn index_key(&self, index: Self::Index) -> Option<String>;
}

/// Condition attached to a single-row write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCondition {
    Unconditional,
    /// Row must not exist
    NotExists,
    /// Row must exist with `version` strictly below the given one
    VersionBelow(u64),
    /// Row must be absent, or exist with `version` strictly below the given one
    AbsentOrVersionBelow(u64),
}

impl WriteCondition {
    /// Evaluate the condition against the currently stored row
    pub fn holds<T: Item>(&self, current: Option<&T>) -> bool {
        match (self, current) {
            (WriteCondition::Unconditional, _) => true,
            (WriteCondition::NotExists, current) => current.is_none(),
            (WriteCondition::VersionBelow(_), None) => false,
            (WriteCondition::VersionBelow(v), Some(row)) => {
                row.version().map_or(false, |stored| stored < *v)
            }
            (WriteCondition::AbsentOrVersionBelow(_), None) => true,
            (WriteCondition::AbsentOrVersionBelow(v), Some(row)) => {
                row.version().map_or(true, |stored| stored < *v)
            }
        }
    }
}

/// Continuation token: primary key of the last row of the previous page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageToken(pub String);

/// One page of query results
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Present when more rows may follow
    pub next: Option<PageToken>,
}

/// A single request inside a batch write
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRequest<T> {
    Put(T),
    Delete(String),
}

impl<T: Item> WriteRequest<T> {
    pub fn pk(&self) -> &str {
        match self {
            WriteRequest::Put(item) => item.pk(),
            WriteRequest::Delete(pk) => pk,
        }
    }
}

/// Result of one batch write call
#[derive(Debug, Clone)]
pub struct BatchWriteOutcome<T> {
    /// Requests the store did not apply; callers retry these
    pub unprocessed: Vec<WriteRequest<T>>,
}

impl<T> BatchWriteOutcome<T> {
    pub fn complete() -> Self {
        Self {
            unprocessed: Vec::new(),
        }
    }
}

/// A table of the key-value store
#[async_trait]
pub trait Table<T: Item>: Send + Sync {
    /// Table name, for logs
    fn name(&self) -> &str;

    async fn get(&self, pk: &str) -> ProjectionResult<Option<T>>;

    /// Write a row; fails with `ConditionalCheckFailed` when the condition does not hold
    async fn put(&self, item: T, condition: WriteCondition) -> ProjectionResult<()>;

    /// Remove a row; fails with `ConditionalCheckFailed` when the condition does not hold
    async fn delete(&self, pk: &str, condition: WriteCondition) -> ProjectionResult<()>;

    /// Rows whose `index` key equals `key`, in primary key order, after `start_after`
    async fn query(
        &self,
        index: T::Index,
        key: &str,
        start_after: Option<&PageToken>,
        limit: usize,
    ) -> ProjectionResult<Page<T>>;

    /// Apply up to [`crate::config::MAX_BATCH_SIZE`] unconditional writes
    async fn batch_write(
        &self,
        requests: Vec<WriteRequest<T>>,
    ) -> ProjectionResult<BatchWriteOutcome<T>>;
}
