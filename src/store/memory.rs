// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-memory table
//!
//! Sorted map behind an async lock, with the same conditional-write,
//! pagination and batch-size rules as the networked backend. Used by tests
//! and for local runs. Fault injection makes a number of upcoming batch items
//! come back unprocessed.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use super::{BatchWriteOutcome, Item, Page, PageToken, Table, WriteCondition, WriteRequest};
use crate::config::MAX_BATCH_SIZE;
use crate::errors::{ProjectionError, ProjectionResult};

pub struct MemoryTable<T: Item> {
    name: String,
    rows: RwLock<BTreeMap<String, T>>,
    page_size: usize,
    unprocessed_budget: AtomicUsize,
    batch_calls: AtomicUsize,
}

impl<T: Item> MemoryTable<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_page_size(name, 100)
    }

    /// Queries never return more than `page_size` rows per page
    pub fn with_page_size(name: impl Into<String>, page_size: usize) -> Self {
        Self {
            name: name.into(),
            rows: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
            unprocessed_budget: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
        }
    }

    /// The next `count` batch items are reported unprocessed instead of applied
    pub fn fail_next_batch_items(&self, count: usize) {
        self.unprocessed_budget.store(count, Ordering::SeqCst);
    }

    /// Number of `batch_write` calls served so far
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    fn take_failure(&self) -> bool {
        self.unprocessed_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl<T: Item> Table<T> for MemoryTable<T> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, pk: &str) -> ProjectionResult<Option<T>> {
        Ok(self.rows.read().await.get(pk).cloned())
    }

    async fn put(&self, item: T, condition: WriteCondition) -> ProjectionResult<()> {
        let mut rows = self.rows.write().await;
        let pk = item.pk().to_string();

        if !condition.holds(rows.get(&pk)) {
            return Err(ProjectionError::ConditionalCheckFailed { pk });
        }

        rows.insert(pk, item);
        Ok(())
    }

    async fn delete(&self, pk: &str, condition: WriteCondition) -> ProjectionResult<()> {
        let mut rows = self.rows.write().await;

        if !condition.holds(rows.get(pk)) {
            return Err(ProjectionError::ConditionalCheckFailed { pk: pk.to_string() });
        }

        rows.remove(pk);
        Ok(())
    }

    async fn query(
        &self,
        index: T::Index,
        key: &str,
        start_after: Option<&PageToken>,
        limit: usize,
    ) -> ProjectionResult<Page<T>> {
        let limit = limit.clamp(1, self.page_size);
        let rows = self.rows.read().await;

        let lower = match start_after {
            Some(token) => Bound::Excluded(token.0.clone()),
            None => Bound::Unbounded,
        };

        let mut matching = rows
            .range((lower, Bound::Unbounded))
            .map(|(_, row)| row)
            .filter(|row| row.index_key(index).as_deref() == Some(key));

        let items: Vec<T> = matching.by_ref().take(limit).cloned().collect();
        let next = match (items.last(), matching.next()) {
            (Some(last), Some(_)) => Some(PageToken(last.pk().to_string())),
            _ => None,
        };

        debug!(table = %self.name, ?index, key, rows = items.len(), more = next.is_some(), "Query page served");
        Ok(Page { items, next })
    }

    async fn batch_write(
        &self,
        requests: Vec<WriteRequest<T>>,
    ) -> ProjectionResult<BatchWriteOutcome<T>> {
        if requests.len() > MAX_BATCH_SIZE {
            return Err(ProjectionError::Store(format!(
                "batch of {} items exceeds the limit of {}",
                requests.len(),
                MAX_BATCH_SIZE
            )));
        }

        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.write().await;
        let mut outcome = BatchWriteOutcome::complete();

        for request in requests {
            if self.take_failure() {
                outcome.unprocessed.push(request);
                continue;
            }
            match request {
                WriteRequest::Put(item) => {
                    rows.insert(item.pk().to_string(), item);
                }
                WriteRequest::Delete(pk) => {
                    rows.remove(&pk);
                }
            }
        }

        Ok(outcome)
    }
}
