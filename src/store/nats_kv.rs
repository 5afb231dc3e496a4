// Copyright (c) 2025 - Cowboy AI, Inc.
//! JetStream key-value table
//!
//! Backs a [`Table`] with a NATS JetStream key-value bucket.
//!
//! # Mapping
//!
//! - Rows are stored as JSON under their primary key, with `#` mapped to `.`
//!   so keys are valid subject tokens.
//! - Conditional writes evaluate the `version` condition on the current
//!   entry, then write with the entry's bucket revision (`create` for absent
//!   rows, `update` otherwise). A concurrent writer changes the revision and
//!   the write is rejected as `ConditionalCheckFailed`.
//! - Index queries scan the sorted key list and filter rows, so a query costs
//!   a full key listing.
//! - Batch writes apply items one at a time; failed items are reported as
//!   unprocessed.

use async_nats::jetstream::{self, kv};
use async_trait::async_trait;
use futures::TryStreamExt;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

use super::{BatchWriteOutcome, Item, Page, PageToken, Table, WriteCondition, WriteRequest};
use crate::config::MAX_BATCH_SIZE;
use crate::errors::{ProjectionError, ProjectionResult};

pub struct NatsKvTable<T: Item> {
    name: String,
    kv: kv::Store,
    _rows: PhantomData<fn() -> T>,
}

impl<T: Item> NatsKvTable<T> {
    /// Open the bucket, creating it when missing
    pub async fn open(jetstream: &jetstream::Context, bucket: &str) -> ProjectionResult<Self> {
        let kv = match jetstream.get_key_value(bucket).await {
            Ok(kv) => kv,
            Err(_) => {
                info!("Key-value bucket '{}' not found, creating", bucket);
                jetstream
                    .create_key_value(kv::Config {
                        bucket: bucket.to_string(),
                        history: 1,
                        ..Default::default()
                    })
                    .await
                    .map_err(|e| ProjectionError::Store(e.to_string()))?
            }
        };

        Ok(Self {
            name: bucket.to_string(),
            kv,
            _rows: PhantomData,
        })
    }

    fn encode_key(pk: &str) -> String {
        pk.replace('#', ".")
    }

    fn decode_key(key: &str) -> String {
        key.replace('.', "#")
    }

    /// Current row and its bucket revision
    async fn entry(&self, pk: &str) -> ProjectionResult<Option<(u64, T)>> {
        let entry = self
            .kv
            .entry(Self::encode_key(pk))
            .await
            .map_err(|e| ProjectionError::Store(e.to_string()))?;

        match entry {
            Some(entry) if matches!(entry.operation, kv::Operation::Put) => {
                let row: T = serde_json::from_slice(&entry.value)?;
                Ok(Some((entry.revision, row)))
            }
            _ => Ok(None),
        }
    }

    /// Map a failed revision-checked write to a conditional failure when the
    /// entry moved underneath us
    async fn write_failed(
        &self,
        pk: &str,
        seen_revision: Option<u64>,
        err: impl std::fmt::Display,
    ) -> ProjectionError {
        match self.entry(pk).await {
            Ok(current) if current.as_ref().map(|(revision, _)| *revision) != seen_revision => {
                ProjectionError::ConditionalCheckFailed { pk: pk.to_string() }
            }
            _ => ProjectionError::Store(err.to_string()),
        }
    }

    async fn sorted_keys(&self) -> ProjectionResult<Vec<String>> {
        let keys = self
            .kv
            .keys()
            .await
            .map_err(|e| ProjectionError::Store(e.to_string()))?;

        let mut keys: Vec<String> = keys
            .map_ok(|key| Self::decode_key(&key))
            .try_collect()
            .await
            .map_err(|e| ProjectionError::Store(e.to_string()))?;
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl<T: Item> Table<T> for NatsKvTable<T> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, pk: &str) -> ProjectionResult<Option<T>> {
        Ok(self.entry(pk).await?.map(|(_, row)| row))
    }

    async fn put(&self, item: T, condition: WriteCondition) -> ProjectionResult<()> {
        let pk = item.pk().to_string();
        let payload = serde_json::to_vec(&item)?;
        let key = Self::encode_key(&pk);

        if condition == WriteCondition::Unconditional {
            self.kv
                .put(key, payload.into())
                .await
                .map_err(|e| ProjectionError::Store(e.to_string()))?;
            return Ok(());
        }

        let current = self.entry(&pk).await?;
        if !condition.holds(current.as_ref().map(|(_, row)| row)) {
            return Err(ProjectionError::ConditionalCheckFailed { pk });
        }

        let seen_revision = current.as_ref().map(|(revision, _)| *revision);
        let written = match seen_revision {
            Some(revision) => self
                .kv
                .update(key, payload.into(), revision)
                .await
                .map_err(|e| e.to_string()),
            None => self
                .kv
                .create(key, payload.into())
                .await
                .map_err(|e| e.to_string()),
        };

        match written {
            Ok(revision) => {
                debug!(table = %self.name, pk = %pk, revision, "Row written");
                Ok(())
            }
            Err(e) => Err(self.write_failed(&pk, seen_revision, e).await),
        }
    }

    async fn delete(&self, pk: &str, condition: WriteCondition) -> ProjectionResult<()> {
        let current = self.entry(pk).await?;
        if !condition.holds(current.as_ref().map(|(_, row)| row)) {
            return Err(ProjectionError::ConditionalCheckFailed { pk: pk.to_string() });
        }
        if current.is_none() {
            return Ok(());
        }

        self.kv
            .delete(Self::encode_key(pk))
            .await
            .map_err(|e| ProjectionError::Store(e.to_string()))
    }

    async fn query(
        &self,
        index: T::Index,
        key: &str,
        start_after: Option<&PageToken>,
        limit: usize,
    ) -> ProjectionResult<Page<T>> {
        let limit = limit.max(1);
        let mut items = Vec::new();
        let mut next = None;

        let candidates = self
            .sorted_keys()
            .await?
            .into_iter()
            .filter(|pk| start_after.map_or(true, |token| pk.as_str() > token.0.as_str()));

        for pk in candidates {
            let Some(row) = self.get(&pk).await? else {
                continue;
            };
            if row.index_key(index).as_deref() != Some(key) {
                continue;
            }
            if items.len() == limit {
                next = items
                    .last()
                    .map(|last: &T| PageToken(last.pk().to_string()));
                break;
            }
            items.push(row);
        }

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

        let mut outcome = BatchWriteOutcome::complete();
        for request in requests {
            let applied = match &request {
                WriteRequest::Put(item) => self.put(item.clone(), WriteCondition::Unconditional).await,
                WriteRequest::Delete(pk) => self.delete(pk, WriteCondition::Unconditional).await,
            };
            if let Err(e) = applied {
                warn!(table = %self.name, pk = %request.pk(), error = %e, "Batch item not applied");
                outcome.unprocessed.push(request);
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlatformStatesEntry;

    #[test]
    fn test_key_encoding_is_reversible() {
        let pk = "ESERVICEDESCRIPTOR#018f0000-0000-7000-8000-000000000001#018f0000-0000-7000-8000-000000000002";
        let key = NatsKvTable::<PlatformStatesEntry>::encode_key(pk);
        assert!(!key.contains('#'));
        assert_eq!(NatsKvTable::<PlatformStatesEntry>::decode_key(&key), pk);
    }
}
