// Copyright (c) 2025 - Cowboy AI, Inc.
//! Write-side batching
//!
//! Splits writes into store-sized chunks. For each chunk only the requests the
//! store reports as unprocessed are sent again, with exponential backoff, until
//! the chunk is fully applied or the attempt budget runs out. Every chunk is
//! tried even when an earlier one exhausted its budget; leftovers are reported
//! together at the end.

use backon::{ExponentialBuilder, Retryable};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use super::{Item, Table, WriteRequest};
use crate::config::{ProjectorConfig, MAX_BATCH_SIZE};
use crate::errors::{ProjectionError, ProjectionResult};

pub struct BatchWriter<T: Item> {
    table: Arc<dyn Table<T>>,
    batch_size: usize,
    attempts: usize,
    min_delay: Duration,
    max_delay: Duration,
}

impl<T: Item> BatchWriter<T> {
    pub fn new(table: Arc<dyn Table<T>>, config: &ProjectorConfig) -> Self {
        Self {
            table,
            batch_size: config.batch_size.clamp(1, MAX_BATCH_SIZE),
            attempts: config.batch_retry_attempts.max(1),
            min_delay: config.batch_retry_min_delay,
            max_delay: config.batch_retry_max_delay,
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.attempts - 1)
    }

    /// Apply every request; returns how many were written
    pub async fn write_all(&self, mut requests: Vec<WriteRequest<T>>) -> ProjectionResult<usize> {
        let total = requests.len();
        let mut left_over = 0;

        while !requests.is_empty() {
            let rest = requests.split_off(self.batch_size.min(requests.len()));
            let chunk = std::mem::replace(&mut requests, rest);
            left_over += self.write_chunk(chunk).await?;
        }

        if left_over > 0 {
            error!(
                table = %self.table.name(),
                unprocessed = left_over,
                attempts = self.attempts,
                "Batch write budget exhausted, fan-out rows left stale"
            );
            return Err(ProjectionError::BatchWriteExhausted {
                unprocessed: left_over,
                attempts: self.attempts,
            });
        }

        debug!(table = %self.table.name(), rows = total, "Batch write complete");
        Ok(total)
    }

    /// Returns the number of requests still unprocessed after the last attempt
    async fn write_chunk(&self, chunk: Vec<WriteRequest<T>>) -> ProjectionResult<usize> {
        let pending = Mutex::new(chunk);
        let attempt = AtomicUsize::new(0);

        let written = (|| async {
            let attempt = attempt.fetch_add(1, Ordering::SeqCst) + 1;
            let requests = pending.lock().await.clone();
            let outcome = self.table.batch_write(requests).await?;

            let unprocessed = outcome.unprocessed.len();
            *pending.lock().await = outcome.unprocessed;

            if unprocessed == 0 {
                Ok(())
            } else {
                Err(ProjectionError::BatchWriteExhausted {
                    unprocessed,
                    attempts: attempt,
                })
            }
        })
        .retry(self.backoff())
        .sleep(tokio::time::sleep)
        .when(|e| e.is_retryable() || matches!(e, ProjectionError::BatchWriteExhausted { .. }))
        .notify(|err, dur| {
            warn!(
                table = %self.table.name(),
                error = %err,
                delay = ?dur,
                "Retrying unprocessed batch items"
            );
        })
        .await;

        match written {
            Ok(()) => Ok(0),
            Err(ProjectionError::BatchWriteExhausted { unprocessed, .. }) => Ok(unprocessed),
            Err(e) => Err(e),
        }
    }
}
