// Copyright (c) 2025 - Cowboy AI, Inc.
//! Token-generation-states adapter
//!
//! Fan-out rows are looked up by one of the secondary indexes, merged in memory
//! and written back through the [`BatchWriter`]. Reads come in two flavours:
//! the first page only, or every page until the continuation token runs out.

use chrono::Utc;
use futures::stream::BoxStream;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{BatchWriter, Paginator, Table, WriteRequest};
use crate::config::ProjectorConfig;
use crate::errors::ProjectionResult;
use crate::keys;
use crate::model::{TokenGenerationStatesEntry, TokenIndex};

/// Lookup of fan-out rows by secondary index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenQuery {
    Purpose(Uuid),
    ConsumerEService { consumer_id: Uuid, eservice_id: Uuid },
    EServiceDescriptor { eservice_id: Uuid, descriptor_id: Uuid },
    Client(Uuid),
    ClientPurpose { client_id: Uuid, purpose_id: Uuid },
}

impl TokenQuery {
    pub fn index(&self) -> TokenIndex {
        match self {
            TokenQuery::Purpose(_) => TokenIndex::Purpose,
            TokenQuery::ConsumerEService { .. } => TokenIndex::ConsumerEService,
            TokenQuery::EServiceDescriptor { .. } => TokenIndex::EServiceDescriptor,
            TokenQuery::Client(_) => TokenIndex::Client,
            TokenQuery::ClientPurpose { .. } => TokenIndex::ClientPurpose,
        }
    }

    pub fn key(&self) -> String {
        match *self {
            TokenQuery::Purpose(purpose_id) => purpose_id.to_string(),
            TokenQuery::ConsumerEService {
                consumer_id,
                eservice_id,
            } => keys::consumer_eservice_key(consumer_id, eservice_id),
            TokenQuery::EServiceDescriptor {
                eservice_id,
                descriptor_id,
            } => keys::eservice_descriptor_key(eservice_id, descriptor_id),
            TokenQuery::Client(client_id) => client_id.to_string(),
            TokenQuery::ClientPurpose {
                client_id,
                purpose_id,
            } => keys::client_purpose_key(client_id, purpose_id),
        }
    }
}

pub struct TokenGenerationStatesStore {
    table: Arc<dyn Table<TokenGenerationStatesEntry>>,
    writer: BatchWriter<TokenGenerationStatesEntry>,
    page_size: usize,
}

impl TokenGenerationStatesStore {
    pub fn new(table: Arc<dyn Table<TokenGenerationStatesEntry>>, config: &ProjectorConfig) -> Self {
        Self {
            writer: BatchWriter::new(table.clone(), config),
            table,
            page_size: config.page_size,
        }
    }

    pub fn table(&self) -> &Arc<dyn Table<TokenGenerationStatesEntry>> {
        &self.table
    }

    pub async fn get(&self, pk: &str) -> ProjectionResult<Option<TokenGenerationStatesEntry>> {
        self.table.get(pk).await
    }

    fn paginator(&self, query: &TokenQuery) -> Paginator<TokenGenerationStatesEntry> {
        Paginator::new(self.table.clone(), query.index(), query.key(), self.page_size)
    }

    /// First page of matching rows only
    pub async fn first_page(&self, query: &TokenQuery) -> ProjectionResult<Vec<TokenGenerationStatesEntry>> {
        let page = self
            .table
            .query(query.index(), &query.key(), None, self.page_size)
            .await?;
        Ok(page.items)
    }

    /// Every matching row, following continuation tokens to the end
    pub async fn query_all(&self, query: &TokenQuery) -> ProjectionResult<Vec<TokenGenerationStatesEntry>> {
        self.paginator(query).collect_all().await
    }

    /// Matching rows page by page
    pub fn pages(
        &self,
        query: &TokenQuery,
    ) -> BoxStream<'static, ProjectionResult<Vec<TokenGenerationStatesEntry>>> {
        self.paginator(query).into_stream()
    }

    /// Merge owned fields into every matching row and write back the rows
    /// the merge changed.
    ///
    /// Returns the number of rows written. Rows already holding the merged
    /// fields keep their `updatedAt`. No matching rows is not an error.
    pub async fn update_all<F>(&self, query: &TokenQuery, mut merge: F) -> ProjectionResult<usize>
    where
        F: FnMut(&mut TokenGenerationStatesEntry),
    {
        let rows = self.query_all(query).await?;
        let matched = rows.len();

        let now = Utc::now();
        let requests: Vec<_> = rows
            .into_iter()
            .filter_map(|row| {
                let mut merged = row.clone();
                merge(&mut merged);
                if merged == row {
                    return None;
                }
                merged.touch(now);
                Some(WriteRequest::Put(merged))
            })
            .collect();

        if requests.is_empty() {
            debug!(index = ?query.index(), key = %query.key(), matched, "No fan-out rows to update");
            return Ok(0);
        }

        let written = self.writer.write_all(requests).await?;
        debug!(index = ?query.index(), key = %query.key(), rows = written, "Fan-out rows updated");
        Ok(written)
    }

    pub async fn put_rows(&self, rows: Vec<TokenGenerationStatesEntry>) -> ProjectionResult<usize> {
        self.writer
            .write_all(rows.into_iter().map(WriteRequest::Put).collect())
            .await
    }

    pub async fn delete_rows(&self, pks: Vec<String>) -> ProjectionResult<usize> {
        self.writer
            .write_all(pks.into_iter().map(WriteRequest::Delete).collect())
            .await
    }
}
