// Copyright (c) 2025 - Cowboy AI, Inc.
//! Read-side pagination over a secondary index

use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tracing::trace;

use super::{Item, PageToken, Table};
use crate::errors::ProjectionResult;

/// Walks every page of one index key, following continuation tokens
pub struct Paginator<T: Item> {
    table: Arc<dyn Table<T>>,
    index: T::Index,
    key: String,
    page_size: usize,
    next: Option<PageToken>,
    done: bool,
}

impl<T: Item> Paginator<T> {
    pub fn new(
        table: Arc<dyn Table<T>>,
        index: T::Index,
        key: impl Into<String>,
        page_size: usize,
    ) -> Self {
        Self {
            table,
            index,
            key: key.into(),
            page_size: page_size.max(1),
            next: None,
            done: false,
        }
    }

    /// Next non-empty page, `None` once the index key is exhausted
    pub async fn next_page(&mut self) -> ProjectionResult<Option<Vec<T>>> {
        if self.done {
            return Ok(None);
        }

        let page = self
            .table
            .query(self.index, &self.key, self.next.as_ref(), self.page_size)
            .await?;

        self.done = page.next.is_none();
        self.next = page.next;

        trace!(
            table = %self.table.name(),
            key = %self.key,
            rows = page.items.len(),
            last = self.done,
            "Fetched page"
        );

        if page.items.is_empty() && self.done {
            return Ok(None);
        }
        Ok(Some(page.items))
    }

    /// Drain every page into one vector
    pub async fn collect_all(mut self) -> ProjectionResult<Vec<T>> {
        let mut rows = Vec::new();
        while let Some(page) = self.next_page().await? {
            rows.extend(page);
        }
        Ok(rows)
    }

    /// Pages as a stream; the stream ends after the first error
    pub fn into_stream(self) -> BoxStream<'static, ProjectionResult<Vec<T>>> {
        stream::unfold(self, |mut paginator| async move {
            match paginator.next_page().await {
                Ok(Some(page)) => Some((Ok(page), paginator)),
                Ok(None) => None,
                Err(e) => {
                    paginator.done = true;
                    Some((Err(e), paginator))
                }
            }
        })
        .boxed()
    }
}
