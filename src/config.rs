// Copyright (c) 2025 - Cowboy AI, Inc.
//! Projector configuration
//!
//! Table names, batch sizing, the batch retry budget and the query page size.
//! Values come from [`ProjectorConfig::default`] and may be overridden through
//! environment variables with [`ProjectorConfig::from_env`].

use std::time::Duration;

use crate::errors::{ProjectionError, ProjectionResult};

/// Upper bound the store enforces on a single batch write call
pub const MAX_BATCH_SIZE: usize = 25;

/// Configuration shared by the store adapters and the consumers
#[derive(Debug, Clone)]
pub struct ProjectorConfig {
    /// Per-entity table (agreements, purposes, descriptors, clients)
    pub platform_states_table: String,
    /// Fan-out table keyed by client, key and purpose
    pub token_generation_states_table: String,
    /// Items per batch write call (1..=25)
    pub batch_size: usize,
    /// Attempts before unprocessed batch items are reported
    pub batch_retry_attempts: usize,
    /// First backoff delay between batch retries
    pub batch_retry_min_delay: Duration,
    /// Backoff ceiling between batch retries
    pub batch_retry_max_delay: Duration,
    /// Rows per query page
    pub page_size: usize,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            platform_states_table: "platform-states".to_string(),
            token_generation_states_table: "token-generation-states".to_string(),
            batch_size: MAX_BATCH_SIZE,
            batch_retry_attempts: 5,
            batch_retry_min_delay: Duration::from_millis(50),
            batch_retry_max_delay: Duration::from_secs(2),
            page_size: 100,
        }
    }
}

impl ProjectorConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> ProjectionResult<Self> {
        let defaults = Self::default();

        let config = Self {
            platform_states_table: std::env::var("PLATFORM_STATES_TABLE")
                .unwrap_or(defaults.platform_states_table),
            token_generation_states_table: std::env::var("TOKEN_GENERATION_STATES_TABLE")
                .unwrap_or(defaults.token_generation_states_table),
            batch_size: env_usize("BATCH_SIZE")?.unwrap_or(defaults.batch_size),
            batch_retry_attempts: env_usize("BATCH_RETRY_ATTEMPTS")?
                .unwrap_or(defaults.batch_retry_attempts),
            batch_retry_min_delay: defaults.batch_retry_min_delay,
            batch_retry_max_delay: defaults.batch_retry_max_delay,
            page_size: env_usize("PAGE_SIZE")?.unwrap_or(defaults.page_size),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> ProjectionResult<()> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(ProjectionError::Configuration(format!(
                "batch_size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.batch_size
            )));
        }
        if self.batch_retry_attempts == 0 {
            return Err(ProjectionError::Configuration(
                "batch_retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(ProjectionError::Configuration(
                "page_size must be at least 1".to_string(),
            ));
        }
        if self.platform_states_table == self.token_generation_states_table {
            return Err(ProjectionError::Configuration(
                "platform-states and token-generation-states must be distinct tables".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_usize(name: &str) -> ProjectionResult<Option<usize>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<usize>()
            .map(Some)
            .map_err(|e| ProjectionError::Configuration(format!("{}: {}", name, e))),
        Err(_) => Ok(None),
    }
}
