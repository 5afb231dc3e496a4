// Copyright (c) 2025 - Cowboy AI, Inc.
//! Authorization State Projector
//!
//! Maintains two materialized views of an event-sourced authorization
//! platform:
//!
//! - **platform-states**: one row per purpose, agreement, descriptor and client
//!   with a two-valued state and the stream version it was derived from
//! - **token-generation-states**: one row per client key (and bound purpose)
//!   joining the current state of every entity token issuance depends on
//!
//! Events are delivered at least once; every platform-states write is gated on
//! the stream version, so replays and stale deliveries are no-ops.
//!
//! ```text
//! EventEnvelope ──> Projector::dispatch ──> consumers::{agreement, purpose, catalog, authorization}
//!                                                   │
//!                                     derivation (pure) + keys (pure)
//!                                                   │
//!                          PlatformStatesStore ─────┴───── TokenGenerationStatesStore
//!                                     └──────── Table<T> ────────┘
//! ```

pub mod config;
pub mod consumers;
pub mod derivation;
pub mod domain;
pub mod errors;
pub mod events;
pub mod jetstream;
pub mod keys;
pub mod model;
pub mod store;

// Re-export commonly used types
pub use config::ProjectorConfig;
pub use consumers::{AggregateKind, Outcome, Projector};
pub use errors::{ProjectionError, ProjectionResult};
pub use events::{EventEnvelope, SchemaVersion};
pub use model::{ItemState, PlatformStatesEntry, TokenGenerationStatesEntry};
pub use store::{PlatformStatesStore, Table, TokenGenerationStatesStore, TokenQuery, WriteOutcome};
