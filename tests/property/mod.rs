// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! - [`purpose_versions`] - winning version selection is a pure max
//! - [`version_gating`] - stored versions only move forward
//! - [`latest_agreement`] - fan-out converges on the latest agreement

mod latest_agreement;
mod purpose_versions;
mod version_gating;

use std::future::Future;

/// Run an async projection inside a proptest body
pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime")
        .block_on(future)
}
