// Copyright (c) 2025 - Cowboy AI, Inc.
//! Aggregate Snapshots
//!
//! Upstream aggregates attach a full snapshot of themselves to every event.
//! The projector never mutates these; it only derives platform-states rows
//! from them. Types here are the current (second generation) wire shape;
//! first generation payloads are converted into them by the `events` module.
//!
//! - [`Agreement`] - consumer/e-service agreement with its activation stamp
//! - [`Purpose`] - purpose with its versions
//! - [`EService`] - e-service with its descriptors
//! - [`Client`] - authorization client with its keys and bound purposes

pub mod agreement;
pub mod catalog;
pub mod client;
pub mod purpose;

pub use agreement::{Agreement, AgreementStamp, AgreementStamps, AgreementState};
pub use catalog::{Descriptor, DescriptorState, EService};
pub use client::{Client, ClientKind, ClientKey};
pub use purpose::{Purpose, PurposeVersion, PurposeVersionState};
