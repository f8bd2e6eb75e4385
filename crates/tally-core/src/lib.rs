//! tally core: the instrument registry, the text exposition formatter, and the
//! shared error type.
//!
//! This crate carries no HTTP or runtime dependencies. The server crate owns a
//! `Registry`, mutates it per request, and serves `render(snapshot())` on scrape.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Every fallible path surfaces as `TallyError`/`Result`, so a bad label value
//! from a request handler never takes the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod exposition;
pub mod registry;

/// Shared result type.
pub use error::{Result, TallyError};
pub use exposition::{render, CONTENT_TYPE};
pub use registry::{
    FamilySnapshot, LabelSet, MetricDescriptor, MetricHandle, MetricKind, Registry, Sample,
    Snapshot,
};
