//! tally server library entry.
//!
//! Wires a `tally_core::Registry` into an axum router: request counting, the
//! scrape endpoint, and the admin gauge route. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod instruments;
pub mod ops;
pub mod router;
