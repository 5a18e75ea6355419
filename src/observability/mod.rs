//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via `tracing`; every server logs under its own
//!   `server = <name>` field so co-hosted servers stay distinguishable.
//! - Level configurable through `RUST_LOG`, with a caller default.

pub mod logging;
