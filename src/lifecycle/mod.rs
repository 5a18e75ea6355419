//! Lifecycle coordination.
//!
//! # Data Flow
//! ```text
//! owner creates Shutdown
//!     → each server gets a subscription (its cancellable context)
//!     → trigger() fans out to every serving task
//!     → servers drain (bounded) and report on their outcome channels
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
