//! Request authentication plugins.
//!
//! # Data Flow
//! ```text
//! HttpConfig.auth (type + scoped plugin settings)
//!     → registry.rs (name → constructor, resolved once at construction)
//!     → Arc<dyn Authenticator> held by the server handle
//!     → http::middleware consults it per request, before the router
//! ```
//!
//! # Design Decisions
//! - The registry is an explicitly constructed value passed into server
//!   construction — no process-wide mutable plugin table.
//! - Resolution happens exactly once; there is no hot-reloading of the
//!   resolved authenticator.
//! - An empty plugin name resolves to an allow-all authenticator.

pub mod basic;
mod registry;

pub use registry::{AuthRegistry, AuthenticatorFactory};

use axum::http::HeaderMap;

use crate::error::ServerError;

/// Capability deciding whether a request is authorized.
///
/// Implementations see only request metadata (headers); they never touch the
/// body. Returning any error rejects the request with HTTP 403 — the error
/// detail is logged server-side, not sent to the client.
pub trait Authenticator: Send + Sync + std::fmt::Debug {
    fn authorize(&self, headers: &HeaderMap) -> Result<(), ServerError>;
}

/// Authenticator used when no auth type is configured: authorizes everything.
#[derive(Debug)]
pub(crate) struct AllowAll;

impl Authenticator for AllowAll {
    fn authorize(&self, _headers: &HeaderMap) -> Result<(), ServerError> {
        Ok(())
    }
}
