//! Managed HTTP(S) server plumbing for long-running services.
//!
//! Each logical service constructs an [`HttpServer`] around its own router:
//! construction binds the listener (optionally wrapped in mutually
//! authenticated TLS), resolves the configured authentication plugin, and
//! composes CORS + auth enforcement around the router. The handle then serves
//! until the owner's [`Shutdown`] signal fires, drains within a bounded
//! grace period, and reports its terminal outcome exactly once on a
//! caller-owned oneshot channel.

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
mod net;
pub mod observability;

pub use auth::{AuthRegistry, Authenticator};
pub use cache::{Cache, CacheManager};
pub use config::{CorsConfig, HttpConfig, ServiceConfig};
pub use error::ServerError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
