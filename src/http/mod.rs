//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (accept loop, per-connection tasks, drain on shutdown)
//!     → middleware.rs (CORS, authentication gate, per-request timeout)
//!     → caller-supplied Router
//! ```

pub mod middleware;
pub mod server;

pub use server::HttpServer;
