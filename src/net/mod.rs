//! Network layer: listener binding and TLS policy construction.
//!
//! # Data Flow
//! ```text
//! HttpConfig
//!     → listener.rs (address resolution, bind, bound-address capture)
//!     → tls.rs (optional rustls ServerConfig: key pair, client-CA pool)
//!     → handed to http::server, immutable from then on
//! ```

pub(crate) mod listener;
pub(crate) mod tls;
