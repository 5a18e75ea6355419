//! Crate-wide error type with stable error codes.
//!
//! # Design Decisions
//! - Every failure mode carries a unique `PTC01xx` code so callers and
//!   operators can distinguish them programmatically.
//! - `Display` renders as `"<code>: <message>"`; the 403 response body and
//!   log lines reuse that rendering verbatim.
//! - Configuration errors are only ever returned from construction;
//!   lifecycle errors are only ever delivered on the outcome channel.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Error type for server construction, per-request authorization, and the
/// serve lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured listen address could not be parsed or bound.
    #[error("PTC0101: invalid listener address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The TLS certificate/key pair could not be read or parsed.
    #[error("PTC0102: unable to load TLS key pair (cert '{cert_file}', key '{key_file}'): {reason}")]
    TlsKeyPair {
        cert_file: String,
        key_file: String,
        reason: String,
    },

    /// The configured CA file does not exist or could not be opened.
    #[error("PTC0103: CA certificate file '{path}' not found: {reason}")]
    CaFileNotFound { path: String, reason: String },

    /// The configured CA file exists but holds no usable certificate data.
    #[error("PTC0104: CA certificate file '{path}' contains no valid certificates")]
    CaFileInvalid { path: String },

    /// The configured authentication plugin name is not registered.
    #[error("PTC0105: unknown authentication plugin '{name}'")]
    UnknownAuthPlugin { name: String },

    /// A registered authentication plugin failed to construct itself.
    #[error("PTC0106: authentication plugin '{name}' failed to initialize: {reason}")]
    AuthPluginInit { name: String, reason: String },

    /// The request did not carry acceptable credentials.
    #[error("PTC0107: Unauthorized")]
    Unauthorized,

    /// Graceful shutdown did not drain all connections within the bound.
    #[error("PTC0108: shutdown did not complete within {timeout:?}; outstanding connections were closed")]
    ShutdownTimeout { timeout: Duration },

    /// The listener failed while serving; fatal to this server instance.
    #[error("PTC0109: listener failure: {0}")]
    Listener(#[from] io::Error),

    /// The configuration combines options that cannot work together.
    #[error("PTC0110: invalid server configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl ServerError {
    /// The stable code identifying this failure mode.
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::InvalidAddress { .. } => "PTC0101",
            ServerError::TlsKeyPair { .. } => "PTC0102",
            ServerError::CaFileNotFound { .. } => "PTC0103",
            ServerError::CaFileInvalid { .. } => "PTC0104",
            ServerError::UnknownAuthPlugin { .. } => "PTC0105",
            ServerError::AuthPluginInit { .. } => "PTC0106",
            ServerError::Unauthorized => "PTC0107",
            ServerError::ShutdownTimeout { .. } => "PTC0108",
            ServerError::Listener(_) => "PTC0109",
            ServerError::InvalidConfig { .. } => "PTC0110",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_starts_with_code() {
        let cases: Vec<ServerError> = vec![
            ServerError::InvalidAddress {
                address: "...:0".into(),
                reason: "invalid IP address syntax".into(),
            },
            ServerError::CaFileNotFound {
                path: "/nope".into(),
                reason: "No such file".into(),
            },
            ServerError::CaFileInvalid { path: "/bad".into() },
            ServerError::UnknownAuthPlugin {
                name: "banana".into(),
            },
            ServerError::Unauthorized,
            ServerError::ShutdownTimeout {
                timeout: Duration::from_millis(1),
            },
        ];
        for err in cases {
            assert!(err.to_string().starts_with(err.code()));
        }
    }

    #[test]
    fn codes_are_distinct() {
        let codes = [
            ServerError::InvalidAddress {
                address: String::new(),
                reason: String::new(),
            }
            .code(),
            ServerError::TlsKeyPair {
                cert_file: String::new(),
                key_file: String::new(),
                reason: String::new(),
            }
            .code(),
            ServerError::CaFileNotFound {
                path: String::new(),
                reason: String::new(),
            }
            .code(),
            ServerError::CaFileInvalid { path: String::new() }.code(),
            ServerError::UnknownAuthPlugin { name: String::new() }.code(),
            ServerError::Unauthorized.code(),
            ServerError::ShutdownTimeout {
                timeout: Duration::ZERO,
            }
            .code(),
            ServerError::Listener(io::Error::other("x")).code(),
        ];
        let mut unique = codes.to_vec();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn unauthorized_body_rendering() {
        assert_eq!(ServerError::Unauthorized.to_string(), "PTC0107: Unauthorized");
    }

    #[test]
    fn unknown_plugin_names_the_offender() {
        let err = ServerError::UnknownAuthPlugin {
            name: "banana".into(),
        };
        assert!(err.to_string().contains("banana"));
    }
}
