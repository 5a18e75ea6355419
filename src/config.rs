//! Server configuration schema and loading.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → load_config (parse & deserialize)
//!     → HttpConfig::validate (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → consumed by HttpServer::new
//! ```
//!
//! # Design Decisions
//! - Config is immutable once handed to construction; invalid combinations
//!   are rejected there, never at serve time.
//! - All fields have defaults so minimal configs work.
//! - Validation separates syntactic (serde) from semantic checks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ServerError;

/// Listener, TLS, timeout, and authentication settings for one server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Listen address. An empty string means all interfaces.
    pub address: String,

    /// Listen port. 0 requests an OS-assigned ephemeral port.
    pub port: u16,

    /// TLS settings.
    pub tls: TlsSettings,

    /// Bound on draining in-flight requests during shutdown.
    pub shutdown_timeout_ms: u64,

    /// Optional bound on a single request handler. None = unbounded.
    pub request_timeout_ms: Option<u64>,

    /// Authentication plugin selection and its scoped settings.
    pub auth: AuthSettings,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 0,
            tls: TlsSettings::default(),
            shutdown_timeout_ms: 10_000,
            request_timeout_ms: None,
            auth: AuthSettings::default(),
        }
    }
}

impl HttpConfig {
    /// Shutdown drain bound as a [`Duration`].
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Per-request handler bound as a [`Duration`], if configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Reject option combinations that cannot work together.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.tls.enabled {
            if self.tls.cert_file.trim().is_empty() || self.tls.key_file.trim().is_empty() {
                return Err(ServerError::InvalidConfig {
                    reason: "TLS is enabled but cert_file or key_file is not set".into(),
                });
            }
            if self.tls.client_auth && self.tls.ca_file.is_none() {
                return Err(ServerError::InvalidConfig {
                    reason: "TLS client auth requires a ca_file to verify against".into(),
                });
            }
        } else if self.tls.client_auth {
            return Err(ServerError::InvalidConfig {
                reason: "TLS client auth requires TLS to be enabled".into(),
            });
        }
        if self.shutdown_timeout_ms == 0 {
            return Err(ServerError::InvalidConfig {
                reason: "shutdown_timeout_ms must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

/// TLS settings for the listener.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsSettings {
    /// Wrap the listener in TLS.
    pub enabled: bool,

    /// Require and verify a client certificate chain during the handshake.
    pub client_auth: bool,

    /// Path to the PEM certificate chain.
    pub cert_file: String,

    /// Path to the PEM private key.
    pub key_file: String,

    /// Path to a PEM CA bundle used to verify client certificates.
    pub ca_file: Option<String>,
}

/// Authentication plugin selection.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Registered plugin name, case-insensitive. Empty = allow every request.
    #[serde(rename = "type")]
    pub auth_type: String,

    /// Settings scoped to the selected plugin (resolved scalar values).
    pub plugin: HashMap<String, String>,
}

/// CORS policy applied to every response, including preflight.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Apply the CORS layer at all.
    pub enabled: bool,

    /// Allowed origins; `"*"` allows any.
    pub allowed_origins: Vec<String>,

    /// Allowed methods.
    pub allowed_methods: Vec<String>,

    /// Allowed request headers; `"*"` allows any.
    pub allowed_headers: Vec<String>,

    /// Allow credentialed requests.
    pub allow_credentials: bool,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec![
                "GET".to_string(),
                "POST".to_string(),
                "PUT".to_string(),
                "PATCH".to_string(),
                "DELETE".to_string(),
            ],
            allowed_headers: vec!["*".to_string()],
            allow_credentials: true,
            max_age_secs: 600,
        }
    }
}

/// Top-level config file shape: one HTTP section, one CORS section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub http: HttpConfig,
    pub cors: CorsConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] ServerError),
}

/// Load and validate a [`ServiceConfig`] from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ServiceConfig = toml::from_str(&content)?;
    config.http.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_permissive() {
        let cfg = HttpConfig::default();
        assert_eq!(cfg.address, "127.0.0.1");
        assert_eq!(cfg.port, 0);
        assert!(!cfg.tls.enabled);
        assert_eq!(cfg.shutdown_timeout(), Duration::from_secs(10));
        assert!(cfg.request_timeout().is_none());
        assert!(cfg.auth.auth_type.is_empty());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn cors_defaults() {
        let cors = CorsConfig::default();
        assert!(cors.enabled);
        assert_eq!(cors.allowed_origins, vec!["*"]);
        assert!(cors.allow_credentials);
        assert_eq!(cors.max_age_secs, 600);
    }

    #[test]
    fn tls_without_key_material_rejected() {
        let cfg = HttpConfig {
            tls: TlsSettings {
                enabled: true,
                ..TlsSettings::default()
            },
            ..HttpConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.code(), "PTC0110");
    }

    #[test]
    fn client_auth_without_ca_rejected() {
        let cfg = HttpConfig {
            tls: TlsSettings {
                enabled: true,
                client_auth: true,
                cert_file: "server.pem".into(),
                key_file: "server.key".into(),
                ca_file: None,
            },
            ..HttpConfig::default()
        };
        assert_eq!(cfg.validate().unwrap_err().code(), "PTC0110");
    }

    #[test]
    fn load_config_reads_and_validates() {
        let path = std::env::temp_dir().join("portico_config_load_test.toml");
        std::fs::write(&path, "[http]\naddress = \"127.0.0.1\"\nport = 0\n").unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.http.address, "127.0.0.1");
        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn load_config_rejects_bad_combinations() {
        let path = std::env::temp_dir().join("portico_config_invalid_test.toml");
        std::fs::write(&path, "[http.tls]\nenabled = true\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("PTC0110"));
        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn parses_minimal_toml() {
        let cfg: ServiceConfig = toml::from_str(
            r#"
            [http]
            address = ""
            port = 8443

            [http.auth]
            type = "basic"

            [http.auth.plugin]
            password_file = "/etc/svc/users"

            [cors]
            allowed_origins = ["https://example.com"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.http.address, "");
        assert_eq!(cfg.http.port, 8443);
        assert_eq!(cfg.http.auth.auth_type, "basic");
        assert_eq!(
            cfg.http.auth.plugin.get("password_file").unwrap(),
            "/etc/svc/users"
        );
        assert_eq!(cfg.cors.allowed_origins, vec!["https://example.com"]);
    }
}
