//! Password-file basic authentication plugin.
//!
//! The password file holds one `name:sha256-hex` entry per line; blank lines
//! and `#` comments are skipped. The file is read once at construction.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::error::ServerError;

use super::Authenticator;

/// Plugin-scoped setting naming the password file.
pub const PASSWORD_FILE_KEY: &str = "password_file";

const PLUGIN_NAME: &str = "basic";

/// Verifies `Authorization: Basic` credentials against a password file.
#[derive(Debug)]
pub struct BasicAuthenticator {
    users: HashMap<String, String>,
}

/// Registry constructor for the `"basic"` plugin.
pub(crate) fn from_config(
    plugin: &HashMap<String, String>,
) -> Result<Arc<dyn Authenticator>, ServerError> {
    let path = plugin
        .get(PASSWORD_FILE_KEY)
        .ok_or_else(|| ServerError::AuthPluginInit {
            name: PLUGIN_NAME.into(),
            reason: format!("'{PASSWORD_FILE_KEY}' is not configured"),
        })?;
    Ok(Arc::new(BasicAuthenticator::from_password_file(Path::new(
        path,
    ))?))
}

impl BasicAuthenticator {
    /// Load and parse the password file.
    pub fn from_password_file(path: &Path) -> Result<Self, ServerError> {
        let init_err = |reason: String| ServerError::AuthPluginInit {
            name: PLUGIN_NAME.into(),
            reason,
        };

        let contents = fs::read_to_string(path)
            .map_err(|e| init_err(format!("cannot read '{}': {e}", path.display())))?;

        let mut users = HashMap::new();
        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (name, digest) = line.split_once(':').ok_or_else(|| {
                init_err(format!(
                    "malformed entry at line {} of '{}'",
                    lineno + 1,
                    path.display()
                ))
            })?;
            users.insert(name.to_string(), digest.to_ascii_lowercase());
        }
        Ok(Self { users })
    }

    fn credentials_valid(&self, name: &str, password: &str) -> bool {
        let digest = hex::encode(Sha256::digest(password.as_bytes()));
        self.users.get(name).map(|d| *d == digest).unwrap_or(false)
    }
}

impl Authenticator for BasicAuthenticator {
    fn authorize(&self, headers: &HeaderMap) -> Result<(), ServerError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ServerError::Unauthorized)?;

        let (scheme, encoded) = value.split_once(' ').ok_or(ServerError::Unauthorized)?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(ServerError::Unauthorized);
        }

        let decoded = BASE64
            .decode(encoded.trim())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or(ServerError::Unauthorized)?;
        let (name, password) = decoded.split_once(':').ok_or(ServerError::Unauthorized)?;

        if self.credentials_valid(name, password) {
            Ok(())
        } else {
            Err(ServerError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn testdata(name: &str) -> String {
        format!("{}/testdata/{name}", env!("CARGO_MANIFEST_DIR"))
    }

    fn authenticator() -> BasicAuthenticator {
        BasicAuthenticator::from_password_file(Path::new(&testdata("test_users"))).unwrap()
    }

    fn basic_header(name: &str, password: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = format!("Basic {}", BASE64.encode(format!("{name}:{password}")));
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn missing_password_file_fails_construction() {
        let err =
            BasicAuthenticator::from_password_file(Path::new("/no/such/users")).unwrap_err();
        assert_eq!(err.code(), "PTC0106");
    }

    #[test]
    fn unconfigured_password_file_fails_construction() {
        let err = from_config(&HashMap::new()).unwrap_err();
        assert_eq!(err.code(), "PTC0106");
    }

    #[test]
    fn no_credentials_rejected() {
        let err = authenticator().authorize(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.code(), "PTC0107");
    }

    #[test]
    fn wrong_password_rejected() {
        let headers = basic_header("alice", "wrong");
        assert!(authenticator().authorize(&headers).is_err());
    }

    #[test]
    fn unknown_user_rejected() {
        let headers = basic_header("mallory", "l0ngclaw");
        assert!(authenticator().authorize(&headers).is_err());
    }

    #[test]
    fn valid_credentials_accepted() {
        let headers = basic_header("alice", "l0ngclaw");
        authenticator().authorize(&headers).unwrap();
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        let value = format!("basic {}", BASE64.encode("alice:l0ngclaw"));
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        authenticator().authorize(&headers).unwrap();
    }

    #[test]
    fn garbage_base64_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic %%%%".parse().unwrap());
        assert!(authenticator().authorize(&headers).is_err());
    }
}
