//! Plugin name → constructor registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ServerError;

use super::{basic, AllowAll, Authenticator};

/// Constructor for an authenticator, fed the plugin-scoped settings.
pub type AuthenticatorFactory =
    fn(&HashMap<String, String>) -> Result<Arc<dyn Authenticator>, ServerError>;

/// Registry mapping plugin names to constructors.
///
/// Names are case-insensitive; they are normalized at registration and at
/// resolution. The registry's lifetime is owned by whoever constructs
/// servers from it — independent registries per test are expected.
pub struct AuthRegistry {
    factories: HashMap<String, AuthenticatorFactory>,
}

impl AuthRegistry {
    /// A registry with no plugins registered.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with the built-in plugins: `"basic"`.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("basic", basic::from_config);
        registry
    }

    /// Register (or replace) a plugin constructor under `name`.
    pub fn register(&mut self, name: &str, factory: AuthenticatorFactory) {
        self.factories.insert(name.to_ascii_lowercase(), factory);
    }

    /// Resolve `auth_type` and construct its authenticator.
    ///
    /// An empty name yields the allow-all authenticator; an unregistered name
    /// is a construction-time failure naming the offender.
    pub fn resolve(
        &self,
        auth_type: &str,
        plugin: &HashMap<String, String>,
    ) -> Result<Arc<dyn Authenticator>, ServerError> {
        let name = auth_type.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Ok(Arc::new(AllowAll));
        }
        match self.factories.get(&name) {
            Some(factory) => factory(plugin),
            None => Err(ServerError::UnknownAuthPlugin {
                name: auth_type.trim().to_string(),
            }),
        }
    }
}

impl Default for AuthRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
