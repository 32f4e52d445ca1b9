use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigurationError;
use crate::permissions::BasePermissionRegistry;
use crate::schema::{SchemaRegistry, SchemaRegistryBuilder, TypeSchema};

fn default_true() -> bool {
    true
}

/// Declarative ACL configuration: extra permissions plus the schema of every
/// type the synthesizer should know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclConfig {
    /// Application permissions by name, added on top of the base set.
    #[serde(default)]
    pub permissions: BTreeMap<String, u32>,
    /// Seed the permission registry with READ, WRITE, CREATE, DELETE and ADMINISTRATION.
    #[serde(default = "default_true")]
    pub include_base_permissions: bool,
    #[serde(default)]
    pub types: Vec<TypeSchema>,
}

impl Default for AclConfig {
    fn default() -> Self {
        Self {
            permissions: BTreeMap::new(),
            include_base_permissions: true,
            types: Vec::new(),
        }
    }
}

impl AclConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigurationError> {
        load_config(text)
    }

    pub fn permission_registry(&self) -> Result<BasePermissionRegistry, ConfigurationError> {
        let mut registry = if self.include_base_permissions {
            BasePermissionRegistry::new()
        } else {
            BasePermissionRegistry::empty()
        };
        for (name, mask) in &self.permissions {
            registry.register(name, *mask)?;
        }
        Ok(registry)
    }

    pub fn schema_registry(&self) -> Result<SchemaRegistry, ConfigurationError> {
        SchemaRegistryBuilder::new()
            .register_all(self.types.iter().cloned())
            .build()
    }

    /// Both registries, ready to hand to [`AclSynthesizer::new`](crate::AclSynthesizer::new).
    pub(crate) fn registries(
        &self,
    ) -> Result<(Arc<SchemaRegistry>, Arc<BasePermissionRegistry>), ConfigurationError> {
        Ok((
            Arc::new(self.schema_registry()?),
            Arc::new(self.permission_registry()?),
        ))
    }
}

/// Parse an [`AclConfig`] from JSON.
///
/// Syntax and shape errors are mapped into `ConfigurationError::InvalidConfig`.
///
/// Example:
/// ```rust
/// use aclsynth_core::load_config;
/// let config = load_config(r#"{
///     "permissions": {"approve": 32},
///     "types": [{"type_tag": "Invoice", "securable": true}]
/// }"#).unwrap();
/// assert!(config.include_base_permissions);
/// assert_eq!(config.types.len(), 1);
/// ```
pub fn load_config(text: &str) -> Result<AclConfig, ConfigurationError> {
    let config: AclConfig = serde_json::from_str(text)
        .map_err(|e| ConfigurationError::InvalidConfig(e.to_string()))?;
    debug!(
        event = "Config",
        phase = "Loaded",
        types = config.types.len(),
        permissions = config.permissions.len()
    );
    Ok(config)
}
