//! Permission name registry and the resolver that maps names to masks.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use strum::IntoEnumIterator;
use tracing::debug;

use crate::cache::PublishOnceCache;
use crate::error::{AclError, ConfigurationError};
use crate::types::{BasePermission, Permission};

static PERMISSION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("static regex is valid"));

/// Upper-cases and trims a permission name.
pub fn normalize_permission_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Maps permission names to integer masks.
///
/// Names passed in are already normalized to upper case.
pub trait PermissionRegistry: Send + Sync {
    fn name_to_mask(&self, name: &str) -> Result<u32, AclError>;
}

/// A table-backed registry, seeded with the [`BasePermission`] set and
/// extensible with application-specific permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePermissionRegistry {
    by_name: BTreeMap<String, u32>,
}

impl Default for BasePermissionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BasePermissionRegistry {
    pub fn new() -> Self {
        let by_name = BasePermission::iter()
            .map(|p| (p.as_ref().to_string(), p.mask()))
            .collect();
        Self { by_name }
    }

    /// A registry with no permissions at all.
    pub fn empty() -> Self {
        Self {
            by_name: BTreeMap::new(),
        }
    }

    /// Register a permission. Re-registering a name with the same mask is a no-op.
    pub fn register(&mut self, name: &str, mask: u32) -> Result<(), ConfigurationError> {
        let name = normalize_permission_name(name);
        if !PERMISSION_NAME.is_match(&name) {
            return Err(ConfigurationError::InvalidPermission(format!(
                "'{name}' is not a valid permission name"
            )));
        }
        if mask == 0 {
            return Err(ConfigurationError::InvalidPermission(format!(
                "'{name}' must have a non-zero mask"
            )));
        }
        match self.by_name.get(&name) {
            Some(existing) if *existing != mask => Err(ConfigurationError::InvalidPermission(
                format!("'{name}' is already registered with mask {existing}"),
            )),
            _ => {
                self.by_name.insert(name, mask);
                Ok(())
            }
        }
    }

    pub fn with_permission(mut self, name: &str, mask: u32) -> Result<Self, ConfigurationError> {
        self.register(name, mask)?;
        Ok(self)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl PermissionRegistry for BasePermissionRegistry {
    fn name_to_mask(&self, name: &str) -> Result<u32, AclError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| AclError::UnknownPermission(name.to_string()))
    }
}

/// Resolves permission names (case-insensitively) through a registry, caching hits.
pub struct PermissionResolver {
    registry: Arc<dyn PermissionRegistry>,
    cache: PublishOnceCache<Permission>,
}

impl PermissionResolver {
    pub fn new(registry: Arc<dyn PermissionRegistry>) -> Self {
        Self {
            registry,
            cache: PublishOnceCache::new(),
        }
    }

    pub fn resolve(&self, name: &str) -> Result<Permission, AclError> {
        let normalized = normalize_permission_name(name);
        self.cache.get_or_try_insert_with(&normalized, || {
            let mask = self.registry.name_to_mask(&normalized)?;
            debug!(event = "Permission", phase = "Resolved", name = %normalized, mask);
            Ok(Permission::new(normalized.clone(), mask))
        })
    }

    /// Resolve every name in order, failing on the first unknown one.
    pub fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Permission>, AclError> {
        names.iter().map(|name| self.resolve(name.as_ref())).collect()
    }
}

impl std::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionResolver")
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use yare::parameterized;

    #[parameterized(
        upper = { "READ", 1 },
        lower = { "write", 2 },
        mixed = { "Create", 4 },
        padded = { "  delete ", 8 },
        administration = { "administration", 16 },
    )]
    fn test_resolve_base_permissions(name: &str, mask: u32) {
        let resolver = PermissionResolver::new(Arc::new(BasePermissionRegistry::new()));
        let permission = resolver.resolve(name).unwrap();
        assert_eq!(permission.mask(), mask);
        assert_eq!(permission.name(), normalize_permission_name(name));
    }

    #[test]
    fn test_unknown_permission() {
        let resolver = PermissionResolver::new(Arc::new(BasePermissionRegistry::new()));
        assert_eq!(
            resolver.resolve("fly"),
            Err(AclError::UnknownPermission("FLY".to_string()))
        );
    }

    #[test]
    fn test_resolve_all_fails_on_first_unknown() {
        let resolver = PermissionResolver::new(Arc::new(BasePermissionRegistry::new()));
        let err = resolver.resolve_all(&["read", "FLY", "SWIM"]).unwrap_err();
        assert_eq!(err, AclError::UnknownPermission("FLY".to_string()));
        let ok = resolver.resolve_all(&["read", "write"]).unwrap();
        assert_eq!(ok.iter().map(Permission::mask).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_register_custom_permission() {
        let registry = BasePermissionRegistry::new()
            .with_permission("approve", 32)
            .unwrap();
        assert_eq!(registry.name_to_mask("APPROVE"), Ok(32));
        assert_eq!(registry.len(), 6);
        assert!(registry.names().any(|n| n == "APPROVE"));
    }

    #[parameterized(
        empty = { "", 4 },
        leading_digit = { "1READ", 64 },
        dash = { "RE-AD", 64 },
        zero_mask = { "APPROVE", 0 },
        conflicting_mask = { "READ", 2 },
    )]
    fn test_register_rejects_invalid(name: &str, mask: u32) {
        let mut registry = BasePermissionRegistry::new();
        assert!(matches!(
            registry.register(name, mask),
            Err(ConfigurationError::InvalidPermission(_))
        ));
    }

    #[test]
    fn test_reregister_same_mask_is_noop() {
        let mut registry = BasePermissionRegistry::new();
        registry.register("read", 1).unwrap();
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_empty_registry_knows_nothing() {
        let registry = BasePermissionRegistry::empty();
        assert!(registry.is_empty());
        assert!(registry.name_to_mask("READ").is_err());
    }

    struct CountingRegistry {
        calls: AtomicUsize,
    }

    impl PermissionRegistry for CountingRegistry {
        fn name_to_mask(&self, name: &str) -> Result<u32, AclError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match name {
                "READ" => Ok(1),
                other => Err(AclError::UnknownPermission(other.to_string())),
            }
        }
    }

    #[test]
    fn test_resolver_caches_hits_only() {
        let registry = Arc::new(CountingRegistry {
            calls: AtomicUsize::new(0),
        });
        let resolver = PermissionResolver::new(registry.clone());

        resolver.resolve("read").unwrap();
        resolver.resolve("READ").unwrap();
        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);

        assert!(resolver.resolve("fly").is_err());
        assert!(resolver.resolve("fly").is_err());
        assert_eq!(registry.calls.load(Ordering::SeqCst), 3);
    }
}
