//! Global feature registry
//!
//! Features are build-global named boolean switches. The declaration list
//! is ordered and that order is the only order feature overlays are ever
//! applied in; the enabled set is per build invocation.

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::error::ConfigError;

/// The global ordered feature list and the enabled set for this build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureRegistry {
    declared: Vec<String>,
    enabled: FxHashSet<String>,
}

impl FeatureRegistry {
    /// Build a registry from the declared list and the enabled set.
    ///
    /// Every enabled name must appear in the declaration list.
    pub fn new(
        declared: Vec<String>,
        enabled: impl IntoIterator<Item = String>,
    ) -> Result<Self, ConfigError> {
        let mut set = FxHashSet::default();
        for name in enabled {
            if !declared.iter().any(|d| *d == name) {
                return Err(ConfigError::UnknownFeature {
                    module: "build config".to_string(),
                    feature: name,
                });
            }
            set.insert(name);
        }
        Ok(Self {
            declared,
            enabled: set,
        })
    }

    /// Declared feature names, in declaration order.
    pub fn declared(&self) -> &[String] {
        &self.declared
    }

    /// Whether `name` is declared at all.
    pub fn is_declared(&self, name: &str) -> bool {
        self.declared.iter().any(|d| d == name)
    }

    /// Whether `name` is enabled for this build.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.contains(name)
    }

    /// Enabled features, in declaration order.
    pub fn enabled_in_order(&self) -> impl Iterator<Item = &str> {
        self.declared
            .iter()
            .filter(|name| self.enabled.contains(name.as_str()))
            .map(|name| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_enabled_iterates_in_declaration_order() {
        let registry = FeatureRegistry::new(
            names(&["lto", "debug", "asan"]),
            names(&["asan", "lto"]),
        )
        .unwrap();

        let enabled: Vec<&str> = registry.enabled_in_order().collect();
        assert_eq!(enabled, vec!["lto", "asan"]);
    }

    #[test]
    fn test_unknown_enabled_feature_is_rejected() {
        let err = FeatureRegistry::new(names(&["debug"]), names(&["ltx"])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFeature { .. }));
    }

    #[test]
    fn test_declared_but_disabled() {
        let registry = FeatureRegistry::new(names(&["debug"]), Vec::new()).unwrap();
        assert!(registry.is_declared("debug"));
        assert!(!registry.is_enabled("debug"));
    }
}
