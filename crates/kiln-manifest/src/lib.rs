//! Kiln build-description parsing (kiln.toml)
//!
//! Loads a TOML build description into module prototypes and the global
//! feature registry:
//! - `[config]` declares the ordered feature list and the enabled set
//! - each `[module.NAME]` table declares one build module
//! - `[module.NAME.host]` / `[module.NAME.target]` hold variant sections
//! - `[module.NAME.features.F]` holds per-feature overlays
//!
//! Source entries are taken literally; glob expansion is the caller's
//! concern.

pub mod decl;

mod convert;

use std::path::Path;

use thiserror::Error;

use kiln_core::{ConfigError, FeatureRegistry, ModuleSet};

/// Errors that can occur while loading a build description.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read the manifest file.
    #[error("Failed to read manifest file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse manifest: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Unknown module kind.
    #[error("module {module} declares unknown kind \"{kind}\"")]
    UnknownKind {
        /// The declaring module.
        module: String,
        /// The unrecognized kind string.
        kind: String,
    },

    /// Feature name not present in the `[config]` declaration list.
    #[error("module {module} references undeclared feature \"{feature}\"")]
    UnknownFeature {
        /// The referencing module.
        module: String,
        /// The undeclared feature.
        feature: String,
    },

    /// Property group not accepted by the declared kind.
    #[error("module {module} ({kind}) declares {group} properties, which the kind does not support")]
    UnsupportedGroup {
        /// The declaring module.
        module: String,
        /// The module's kind.
        kind: String,
        /// The offending property group.
        group: String,
    },

    /// Property not accepted by the declared kind.
    #[error("module {module} declares \"{property}\", which its kind does not support")]
    UnsupportedProperty {
        /// The declaring module.
        module: String,
        /// The offending property.
        property: String,
    },

    /// An alias without an `actual` target.
    #[error("alias {module} is missing its \"actual\" target")]
    MissingAliasTarget {
        /// The alias module.
        module: String,
    },

    /// Configuration error surfaced while building the registry or set.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A parsed and validated build description.
#[derive(Debug)]
pub struct Manifest {
    /// Module prototypes, ready for the resolver.
    pub modules: ModuleSet,
    /// Global feature registry.
    pub features: FeatureRegistry,
}

impl Manifest {
    /// Parse a manifest from TOML text.
    pub fn from_str(text: &str) -> Result<Self, ManifestError> {
        let raw: decl::RawManifest = toml::from_str(text)?;
        convert::convert(raw)
    }

    /// Read and parse a manifest file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::{DepTag, ModuleKind};

    #[test]
    fn test_minimal_module() {
        let manifest = Manifest::from_str(
            r#"
[module.libfoo]
kind = "library"
srcs = ["foo.c"]
"#,
        )
        .unwrap();

        let libfoo = manifest.modules.get("libfoo").unwrap();
        assert_eq!(libfoo.kind, ModuleKind::Library);
        assert_eq!(libfoo.props.common.srcs, vec!["foo.c".to_string()]);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let err = Manifest::from_str(
            r#"
[module.libfoo]
kind = "shared_library"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::UnknownKind { .. }));
    }

    #[test]
    fn test_feature_slots_exist_for_every_declared_feature() {
        let manifest = Manifest::from_str(
            r#"
[config]
features = ["debug", "lto"]

[module.libfoo]
kind = "library"

[module.libfoo.features.debug]
cflags = ["-g"]
"#,
        )
        .unwrap();

        let libfoo = manifest.modules.get("libfoo").unwrap();
        assert_eq!(libfoo.features.len(), 2);
        assert_eq!(
            libfoo.features["debug"].common.cflags,
            vec!["-g".to_string()]
        );
        assert!(libfoo.features["lto"].common.cflags.is_empty());
    }

    #[test]
    fn test_undeclared_feature_reference_is_rejected() {
        let err = Manifest::from_str(
            r#"
[module.libfoo]
kind = "library"

[module.libfoo.features.ghost]
cflags = ["-g"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::UnknownFeature { .. }));
    }

    #[test]
    fn test_link_props_on_genrule_are_rejected() {
        let err = Manifest::from_str(
            r#"
[module.gen-version]
kind = "genrule"
static_libs = ["libfoo"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::UnsupportedGroup { .. }));
    }

    #[test]
    fn test_alias_requires_actual() {
        let err = Manifest::from_str(
            r#"
[module.libold]
kind = "alias"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::MissingAliasTarget { .. }));

        let manifest = Manifest::from_str(
            r#"
[module.libold]
kind = "alias"
actual = "libnew"
"#,
        )
        .unwrap();
        let alias = manifest.modules.get("libold").unwrap();
        assert_eq!(alias.deps_with_tag(DepTag::Alias).next(), Some("libnew"));
    }

    #[test]
    fn test_enabled_feature_must_be_declared() {
        let err = Manifest::from_str(
            r#"
[config]
features = ["debug"]
enabled = ["ltx"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::Config(_)));
    }
}
