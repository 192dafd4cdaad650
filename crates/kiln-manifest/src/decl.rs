//! Raw TOML declaration structures
//!
//! Mirror of the `kiln.toml` schema, before validation. Field presence is
//! checked against the declared module kind during conversion.

use std::collections::HashMap;

use serde::Deserialize;

/// Top-level document: build config plus the module table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawManifest {
    /// `[config]` table.
    #[serde(default)]
    pub config: RawConfig,
    /// `[module.NAME]` tables.
    #[serde(default)]
    pub module: HashMap<String, RawModule>,
}

/// `[config]`: the global feature declaration list and this build's
/// enabled set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// Declared feature names, in order.
    #[serde(default)]
    pub features: Vec<String>,
    /// Features enabled for this build.
    #[serde(default)]
    pub enabled: Vec<String>,
}

/// One `[module.NAME]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawModule {
    /// Module kind name (`library`, `binary`, ...).
    #[serde(default)]
    pub kind: String,
    /// Inherited defaults, in order.
    #[serde(default)]
    pub defaults: Vec<String>,

    #[serde(default)]
    pub srcs: Vec<String>,
    #[serde(default)]
    pub cflags: Vec<String>,
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub include_dirs: Vec<String>,
    pub enabled: Option<bool>,

    #[serde(default)]
    pub ldflags: Vec<String>,
    #[serde(default)]
    pub static_libs: Vec<String>,
    #[serde(default)]
    pub whole_static_libs: Vec<String>,
    #[serde(default)]
    pub shared_libs: Vec<String>,
    #[serde(default)]
    pub export_include_dirs: Vec<String>,

    pub install_path: Option<String>,
    pub relative_install_path: Option<String>,
    pub install_group: Option<String>,
    pub post_install_cmd: Option<String>,

    pub host_supported: Option<bool>,
    pub target_supported: Option<bool>,

    pub kernel_dir: Option<String>,
    #[serde(default)]
    pub extra_symbols: Vec<String>,
    #[serde(default)]
    pub kbuild_options: Vec<String>,

    /// Alias target (`alias` kind only).
    pub actual: Option<String>,

    /// `[module.NAME.host]` section.
    #[serde(default)]
    pub host: RawSection,
    /// `[module.NAME.target]` section.
    #[serde(default)]
    pub target: RawSection,
    /// `[module.NAME.features.FEATURE]` overlays.
    #[serde(default)]
    pub features: HashMap<String, RawOverlay>,
}

/// A `host` or `target` section body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSection {
    #[serde(default)]
    pub srcs: Vec<String>,
    #[serde(default)]
    pub cflags: Vec<String>,
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub include_dirs: Vec<String>,
    #[serde(default)]
    pub ldflags: Vec<String>,
    /// `[module.NAME.host.features.FEATURE]` overlays, scoped to the
    /// section.
    #[serde(default)]
    pub features: HashMap<String, RawSectionOverlay>,
}

/// A feature overlay inside a `host`/`target` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSectionOverlay {
    #[serde(default)]
    pub srcs: Vec<String>,
    #[serde(default)]
    pub cflags: Vec<String>,
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub include_dirs: Vec<String>,
    #[serde(default)]
    pub ldflags: Vec<String>,
}

/// A top-level feature overlay: any property the module kind accepts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawOverlay {
    #[serde(default)]
    pub srcs: Vec<String>,
    #[serde(default)]
    pub cflags: Vec<String>,
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub include_dirs: Vec<String>,
    pub enabled: Option<bool>,

    #[serde(default)]
    pub ldflags: Vec<String>,
    #[serde(default)]
    pub static_libs: Vec<String>,
    #[serde(default)]
    pub whole_static_libs: Vec<String>,
    #[serde(default)]
    pub shared_libs: Vec<String>,
    #[serde(default)]
    pub export_include_dirs: Vec<String>,

    pub install_path: Option<String>,
    pub relative_install_path: Option<String>,
    pub install_group: Option<String>,
    pub post_install_cmd: Option<String>,

    pub host_supported: Option<bool>,
    pub target_supported: Option<bool>,

    pub kernel_dir: Option<String>,
    #[serde(default)]
    pub extra_symbols: Vec<String>,
    #[serde(default)]
    pub kbuild_options: Vec<String>,
}
