//! Typed property groups and merge disciplines
//!
//! Every property field carries one of two merge disciplines:
//!
//! - [`Discipline::Override`] (the default): later-applied values win.
//!   List overlays are appended after the base; a set scalar overlay
//!   replaces the base.
//! - [`Discipline::FirstWins`] (tagged explicitly, e.g. include search
//!   paths): the earliest-declared value wins. List overlays go in front
//!   of the base when augmenting and behind it when underlaying; scalar
//!   overlays never displace an already-set base.
//!
//! The direction of an application is explicit: [`Apply::Augment`] means
//! the overlay is the later writer (features, target sections, sibling
//! defaults accumulating among themselves), [`Apply::Underlay`] means the
//! overlay is the earlier writer (the defaults accumulator merging beneath
//! a module's own values).

use serde::Serialize;

/// Per-field merge discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    /// Later-applied values take precedence (compiler-flag lists).
    Override,
    /// Earliest-declared value wins (include search paths).
    FirstWins,
}

/// Direction of an overlay application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apply {
    /// The overlay is the later writer: features, target sections,
    /// sibling defaults accumulating into the scratch overlay.
    Augment,
    /// The overlay is the earlier writer: inherited defaults merging
    /// beneath the module's own declared values.
    Underlay,
}

/// Merge a list-valued overlay into a base list.
pub fn merge_list(base: &mut Vec<String>, overlay: &[String], disc: Discipline, apply: Apply) {
    if overlay.is_empty() {
        return;
    }
    let append = matches!(
        (apply, disc),
        (Apply::Augment, Discipline::Override) | (Apply::Underlay, Discipline::FirstWins)
    );
    if append {
        base.extend(overlay.iter().cloned());
    } else {
        base.splice(0..0, overlay.iter().cloned());
    }
}

/// Merge an optional scalar overlay into a base scalar.
///
/// An unset overlay is always a no-op. A set overlay replaces the base
/// only for override-ordering augmentation (last writer wins); in every
/// other combination it only fills an unset base.
pub fn merge_opt<T: Clone>(base: &mut Option<T>, overlay: &Option<T>, disc: Discipline, apply: Apply) {
    let Some(value) = overlay else {
        return;
    };
    let replace = matches!((apply, disc), (Apply::Augment, Discipline::Override));
    if replace || base.is_none() {
        *base = Some(value.clone());
    }
}

/// Compile and source properties shared by every buildable module kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommonProps {
    /// Source files, taken literally (glob expansion happens upstream).
    pub srcs: Vec<String>,
    /// Compiler flags.
    pub cflags: Vec<String>,
    /// Preprocessor definitions.
    pub defines: Vec<String>,
    /// Include search paths. First-overrides: the earliest declaration
    /// is searched first.
    pub include_dirs: Vec<String>,
    /// Whether the module is enabled. Unset means enabled.
    pub enabled: Option<bool>,
}

impl CommonProps {
    /// Field names contributed to the overlay shape.
    pub const FIELDS: &'static [&'static str] =
        &["srcs", "cflags", "defines", "include_dirs", "enabled"];

    /// Merge `overlay` into `self` in the given direction.
    pub fn apply(&mut self, overlay: &CommonProps, apply: Apply) {
        merge_list(&mut self.srcs, &overlay.srcs, Discipline::Override, apply);
        merge_list(&mut self.cflags, &overlay.cflags, Discipline::Override, apply);
        merge_list(&mut self.defines, &overlay.defines, Discipline::Override, apply);
        merge_list(
            &mut self.include_dirs,
            &overlay.include_dirs,
            Discipline::FirstWins,
            apply,
        );
        merge_opt(&mut self.enabled, &overlay.enabled, Discipline::Override, apply);
    }
}

/// Link-time properties for library and binary kinds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkProps {
    /// Linker flags.
    pub ldflags: Vec<String>,
    /// Static library dependencies, in declared order.
    pub static_libs: Vec<String>,
    /// Whole-archive static dependencies.
    pub whole_static_libs: Vec<String>,
    /// Shared library dependencies.
    pub shared_libs: Vec<String>,
    /// Include paths exported to consumers. First-overrides.
    pub export_include_dirs: Vec<String>,
}

impl LinkProps {
    /// Field names contributed to the overlay shape.
    pub const FIELDS: &'static [&'static str] = &[
        "ldflags",
        "static_libs",
        "whole_static_libs",
        "shared_libs",
        "export_include_dirs",
    ];

    /// Merge `overlay` into `self` in the given direction.
    pub fn apply(&mut self, overlay: &LinkProps, apply: Apply) {
        merge_list(&mut self.ldflags, &overlay.ldflags, Discipline::Override, apply);
        merge_list(
            &mut self.static_libs,
            &overlay.static_libs,
            Discipline::Override,
            apply,
        );
        merge_list(
            &mut self.whole_static_libs,
            &overlay.whole_static_libs,
            Discipline::Override,
            apply,
        );
        merge_list(
            &mut self.shared_libs,
            &overlay.shared_libs,
            Discipline::Override,
            apply,
        );
        merge_list(
            &mut self.export_include_dirs,
            &overlay.export_include_dirs,
            Discipline::FirstWins,
            apply,
        );
    }
}

/// Installation properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstallProps {
    /// Absolute installation directory.
    pub install_path: Option<String>,
    /// Path appended to the effective installation directory.
    pub relative_install_path: Option<String>,
    /// Name of an install-group module supplying the base path.
    pub install_group: Option<String>,
    /// Command run after installation.
    pub post_install_cmd: Option<String>,
}

impl InstallProps {
    /// Field names contributed to the overlay shape.
    pub const FIELDS: &'static [&'static str] = &[
        "install_path",
        "relative_install_path",
        "install_group",
        "post_install_cmd",
    ];

    /// Merge `overlay` into `self` in the given direction.
    pub fn apply(&mut self, overlay: &InstallProps, apply: Apply) {
        merge_opt(
            &mut self.install_path,
            &overlay.install_path,
            Discipline::Override,
            apply,
        );
        merge_opt(
            &mut self.relative_install_path,
            &overlay.relative_install_path,
            Discipline::Override,
            apply,
        );
        merge_opt(
            &mut self.install_group,
            &overlay.install_group,
            Discipline::Override,
            apply,
        );
        merge_opt(
            &mut self.post_install_cmd,
            &overlay.post_install_cmd,
            Discipline::Override,
            apply,
        );
    }
}

/// Host/target support flags read by the variant splitter.
///
/// Both flags are independent and optional. When unset, a module does not
/// support the host variant and does support the target variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SplittableProps {
    /// Whether a host variant should be created.
    pub host_supported: Option<bool>,
    /// Whether a target variant should be created.
    pub target_supported: Option<bool>,
}

impl SplittableProps {
    /// Field names contributed to the overlay shape.
    pub const FIELDS: &'static [&'static str] = &["host_supported", "target_supported"];

    /// Merge `overlay` into `self` in the given direction.
    pub fn apply(&mut self, overlay: &SplittableProps, apply: Apply) {
        merge_opt(
            &mut self.host_supported,
            &overlay.host_supported,
            Discipline::Override,
            apply,
        );
        merge_opt(
            &mut self.target_supported,
            &overlay.target_supported,
            Discipline::Override,
            apply,
        );
    }

    /// Effective host support (default: unsupported).
    pub fn host(&self) -> bool {
        self.host_supported.unwrap_or(false)
    }

    /// Effective target support (default: supported).
    pub fn target(&self) -> bool {
        self.target_supported.unwrap_or(true)
    }
}

/// Out-of-tree kernel object properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KernelProps {
    /// Kernel build directory.
    pub kernel_dir: Option<String>,
    /// Kernel modules whose symbol tables this object links against.
    pub extra_symbols: Vec<String>,
    /// Extra arguments passed to kbuild.
    pub kbuild_options: Vec<String>,
}

impl KernelProps {
    /// Field names contributed to the overlay shape.
    pub const FIELDS: &'static [&'static str] = &["kernel_dir", "extra_symbols", "kbuild_options"];

    /// Merge `overlay` into `self` in the given direction.
    pub fn apply(&mut self, overlay: &KernelProps, apply: Apply) {
        merge_opt(
            &mut self.kernel_dir,
            &overlay.kernel_dir,
            Discipline::Override,
            apply,
        );
        merge_list(
            &mut self.extra_symbols,
            &overlay.extra_symbols,
            Discipline::Override,
            apply,
        );
        merge_list(
            &mut self.kbuild_options,
            &overlay.kbuild_options,
            Discipline::Override,
            apply,
        );
    }
}
