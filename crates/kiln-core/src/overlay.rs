//! Overlay union and shape validation
//!
//! [`Overlay`] is the statically-typed union of every property group a
//! module kind can carry. Defaults accumulation, feature application, and
//! a module's own live property values all use this one shape; per-kind
//! validation decides which groups are actually legal.
//!
//! The field names of the coalesced groups must be unique across the
//! union. [`validate_shapes`] checks this at pipeline construction time;
//! a collision indicates a bug in the group definitions, not bad input.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::error::InternalError;
use crate::module::ModuleKind;
use crate::props::{
    merge_list, Apply, CommonProps, Discipline, InstallProps, KernelProps, LinkProps,
    SplittableProps,
};

/// Discriminator for the typed property groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropGroupKind {
    /// Compile and source properties.
    Common,
    /// Link-time properties.
    Link,
    /// Installation properties.
    Install,
    /// Host/target support flags.
    Splittable,
    /// Kernel object properties.
    Kernel,
}

impl PropGroupKind {
    /// All group kinds, in declaration order.
    pub const ALL: &'static [PropGroupKind] = &[
        PropGroupKind::Common,
        PropGroupKind::Link,
        PropGroupKind::Install,
        PropGroupKind::Splittable,
        PropGroupKind::Kernel,
    ];

    /// Field names the group contributes to the overlay shape.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            PropGroupKind::Common => CommonProps::FIELDS,
            PropGroupKind::Link => LinkProps::FIELDS,
            PropGroupKind::Install => InstallProps::FIELDS,
            PropGroupKind::Splittable => SplittableProps::FIELDS,
            PropGroupKind::Kernel => KernelProps::FIELDS,
        }
    }

    /// Stable lowercase name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            PropGroupKind::Common => "common",
            PropGroupKind::Link => "link",
            PropGroupKind::Install => "install",
            PropGroupKind::Splittable => "splittable",
            PropGroupKind::Kernel => "kernel",
        }
    }
}

impl std::fmt::Display for PropGroupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Property subset allowed inside a `host` or `target` section and inside
/// the per-feature overlays of those sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionOverlay {
    /// Variant-specific source files.
    pub srcs: Vec<String>,
    /// Variant-specific compiler flags.
    pub cflags: Vec<String>,
    /// Variant-specific preprocessor definitions.
    pub defines: Vec<String>,
    /// Variant-specific include search paths. First-overrides.
    pub include_dirs: Vec<String>,
    /// Variant-specific linker flags.
    pub ldflags: Vec<String>,
}

impl SectionOverlay {
    /// Merge `overlay` into `self` in the given direction.
    pub fn apply(&mut self, overlay: &SectionOverlay, apply: Apply) {
        merge_list(&mut self.srcs, &overlay.srcs, Discipline::Override, apply);
        merge_list(&mut self.cflags, &overlay.cflags, Discipline::Override, apply);
        merge_list(&mut self.defines, &overlay.defines, Discipline::Override, apply);
        merge_list(
            &mut self.include_dirs,
            &overlay.include_dirs,
            Discipline::FirstWins,
            apply,
        );
        merge_list(&mut self.ldflags, &overlay.ldflags, Discipline::Override, apply);
    }

    /// Whether every field is empty.
    pub fn is_empty(&self) -> bool {
        self == &SectionOverlay::default()
    }
}

/// A `host` or `target` section: the variant-specific overlay plus its own
/// per-feature overlay table. Feature overlays here apply to the section,
/// independently of the module's top-level feature overlays.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VariantSection {
    /// The section's own property values.
    pub props: SectionOverlay,
    /// Per-feature overlays scoped to this section. Released after
    /// feature application.
    #[serde(skip)]
    pub features: FxHashMap<String, SectionOverlay>,
}

impl VariantSection {
    /// Merge `overlay` into `self`, including the feature table, in the
    /// given direction.
    pub fn apply(&mut self, overlay: &VariantSection, apply: Apply) {
        self.props.apply(&overlay.props, apply);
        for (name, section) in &overlay.features {
            self.features
                .entry(name.clone())
                .or_default()
                .apply(section, apply);
        }
    }
}

/// Union of all property groups plus the host/target sections.
///
/// Used three ways: as a module's live property storage, as the body of a
/// defaults module, and as a feature overlay.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Overlay {
    /// Compile and source properties.
    pub common: CommonProps,
    /// Link-time properties.
    pub link: LinkProps,
    /// Installation properties.
    pub install: InstallProps,
    /// Host/target support flags.
    pub splittable: SplittableProps,
    /// Kernel object properties.
    pub kernel: KernelProps,
    /// Host-specific section.
    pub host: VariantSection,
    /// Target-specific section.
    pub target: VariantSection,
}

impl Overlay {
    /// Merge `overlay` into `self` in the given direction, covering every
    /// group and both variant sections.
    pub fn apply(&mut self, overlay: &Overlay, apply: Apply) {
        self.common.apply(&overlay.common, apply);
        self.link.apply(&overlay.link, apply);
        self.install.apply(&overlay.install, apply);
        self.splittable.apply(&overlay.splittable, apply);
        self.kernel.apply(&overlay.kernel, apply);
        self.host.apply(&overlay.host, apply);
        self.target.apply(&overlay.target, apply);
    }

    /// Group kinds carrying at least one non-default value.
    pub fn provided_groups(&self) -> Vec<PropGroupKind> {
        let mut provided = Vec::new();
        if self.common != CommonProps::default() {
            provided.push(PropGroupKind::Common);
        }
        if self.link != LinkProps::default() {
            provided.push(PropGroupKind::Link);
        }
        if self.install != InstallProps::default() {
            provided.push(PropGroupKind::Install);
        }
        if self.splittable != SplittableProps::default() {
            provided.push(PropGroupKind::Splittable);
        }
        if self.kernel != KernelProps::default() {
            provided.push(PropGroupKind::Kernel);
        }
        provided
    }
}

/// Validate field-name uniqueness across the groups coalesced for each
/// module kind.
///
/// A duplicate means two groups claim the same manifest field and the
/// overlay union is ambiguous; this is a core bug, reported as an
/// internal consistency error.
pub fn validate_shapes() -> Result<(), InternalError> {
    for kind in ModuleKind::ALL {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for group in kind.supported_groups() {
            for field in group.fields() {
                if !seen.insert(field) {
                    return Err(InternalError::FieldCollision {
                        kind: kind.name().to_string(),
                        field: field.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes_are_collision_free() {
        validate_shapes().unwrap();
    }

    #[test]
    fn test_provided_groups_tracks_nonempty_groups() {
        let mut overlay = Overlay::default();
        assert!(overlay.provided_groups().is_empty());

        overlay.link.static_libs.push("libx".to_string());
        overlay.install.install_path = Some("/usr/lib".to_string());
        assert_eq!(
            overlay.provided_groups(),
            vec![PropGroupKind::Link, PropGroupKind::Install]
        );
    }

    #[test]
    fn test_section_feature_tables_merge_per_feature() {
        let mut base = VariantSection::default();
        base.features.insert(
            "debug".to_string(),
            SectionOverlay {
                cflags: vec!["-g".to_string()],
                ..Default::default()
            },
        );

        let mut overlay = VariantSection::default();
        overlay.features.insert(
            "debug".to_string(),
            SectionOverlay {
                cflags: vec!["-DDEBUG".to_string()],
                ..Default::default()
            },
        );
        overlay.features.insert(
            "lto".to_string(),
            SectionOverlay {
                cflags: vec!["-flto".to_string()],
                ..Default::default()
            },
        );

        base.apply(&overlay, Apply::Augment);
        assert_eq!(
            base.features["debug"].cflags,
            vec!["-g".to_string(), "-DDEBUG".to_string()]
        );
        assert_eq!(base.features["lto"].cflags, vec!["-flto".to_string()]);
    }
}
