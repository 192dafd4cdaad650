//! Build modules, kinds, variants, and dependency edges

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::overlay::{Overlay, PropGroupKind};

/// Host or target build flavor of a concrete module instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Built for the machine running the build.
    Host,
    /// Built for the device the build targets.
    Target,
}

impl Variant {
    /// Stable lowercase name used in diagnostics and output paths.
    pub fn name(self) -> &'static str {
        match self {
            Variant::Host => "host",
            Variant::Target => "target",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How the variant splitter treats a module kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    /// Virtual kinds that never receive a variant tag.
    Never,
    /// Kinds pinned to exactly one variant regardless of properties.
    TargetOnly,
    /// Kinds split according to their composed [`SplittableProps`].
    ///
    /// [`SplittableProps`]: crate::props::SplittableProps
    Splittable,
}

/// Module kind discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    /// Static library.
    Library,
    /// Executable.
    Binary,
    /// Generated-source rule.
    GenRule,
    /// Out-of-tree kernel object.
    KernelObject,
    /// Prebuilt library outside the build's control.
    ExternalLib,
    /// Name indirection to another module.
    Alias,
    /// Virtual module holding only property overlays.
    Defaults,
    /// Virtual module supplying a shared installation directory.
    InstallGroup,
}

impl ModuleKind {
    /// All module kinds, in declaration order.
    pub const ALL: &'static [ModuleKind] = &[
        ModuleKind::Library,
        ModuleKind::Binary,
        ModuleKind::GenRule,
        ModuleKind::KernelObject,
        ModuleKind::ExternalLib,
        ModuleKind::Alias,
        ModuleKind::Defaults,
        ModuleKind::InstallGroup,
    ];

    /// Stable lowercase name used in manifests and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ModuleKind::Library => "library",
            ModuleKind::Binary => "binary",
            ModuleKind::GenRule => "genrule",
            ModuleKind::KernelObject => "kernel_object",
            ModuleKind::ExternalLib => "external_lib",
            ModuleKind::Alias => "alias",
            ModuleKind::Defaults => "defaults",
            ModuleKind::InstallGroup => "install_group",
        }
    }

    /// Property groups legal for this kind.
    pub fn supported_groups(self) -> &'static [PropGroupKind] {
        match self {
            ModuleKind::Library | ModuleKind::Binary | ModuleKind::ExternalLib => &[
                PropGroupKind::Common,
                PropGroupKind::Link,
                PropGroupKind::Install,
                PropGroupKind::Splittable,
            ],
            ModuleKind::GenRule => &[PropGroupKind::Common, PropGroupKind::Splittable],
            ModuleKind::KernelObject => &[
                PropGroupKind::Common,
                PropGroupKind::Install,
                PropGroupKind::Kernel,
            ],
            ModuleKind::Alias => &[],
            // Defaults provide overlays for any consumer kind.
            ModuleKind::Defaults => PropGroupKind::ALL,
            ModuleKind::InstallGroup => &[PropGroupKind::Install],
        }
    }

    /// Whether the kind supports the given property group.
    pub fn supports(self, group: PropGroupKind) -> bool {
        self.supported_groups().contains(&group)
    }

    /// How the variant splitter treats the kind.
    pub fn split_mode(self) -> SplitMode {
        match self {
            ModuleKind::Defaults | ModuleKind::Alias | ModuleKind::InstallGroup => SplitMode::Never,
            ModuleKind::KernelObject => SplitMode::TargetOnly,
            ModuleKind::Library
            | ModuleKind::Binary
            | ModuleKind::GenRule
            | ModuleKind::ExternalLib => SplitMode::Splittable,
        }
    }

    /// Whether instances of this kind register in the link-ordering graph.
    pub fn participates_in_ordering(self) -> bool {
        matches!(
            self,
            ModuleKind::Library | ModuleKind::Binary | ModuleKind::ExternalLib
        )
    }

    /// Whether the kind can carry `host`/`target` sections.
    pub fn has_variant_sections(self) -> bool {
        self.split_mode() == SplitMode::Splittable || self == ModuleKind::Defaults
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Tagged relation between two modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepTag {
    /// Static library link.
    Static,
    /// Whole-archive static library link.
    WholeStatic,
    /// Shared library link.
    Shared,
    /// Defaults inheritance.
    DefaultInherit,
    /// Install-group membership.
    InstallGroup,
    /// Alias indirection.
    Alias,
    /// Kernel extra-symbols reference.
    KernelExtraSymbols,
}

impl DepTag {
    /// Whether the tag participates in static-link ordering.
    pub fn orders(self) -> bool {
        matches!(self, DepTag::Static | DepTag::WholeStatic)
    }
}

/// A directed, tagged dependency on another module, by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepEdge {
    /// Relation kind.
    pub tag: DepTag,
    /// Name of the depended-on module.
    pub target: String,
}

impl DepEdge {
    /// Convenience constructor.
    pub fn new(tag: DepTag, target: impl Into<String>) -> Self {
        Self {
            tag,
            target: target.into(),
        }
    }
}

/// One unit of buildable work.
///
/// Created once per declared build module; the variant splitter turns the
/// prototype into zero, one, or two concrete instances, which are then
/// mutated in place by the composition and ordering passes.
#[derive(Debug, Clone, Serialize)]
pub struct Module {
    /// Unique module name.
    pub name: String,
    /// Kind discriminator.
    pub kind: ModuleKind,
    /// Whether the module takes part in the build.
    pub enabled: bool,
    /// Set by reachability analysis outside this core.
    pub required: bool,
    /// Concrete variant tag; `None` until the splitter runs.
    pub variant: Option<Variant>,
    /// Defaults inherited by this module, in declared order.
    pub defaults: Vec<String>,
    /// Live property values.
    pub props: Overlay,
    /// Top-level per-feature overlays. One slot exists for every declared
    /// feature; released after feature application.
    #[serde(skip)]
    pub features: FxHashMap<String, Overlay>,
    /// Declared dependency edges.
    pub deps: Vec<DepEdge>,
    /// Edges inferred by the dependency orderer.
    pub inferred_deps: Vec<DepEdge>,
    /// Canonical static link order of the transitive closure.
    pub resolved_static_libs: Vec<String>,
}

impl Module {
    /// Create an enabled module prototype with empty properties.
    pub fn new(name: impl Into<String>, kind: ModuleKind) -> Self {
        Self {
            name: name.into(),
            kind,
            enabled: true,
            required: false,
            variant: None,
            defaults: Vec::new(),
            props: Overlay::default(),
            features: FxHashMap::default(),
            deps: Vec::new(),
            inferred_deps: Vec::new(),
            resolved_static_libs: Vec::new(),
        }
    }

    /// Mark the module as excluded from all further passes.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Declared dependencies filtered by tag.
    pub fn deps_with_tag(&self, tag: DepTag) -> impl Iterator<Item = &str> {
        self.deps
            .iter()
            .filter(move |e| e.tag == tag)
            .map(|e| e.target.as_str())
    }

    /// Record an inferred edge unless an identical declared or inferred
    /// edge already exists.
    pub fn add_inferred_dep(&mut self, edge: DepEdge) {
        if !self.deps.contains(&edge) && !self.inferred_deps.contains(&edge) {
            self.inferred_deps.push(edge);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_split_modes() {
        assert_eq!(ModuleKind::Library.split_mode(), SplitMode::Splittable);
        assert_eq!(ModuleKind::KernelObject.split_mode(), SplitMode::TargetOnly);
        assert_eq!(ModuleKind::Defaults.split_mode(), SplitMode::Never);
        assert_eq!(ModuleKind::Alias.split_mode(), SplitMode::Never);
    }

    #[test]
    fn test_ordering_participation() {
        assert!(ModuleKind::Library.participates_in_ordering());
        assert!(ModuleKind::Binary.participates_in_ordering());
        assert!(!ModuleKind::GenRule.participates_in_ordering());
        assert!(!ModuleKind::Defaults.participates_in_ordering());
    }

    #[test]
    fn test_inferred_dep_dedup() {
        let mut module = Module::new("libfoo", ModuleKind::Library);
        module.deps.push(DepEdge::new(DepTag::Static, "libbar"));

        module.add_inferred_dep(DepEdge::new(DepTag::Static, "libbar"));
        assert!(module.inferred_deps.is_empty());

        module.add_inferred_dep(DepEdge::new(DepTag::Static, "libbaz"));
        module.add_inferred_dep(DepEdge::new(DepTag::Static, "libbaz"));
        assert_eq!(module.inferred_deps.len(), 1);
    }

    #[test]
    fn test_deps_with_tag_filters() {
        let mut module = Module::new("app", ModuleKind::Binary);
        module.deps.push(DepEdge::new(DepTag::Static, "liba"));
        module.deps.push(DepEdge::new(DepTag::Shared, "libs"));
        module.deps.push(DepEdge::new(DepTag::Static, "libb"));

        let statics: Vec<&str> = module.deps_with_tag(DepTag::Static).collect();
        assert_eq!(statics, vec!["liba", "libb"]);
    }
}
