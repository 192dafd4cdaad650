//! Pass pipeline
//!
//! Drives the resolution passes over the whole module set, in order:
//!
//! 1. `compose_defaults` - bottom-up over defaults inheritance
//! 2. `apply_features` - per module, in global feature order
//! 3. `split_variants` - prototypes become concrete instances
//! 4. `apply_target_specific` - per concrete instance
//! 5. `materialize_edges` - property lists become tagged edges
//! 6. `order_deps` - bottom-up over static-link edges, per variant
//!
//! Passes run single-threaded; the bottom-up schedules are computed
//! explicitly so a module is never visited before its dependencies.

use std::collections::VecDeque;

use serde::Serialize;

use kiln_core::{
    ConfigError, DepEdge, DepTag, FeatureRegistry, GraphError, Module, ModuleKind, ModuleSet,
    Variant,
};

use crate::compose;
use crate::error::ResolveError;
use crate::order::DepOrderer;
use crate::split;

/// Compute a bottom-up visiting order: every dependency index returned
/// by `deps_of` is visited before its dependent.
///
/// With `strict`, a cycle is a fatal error naming one involved module.
/// Otherwise modules stuck on a cycle are appended in index order so a
/// later pass can report the cycle in context.
fn bottom_up_schedule(
    set: &ModuleSet,
    deps_of: impl Fn(&ModuleSet, usize) -> Vec<usize>,
    strict: bool,
) -> Result<Vec<usize>, GraphError> {
    let n = set.len();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut blocked_by = vec![0usize; n];
    for index in 0..n {
        let mut deps = deps_of(set, index);
        deps.sort_unstable();
        deps.dedup();
        for dep in deps {
            if dep != index {
                dependents[dep].push(index);
                blocked_by[index] += 1;
            }
        }
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| blocked_by[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    let mut emitted = vec![false; n];
    while let Some(index) = queue.pop_front() {
        order.push(index);
        emitted[index] = true;
        for &next in &dependents[index] {
            blocked_by[next] -= 1;
            if blocked_by[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() != n {
        if strict {
            if let Some(stuck) = (0..n).find(|&i| !emitted[i]) {
                return Err(GraphError::DependencyCycle {
                    module: set.module(stuck).name.clone(),
                });
            }
        }
        order.extend((0..n).filter(|&i| !emitted[i]));
    }
    Ok(order)
}

fn defaults_dep_indices(set: &ModuleSet, index: usize) -> Vec<usize> {
    let module = set.module(index);
    let mut deps = Vec::new();
    for name in &module.defaults {
        deps.extend_from_slice(set.instances(name));
    }
    deps
}

fn link_dep_indices(set: &ModuleSet, index: usize) -> Vec<usize> {
    let module = set.module(index);
    let Some(variant) = module.variant else {
        return Vec::new();
    };
    if !module.enabled {
        return Vec::new();
    }
    let mut deps = Vec::new();
    for name in module
        .props
        .link
        .static_libs
        .iter()
        .chain(module.props.link.whole_static_libs.iter())
    {
        let Ok(resolved) = set.resolve_alias(name) else {
            continue;
        };
        for &i in set.instances(resolved) {
            if set.module(i).variant == Some(variant) {
                deps.push(i);
            }
        }
    }
    deps
}

/// Turn composed property lists into tagged dependency edges, validating
/// the references that have kind requirements.
fn materialize_edges(set: &mut ModuleSet) -> Result<(), ResolveError> {
    for index in 0..set.len() {
        let module = set.module(index);
        if !module.enabled {
            continue;
        }
        let name = module.name.clone();
        let mut edges = Vec::new();
        for lib in &module.props.link.static_libs {
            edges.push(DepEdge::new(DepTag::Static, lib.clone()));
        }
        for lib in &module.props.link.whole_static_libs {
            edges.push(DepEdge::new(DepTag::WholeStatic, lib.clone()));
        }
        for lib in &module.props.link.shared_libs {
            edges.push(DepEdge::new(DepTag::Shared, lib.clone()));
        }
        if let Some(group) = &module.props.install.install_group {
            match set.get(group) {
                Some(m) if m.kind == ModuleKind::InstallGroup && m.enabled => {
                    edges.push(DepEdge::new(DepTag::InstallGroup, group.clone()));
                }
                Some(_) => {
                    return Err(ConfigError::NotAnInstallGroup {
                        module: name,
                        dependency: group.clone(),
                    }
                    .into())
                }
                None => {
                    return Err(ConfigError::MissingDependency {
                        module: name,
                        dependency: group.clone(),
                    }
                    .into())
                }
            }
        }
        for symbols in &module.props.kernel.extra_symbols {
            if set.get(symbols).map(|m| m.enabled) != Some(true) {
                return Err(ConfigError::MissingDependency {
                    module: name,
                    dependency: symbols.clone(),
                }
                .into());
            }
            edges.push(DepEdge::new(DepTag::KernelExtraSymbols, symbols.clone()));
        }

        let module = set.module_mut(index);
        for edge in edges {
            if !module.deps.contains(&edge) {
                module.deps.push(edge);
            }
        }
    }
    Ok(())
}

/// The resolution pipeline.
pub struct Resolver {
    set: ModuleSet,
    features: FeatureRegistry,
}

impl Resolver {
    /// Create a resolver over a set of module prototypes.
    ///
    /// Validates the per-kind overlay shapes and seeds defaults
    /// inheritance edges from each module's declared defaults list.
    pub fn new(mut set: ModuleSet, features: FeatureRegistry) -> Result<Self, ResolveError> {
        kiln_core::overlay::validate_shapes()?;
        for module in set.iter_mut() {
            for name in module.defaults.clone() {
                let edge = DepEdge::new(DepTag::DefaultInherit, name);
                if !module.deps.contains(&edge) {
                    module.deps.push(edge);
                }
            }
        }
        Ok(Self { set, features })
    }

    /// Run every pass and produce the resolved module set.
    pub fn resolve(mut self) -> Result<Resolution, ResolveError> {
        // Defaults compose bottom-up so a defaults module that itself
        // inherits defaults is complete before its consumers read it.
        let schedule = bottom_up_schedule(&self.set, defaults_dep_indices, true)?;
        for index in schedule {
            compose::compose_defaults(&mut self.set, index)?;
        }

        for module in self.set.iter_mut() {
            compose::apply_features(module, &self.features);
            if module.props.common.enabled == Some(false) {
                module.disable();
            }
        }

        let prototypes = std::mem::take(&mut self.set);
        self.set = split::split_modules(prototypes)?;

        for index in 0..self.set.len() {
            let module = self.set.module(index);
            if module.enabled && module.variant.is_some() {
                compose::apply_target_specific(self.set.module_mut(index))?;
            }
        }

        materialize_edges(&mut self.set)?;

        // Ordering is strictly bottom-up; modules caught in a link cycle
        // are visited last so the orderer reports the cycle itself.
        let schedule = bottom_up_schedule(&self.set, link_dep_indices, false)?;
        let mut orderer = DepOrderer::new();
        for index in schedule {
            orderer.order_module(&mut self.set, index)?;
        }

        Ok(Resolution {
            set: self.set,
            features: self.features,
        })
    }
}

/// Output of a completed resolution.
#[derive(Debug)]
pub struct Resolution {
    set: ModuleSet,
    features: FeatureRegistry,
}

impl Resolution {
    /// Every module instance, disabled ones included.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.set.iter()
    }

    /// Enabled concrete instances, the ones a backend emits rules for.
    pub fn buildable_modules(&self) -> impl Iterator<Item = &Module> {
        self.set
            .iter()
            .filter(|m| m.enabled && m.variant.is_some())
    }

    /// First instance with the given name.
    pub fn get(&self, name: &str) -> Option<&Module> {
        self.set.get(name)
    }

    /// The concrete instance of `name` for `variant`.
    pub fn get_variant(&self, name: &str, variant: Variant) -> Option<&Module> {
        self.set.get_variant(name, variant)
    }

    /// The feature registry the resolution ran with.
    pub fn features(&self) -> &FeatureRegistry {
        &self.features
    }

    /// Serializable view of every module instance.
    pub fn summary(&self) -> ResolutionSummary<'_> {
        ResolutionSummary {
            modules: self.set.iter().collect(),
        }
    }
}

/// Machine-readable resolution dump.
#[derive(Serialize)]
pub struct ResolutionSummary<'a> {
    /// All module instances, in set order.
    pub modules: Vec<&'a Module>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn no_features() -> FeatureRegistry {
        FeatureRegistry::new(Vec::new(), Vec::new()).unwrap()
    }

    fn target_lib(name: &str, static_libs: &[&str]) -> Module {
        let mut module = Module::new(name, ModuleKind::Library);
        module.props.link.static_libs = list(static_libs);
        module
    }

    #[test]
    fn test_pipeline_orders_regardless_of_declaration_order() {
        // Consumers declared before their dependencies still resolve.
        let set = ModuleSet::from_modules(vec![
            target_lib("liba", &["libb", "libc"]),
            target_lib("libb", &["libd"]),
            target_lib("libc", &[]),
            target_lib("libd", &[]),
        ])
        .unwrap();
        let resolution = Resolver::new(set, no_features()).unwrap().resolve().unwrap();

        let liba = resolution.get_variant("liba", Variant::Target).unwrap();
        assert_eq!(liba.resolved_static_libs, list(&["libd", "libb", "libc"]));
    }

    #[test]
    fn test_static_cycle_fails_resolution() {
        let set = ModuleSet::from_modules(vec![
            target_lib("liba", &["libb"]),
            target_lib("libb", &["liba"]),
        ])
        .unwrap();
        let err = Resolver::new(set, no_features()).unwrap().resolve().unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Graph(GraphError::StaticCycle { .. })
        ));
    }

    #[test]
    fn test_defaults_cycle_fails_resolution() {
        let mut a = Module::new("a-defaults", ModuleKind::Defaults);
        a.defaults = list(&["b-defaults"]);
        let mut b = Module::new("b-defaults", ModuleKind::Defaults);
        b.defaults = list(&["a-defaults"]);

        let set = ModuleSet::from_modules(vec![a, b]).unwrap();
        let err = Resolver::new(set, no_features()).unwrap().resolve().unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Graph(GraphError::DependencyCycle { .. })
        ));
    }

    #[test]
    fn test_unsupported_module_is_excluded_everywhere() {
        let mut excluded = target_lib("libgone", &[]);
        excluded.props.splittable.host_supported = Some(false);
        excluded.props.splittable.target_supported = Some(false);

        let set = ModuleSet::from_modules(vec![excluded]).unwrap();
        let resolution = Resolver::new(set, no_features()).unwrap().resolve().unwrap();
        assert_eq!(resolution.buildable_modules().count(), 0);
        assert!(!resolution.get("libgone").unwrap().enabled);
    }

    #[test]
    fn test_consumer_of_unsupported_module_fails() {
        let mut gone = target_lib("libgone", &[]);
        gone.props.splittable.target_supported = Some(false);

        let set =
            ModuleSet::from_modules(vec![gone, target_lib("liba", &["libgone"])]).unwrap();
        let err = Resolver::new(set, no_features()).unwrap().resolve().unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Config(ConfigError::MissingDependency { .. })
        ));
    }

    #[test]
    fn test_enabled_false_from_defaults_disables_module() {
        let mut defaults = Module::new("off-by-default", ModuleKind::Defaults);
        defaults.props.common.enabled = Some(false);
        let mut lib = target_lib("liba", &[]);
        lib.defaults = list(&["off-by-default"]);

        let set = ModuleSet::from_modules(vec![defaults, lib]).unwrap();
        let resolution = Resolver::new(set, no_features()).unwrap().resolve().unwrap();
        assert!(!resolution.get("liba").unwrap().enabled);
    }

    #[test]
    fn test_dual_variant_instances_resolve_independently() {
        let mut lib = target_lib("libboth", &[]);
        lib.props.splittable.host_supported = Some(true);
        lib.props.host.props.cflags = list(&["-DHOST"]);
        lib.props.target.props.cflags = list(&["-DTARGET"]);

        let set = ModuleSet::from_modules(vec![lib]).unwrap();
        let resolution = Resolver::new(set, no_features()).unwrap().resolve().unwrap();

        let host = resolution.get_variant("libboth", Variant::Host).unwrap();
        let target = resolution.get_variant("libboth", Variant::Target).unwrap();
        assert_eq!(host.props.common.cflags, list(&["-DHOST"]));
        assert_eq!(target.props.common.cflags, list(&["-DTARGET"]));
    }

    #[test]
    fn test_install_group_reference_is_validated() {
        let mut lib = target_lib("liba", &[]);
        lib.props.install.install_group = Some("not-a-group".to_string());

        let set =
            ModuleSet::from_modules(vec![lib, target_lib("not-a-group", &[])]).unwrap();
        let err = Resolver::new(set, no_features()).unwrap().resolve().unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Config(ConfigError::NotAnInstallGroup { .. })
        ));
    }

    #[test]
    fn test_materialized_edges_carry_tags() {
        let mut lib = target_lib("liba", &["libb"]);
        lib.props.link.shared_libs = list(&["libshared"]);

        let set = ModuleSet::from_modules(vec![
            lib,
            target_lib("libb", &[]),
            target_lib("libshared", &[]),
        ])
        .unwrap();
        let resolution = Resolver::new(set, no_features()).unwrap().resolve().unwrap();
        let liba = resolution.get_variant("liba", Variant::Target).unwrap();
        assert!(liba.deps.contains(&DepEdge::new(DepTag::Static, "libb")));
        assert!(liba
            .deps
            .contains(&DepEdge::new(DepTag::Shared, "libshared")));
    }
}
