//! Dependency graph orderer
//!
//! Computes, per concrete module, the canonical build order of its
//! transitive static-link closure, and registers the dependency edges
//! that ordering uncovers (transitively pulled static libraries and
//! shared libraries carried by closure members).
//!
//! Must run strictly bottom-up: a module's dependencies commit their own
//! subgraph contributions into the shared per-variant graph before the
//! module itself is visited.

use rustc_hash::FxHashSet;

use kiln_core::{ConfigError, DepEdge, DepTag, InternalError, ModuleSet, Variant};

use crate::error::ResolveError;
use crate::graph::{EdgeColor, OrderingGraph};

/// Owner of the two per-variant ordering graphs.
#[derive(Debug, Default)]
pub struct DepOrderer {
    host: OrderingGraph,
    target: OrderingGraph,
}

fn resolve_dep(
    set: &ModuleSet,
    consumer: &str,
    variant: Variant,
    dep: &str,
) -> Result<String, ResolveError> {
    let resolved = set.resolve_alias(dep)?;
    match set.get_variant(resolved, variant) {
        Some(m) if m.enabled => Ok(resolved.to_string()),
        _ => Err(ConfigError::MissingDependency {
            module: consumer.to_string(),
            dependency: dep.to_string(),
        }
        .into()),
    }
}

impl DepOrderer {
    /// Create an orderer with two empty graphs.
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared graph for `variant`.
    pub fn graph(&self, variant: Variant) -> &OrderingGraph {
        match variant {
            Variant::Host => &self.host,
            Variant::Target => &self.target,
        }
    }

    fn graph_mut(&mut self, variant: Variant) -> &mut OrderingGraph {
        match variant {
            Variant::Host => &mut self.host,
            Variant::Target => &mut self.target,
        }
    }

    /// Order the static-link closure of the module at `index`.
    ///
    /// Writes `resolved_static_libs` and the inferred dependency edges
    /// onto the module. Non-linking and disabled modules are skipped.
    pub fn order_module(
        &mut self,
        set: &mut ModuleSet,
        index: usize,
    ) -> Result<(), ResolveError> {
        let module = set.module(index);
        if !module.enabled || !module.kind.participates_in_ordering() {
            return Ok(());
        }
        let name = module.name.clone();
        let variant = module
            .variant
            .ok_or_else(|| InternalError::UnresolvedVariant {
                module: name.clone(),
            })?;
        let static_declared = module.props.link.static_libs.clone();
        let whole_declared = module.props.link.whole_static_libs.clone();
        let own_shared = module.props.link.shared_libs.clone();

        let mut static_resolved = Vec::with_capacity(static_declared.len());
        for dep in &static_declared {
            static_resolved.push(resolve_dep(set, &name, variant, dep)?);
        }
        let mut whole_resolved = Vec::with_capacity(whole_declared.len());
        for dep in &whole_declared {
            whole_resolved.push(resolve_dep(set, &name, variant, dep)?);
        }

        let graph = self.graph_mut(variant);
        let root = graph.ensure_node(&name);
        let mut static_nodes = Vec::with_capacity(static_resolved.len());
        for lib in &static_resolved {
            let node = graph.ensure_node(lib);
            graph.add_edge(root, node, EdgeColor::Static);
            static_nodes.push(node);
        }
        for lib in &whole_resolved {
            let node = graph.ensure_node(lib);
            graph.add_edge(root, node, EdgeColor::WholeStatic);
        }

        // Preserve the declared order between sibling static libs unless
        // a path in the shared graph already relates them (the
        // transitive path wins and no redundant edge is added).
        // Adjacent pairs go first so a chain covers the wider pairs.
        let mut temp = Vec::new();
        for gap in 1..static_nodes.len() {
            for i in 0..static_nodes.len() - gap {
                let (a, b) = (static_nodes[i], static_nodes[i + gap]);
                if a == b || graph.has_path(a, b) || graph.has_path(b, a) {
                    continue;
                }
                graph.add_edge(a, b, EdgeColor::DeclaredOrder);
                temp.push((a, b, EdgeColor::DeclaredOrder));
            }
        }

        let closure = graph.extract_closure(root);
        graph.remove_edges(&temp);
        let resolved = closure.sort(&name)?;

        // Libraries pulled in only transitively become inferred static
        // edges; shared requirements carried by closure members are
        // inherited as inferred shared edges.
        let known: FxHashSet<&String> = static_resolved
            .iter()
            .chain(whole_resolved.iter())
            .collect();
        let extras: Vec<String> = resolved
            .iter()
            .filter(|lib| !known.contains(lib))
            .cloned()
            .collect();

        let mut inherited_shared = Vec::new();
        for lib in &resolved {
            if let Some(dep) = set.get_variant(lib, variant) {
                for shared in &dep.props.link.shared_libs {
                    if !own_shared.contains(shared) && !inherited_shared.contains(shared) {
                        inherited_shared.push(shared.clone());
                    }
                }
            }
        }

        let module = set.module_mut(index);
        module.resolved_static_libs = resolved;
        for extra in extras {
            module.add_inferred_dep(DepEdge::new(DepTag::Static, extra));
        }
        for shared in inherited_shared {
            module.add_inferred_dep(DepEdge::new(DepTag::Shared, shared));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::{Module, ModuleKind};

    fn target_lib(name: &str, static_libs: &[&str]) -> Module {
        let mut module = Module::new(name, ModuleKind::Library);
        module.variant = Some(Variant::Target);
        module.props.link.static_libs = static_libs.iter().map(|s| s.to_string()).collect();
        module
    }

    fn order_all(set: &mut ModuleSet, names: &[&str]) -> Result<(), ResolveError> {
        let mut orderer = DepOrderer::new();
        for name in names {
            let index = set.instances(name)[0];
            orderer.order_module(set, index)?;
        }
        Ok(())
    }

    #[test]
    fn test_transitive_closure_is_ordered_dependencies_first() {
        let mut set = ModuleSet::from_modules(vec![
            target_lib("libd", &[]),
            target_lib("libb", &["libd"]),
            target_lib("libc", &[]),
            target_lib("liba", &["libb", "libc"]),
        ])
        .unwrap();
        order_all(&mut set, &["libd", "libb", "libc", "liba"]).unwrap();

        let liba = set.get("liba").unwrap();
        assert_eq!(
            liba.resolved_static_libs,
            vec!["libd".to_string(), "libb".to_string(), "libc".to_string()]
        );
        // libd was pulled in only transitively.
        assert_eq!(
            liba.inferred_deps,
            vec![DepEdge::new(DepTag::Static, "libd")]
        );
    }

    #[test]
    fn test_missing_static_dep_is_fatal() {
        let mut set =
            ModuleSet::from_modules(vec![target_lib("liba", &["libmissing"])]).unwrap();
        let err = order_all(&mut set, &["liba"]).unwrap_err();
        assert_eq!(
            err,
            ResolveError::Config(ConfigError::MissingDependency {
                module: "liba".to_string(),
                dependency: "libmissing".to_string(),
            })
        );
    }

    #[test]
    fn test_disabled_static_dep_is_fatal() {
        let mut libb = target_lib("libb", &[]);
        libb.disable();
        let mut set =
            ModuleSet::from_modules(vec![libb, target_lib("liba", &["libb"])]).unwrap();
        let err = order_all(&mut set, &["liba"]).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Config(ConfigError::MissingDependency { .. })
        ));
    }

    #[test]
    fn test_untagged_module_is_an_internal_error() {
        let mut module = Module::new("liba", ModuleKind::Library);
        module.props.link.static_libs.push("libb".to_string());
        let mut set = ModuleSet::from_modules(vec![module]).unwrap();
        let err = order_all(&mut set, &["liba"]).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Internal(InternalError::UnresolvedVariant { .. })
        ));
    }

    #[test]
    fn test_cycle_aborts_without_emitting_an_order() {
        let mut set = ModuleSet::from_modules(vec![
            target_lib("liba", &["libb"]),
            target_lib("libb", &["liba"]),
        ])
        .unwrap();
        // Bottom-up scheduling cannot help a cycle; the second visit
        // sees the full loop.
        order_all(&mut set, &["liba", "libb"]).unwrap_err();
        assert!(set.get("libb").unwrap().resolved_static_libs.is_empty());
    }

    #[test]
    fn test_declared_order_constraints_do_not_leak_between_modules() {
        let mut set = ModuleSet::from_modules(vec![
            target_lib("libb", &[]),
            target_lib("libc", &[]),
            target_lib("liba", &["libb", "libc"]),
            target_lib("libz", &["libc", "libb"]),
        ])
        .unwrap();
        order_all(&mut set, &["libb", "libc", "liba", "libz"]).unwrap();

        // Each consumer keeps its own declared order; liba's temporary
        // constraint must not force libz's.
        assert_eq!(
            set.get("liba").unwrap().resolved_static_libs,
            vec!["libb".to_string(), "libc".to_string()]
        );
        assert_eq!(
            set.get("libz").unwrap().resolved_static_libs,
            vec!["libc".to_string(), "libb".to_string()]
        );
    }

    #[test]
    fn test_transitive_path_wins_over_declared_order() {
        // liba declares [libb, libc] but libc is also a dependency of
        // libb; the path orders libc first and no constraint fights it.
        let mut set = ModuleSet::from_modules(vec![
            target_lib("libc", &[]),
            target_lib("libb", &["libc"]),
            target_lib("liba", &["libb", "libc"]),
        ])
        .unwrap();
        order_all(&mut set, &["libc", "libb", "liba"]).unwrap();
        assert_eq!(
            set.get("liba").unwrap().resolved_static_libs,
            vec!["libc".to_string(), "libb".to_string()]
        );
    }

    #[test]
    fn test_shared_libs_of_closure_members_are_inherited() {
        let mut libb = target_lib("libb", &[]);
        libb.props.link.shared_libs.push("libdl".to_string());
        let mut set =
            ModuleSet::from_modules(vec![libb, target_lib("liba", &["libb"])]).unwrap();
        order_all(&mut set, &["libb", "liba"]).unwrap();

        let liba = set.get("liba").unwrap();
        assert!(liba
            .inferred_deps
            .contains(&DepEdge::new(DepTag::Shared, "libdl")));
    }

    #[test]
    fn test_host_and_target_graphs_never_mix() {
        let mut host_lib = Module::new("libx", ModuleKind::Library);
        host_lib.variant = Some(Variant::Host);

        // liba targets the device; the host-only libx must not satisfy
        // its dependency.
        let mut set =
            ModuleSet::from_modules(vec![host_lib, target_lib("liba", &["libx"])]).unwrap();
        let err = order_all(&mut set, &["libx", "liba"]).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Config(ConfigError::MissingDependency { .. })
        ));
    }

    #[test]
    fn test_static_deps_resolve_through_aliases() {
        let mut alias = Module::new("libold", ModuleKind::Alias);
        alias.deps.push(DepEdge::new(DepTag::Alias, "libnew"));
        let mut set = ModuleSet::from_modules(vec![
            alias,
            target_lib("libnew", &[]),
            target_lib("liba", &["libold"]),
        ])
        .unwrap();
        order_all(&mut set, &["libnew", "liba"]).unwrap();
        assert_eq!(
            set.get("liba").unwrap().resolved_static_libs,
            vec!["libnew".to_string()]
        );
    }

    #[test]
    fn test_whole_static_members_do_not_become_extras() {
        let mut liba = target_lib("liba", &[]);
        liba.props.link.whole_static_libs.push("libw".to_string());
        let mut set = ModuleSet::from_modules(vec![target_lib("libw", &[]), liba]).unwrap();
        order_all(&mut set, &["libw", "liba"]).unwrap();

        let liba = set.get("liba").unwrap();
        assert_eq!(liba.resolved_static_libs, vec!["libw".to_string()]);
        assert!(liba.inferred_deps.is_empty());
    }
}
