//! Module set: ownership and lookup for all module instances
//!
//! Holds prototypes before the variant split and concrete instances after
//! it. A name maps to one prototype, or to one or two concrete instances
//! once splitting has run; lookups that care about flavor go through
//! [`ModuleSet::get_variant`].

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{ConfigError, GraphError};
use crate::module::{DepTag, Module, ModuleKind, Variant};

/// Owner of every module instance in the build.
#[derive(Debug, Default, Clone)]
pub struct ModuleSet {
    modules: Vec<Module>,
    by_name: FxHashMap<String, Vec<usize>>,
}

impl ModuleSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from a list of modules.
    ///
    /// Two entries may share a name only when they carry distinct variant
    /// tags (the result of a dual split).
    pub fn from_modules(modules: Vec<Module>) -> Result<Self, ConfigError> {
        let mut set = Self::new();
        for module in modules {
            set.add(module)?;
        }
        Ok(set)
    }

    /// Insert a module, rejecting a duplicate (name, variant) pair.
    pub fn add(&mut self, module: Module) -> Result<(), ConfigError> {
        if let Some(indices) = self.by_name.get(&module.name) {
            if indices
                .iter()
                .any(|&i| self.modules[i].variant == module.variant)
            {
                return Err(ConfigError::DuplicateModule {
                    name: module.name.clone(),
                });
            }
        }
        let index = self.modules.len();
        self.by_name
            .entry(module.name.clone())
            .or_default()
            .push(index);
        self.modules.push(module);
        Ok(())
    }

    /// Number of module instances.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the set holds no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// All instances, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    /// Mutable access to all instances, in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Module> {
        self.modules.iter_mut()
    }

    /// Indices of every instance with the given name.
    pub fn instances(&self, name: &str) -> &[usize] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The instance at `index`.
    pub fn module(&self, index: usize) -> &Module {
        &self.modules[index]
    }

    /// Mutable access to the instance at `index`.
    pub fn module_mut(&mut self, index: usize) -> &mut Module {
        &mut self.modules[index]
    }

    /// First instance with the given name, if any.
    pub fn get(&self, name: &str) -> Option<&Module> {
        self.instances(name).first().map(|&i| &self.modules[i])
    }

    /// The concrete instance of `name` for `variant`.
    ///
    /// A module that was not split (single-variant kinds, virtual kinds)
    /// matches only its own tag; an untagged module matches nothing.
    pub fn get_variant(&self, name: &str, variant: Variant) -> Option<&Module> {
        self.instances(name)
            .iter()
            .map(|&i| &self.modules[i])
            .find(|m| m.variant == Some(variant))
    }

    /// Consume the set, returning the modules in insertion order.
    ///
    /// Used by the variant splitter to rebuild the set with concrete
    /// instances in place of prototypes.
    pub fn into_modules(self) -> Vec<Module> {
        self.modules
    }

    /// Follow alias indirection until a non-alias name is reached.
    ///
    /// Returns the final name; a chain that revisits an alias is a fatal
    /// graph error. Names that do not resolve to any module are returned
    /// as-is so the caller can report the missing dependency in context.
    pub fn resolve_alias<'a>(&'a self, name: &'a str) -> Result<&'a str, GraphError> {
        let mut current = name;
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        while let Some(module) = self.get(current) {
            if module.kind != ModuleKind::Alias {
                return Ok(current);
            }
            if !seen.insert(current) {
                return Err(GraphError::AliasCycle {
                    module: name.to_string(),
                });
            }
            match module.deps_with_tag(DepTag::Alias).next() {
                Some(target) => current = target,
                None => return Ok(current),
            }
        }
        Ok(current)
    }
}
