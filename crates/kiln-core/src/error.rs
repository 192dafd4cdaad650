//! Error taxonomy for the resolution core
//!
//! Three classes, none recoverable: configuration errors are bad input,
//! graph integrity errors are violated relationships between modules, and
//! internal errors indicate a bug in the core itself. Any of them aborts
//! the whole resolution.

use thiserror::Error;

/// User-facing configuration errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A static-link dependency is missing or disabled.
    #[error("{module} depends on {dependency}, but {dependency} is either not defined or disabled")]
    MissingDependency {
        /// The consuming module.
        module: String,
        /// The missing or disabled dependency.
        dependency: String,
    },

    /// A defaults reference resolves to a module that is not a defaults
    /// group.
    #[error("{module} inherits defaults from {dependency}, which is not a defaults module")]
    NotADefaults {
        /// The inheriting module.
        module: String,
        /// The non-defaults dependency.
        dependency: String,
    },

    /// Inherited defaults provide a property group the consuming module's
    /// kind does not declare.
    #[error("property type \"{group}\" from inherited defaults not found on {kind} module {module}")]
    PropertyTypeNotFound {
        /// The consuming module.
        module: String,
        /// The consuming module's kind.
        kind: String,
        /// The offending property group.
        group: String,
    },

    /// A feature name is not in the global declaration list.
    #[error("unknown feature \"{feature}\" referenced by {module}")]
    UnknownFeature {
        /// The referencing module.
        module: String,
        /// The undeclared feature name.
        feature: String,
    },

    /// An install-group reference resolves to a module of another kind.
    #[error("{module} names install group {dependency}, which is not an install_group module")]
    NotAnInstallGroup {
        /// The referencing module.
        module: String,
        /// The non-install-group dependency.
        dependency: String,
    },

    /// A module name is declared more than once.
    #[error("duplicate module name: {name}")]
    DuplicateModule {
        /// The duplicated name.
        name: String,
    },
}

/// Fatal violations of graph relationships.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    /// Cycle in a module's static-link subgraph.
    #[error("cycle detected in the static link dependencies of {root}")]
    StaticCycle {
        /// The module whose closure contains the cycle.
        root: String,
    },

    /// Cycle among module dependency edges at pass-scheduling time.
    #[error("dependency cycle detected involving {module}")]
    DependencyCycle {
        /// A module on the cycle.
        module: String,
    },

    /// Alias chain that never reaches a concrete module.
    #[error("alias {module} never resolves to a concrete module")]
    AliasCycle {
        /// The alias at the head of the chain.
        module: String,
    },
}

/// Errors indicating a bug in the core rather than bad input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InternalError {
    /// A module reached the ordering pass without a variant tag.
    #[error("internal error: {module} has no resolved variant at ordering time")]
    UnresolvedVariant {
        /// The untagged module.
        module: String,
    },

    /// Two property groups coalesced for one kind claim the same field.
    #[error("internal error: duplicate field \"{field}\" in the overlay shape of kind {kind}")]
    FieldCollision {
        /// The module kind whose shape collided.
        kind: String,
        /// The duplicated field name.
        field: String,
    },

    /// The splitter disabled a kind that always has exactly one variant.
    #[error("internal error: single-variant module {module} computed an empty variant set")]
    SingleVariantDisabled {
        /// The offending module.
        module: String,
    },
}
