//! Resolution error wrapper

use thiserror::Error;

use kiln_core::{ConfigError, GraphError, InternalError};

/// Any fatal error raised during resolution.
///
/// There is no recovery path: the first error terminates the whole
/// resolution pass.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolveError {
    /// Bad build configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Violated graph relationship.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Core bug.
    #[error(transparent)]
    Internal(#[from] InternalError),
}
