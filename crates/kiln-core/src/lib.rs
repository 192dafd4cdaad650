//! Kiln module model
//!
//! Core data types shared by the resolution pipeline:
//! - Build modules, module kinds, and target variants
//! - Typed property groups with explicit merge disciplines
//! - The overlay union used by defaults and feature application
//! - The global feature registry
//! - The error taxonomy (configuration, graph integrity, internal)

#![warn(missing_docs)]

pub mod error;
pub mod features;
pub mod module;
pub mod overlay;
pub mod props;
pub mod set;

pub use error::{ConfigError, GraphError, InternalError};
pub use features::FeatureRegistry;
pub use module::{DepEdge, DepTag, Module, ModuleKind, Variant};
pub use overlay::{Overlay, PropGroupKind, SectionOverlay, VariantSection};
pub use props::{
    Apply, CommonProps, Discipline, InstallProps, KernelProps, LinkProps, SplittableProps,
};
pub use set::ModuleSet;
