//! Kiln resolution pipeline
//!
//! Turns a set of module prototypes into fully resolved per-variant
//! instances:
//! - Defaults, feature, and target-section overlays are composed into
//!   each module's live properties
//! - Splittable modules become host/target concrete instances
//! - Each consumer's static-link closure is ordered deterministically,
//!   with inferred dependency edges registered back onto the module
//!
//! The [`Resolver`] drives these as named passes in a fixed order; every
//! error is fatal and aborts the whole resolution.

mod compose;
mod error;
mod graph;
mod order;
mod pipeline;
mod split;

pub use compose::{apply_features, apply_target_specific, compose_defaults};
pub use error::ResolveError;
pub use graph::{EdgeColor, OrderingGraph, FAN_IN_WEIGHT};
pub use order::DepOrderer;
pub use pipeline::{Resolution, ResolutionSummary, Resolver};
pub use split::{split_modules, supported_variants};
