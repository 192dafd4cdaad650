//! Variant splitter
//!
//! Expands each splittable prototype into concrete host/target instances
//! according to its composed [`SplittableProps`], or disables it when it
//! supports neither variant. Runs strictly after defaults composition and
//! strictly before dependency ordering.
//!
//! [`SplittableProps`]: kiln_core::SplittableProps

use kiln_core::module::SplitMode;
use kiln_core::{InternalError, Module, ModuleSet, Variant};

use crate::error::ResolveError;

/// Variants a module supports, derived from its composed properties.
///
/// Virtual kinds support none; single-variant kinds are pinned to their
/// variant regardless of properties.
pub fn supported_variants(module: &Module) -> Vec<Variant> {
    match module.kind.split_mode() {
        SplitMode::Never => Vec::new(),
        SplitMode::TargetOnly => vec![Variant::Target],
        SplitMode::Splittable => {
            let mut variants = Vec::new();
            if module.props.splittable.host() {
                variants.push(Variant::Host);
            }
            if module.props.splittable.target() {
                variants.push(Variant::Target);
            }
            variants
        }
    }
}

/// Split every module in the set into its concrete variant instances.
///
/// - no supported variant: the module is disabled and excluded from all
///   later passes (not an error)
/// - one variant: the module is tagged in place
/// - two variants: the prototype is cloned into independent host and
///   target instances sharing the declared properties at split time
pub fn split_modules(set: ModuleSet) -> Result<ModuleSet, ResolveError> {
    let mut out = Vec::new();
    for mut module in set.into_modules() {
        if module.kind.split_mode() == SplitMode::Never || !module.enabled {
            out.push(module);
            continue;
        }
        let variants = supported_variants(&module);
        match variants.as_slice() {
            [] => {
                // A kind pinned to one variant can never compute an empty
                // set; reaching this arm for one is a core bug.
                if module.kind.split_mode() != SplitMode::Splittable {
                    return Err(InternalError::SingleVariantDisabled {
                        module: module.name,
                    }
                    .into());
                }
                module.disable();
                out.push(module);
            }
            [only] => {
                module.variant = Some(*only);
                out.push(module);
            }
            [first, second] => {
                let mut twin = module.clone();
                module.variant = Some(*first);
                twin.variant = Some(*second);
                out.push(module);
                out.push(twin);
            }
            _ => unreachable!("at most two variants exist"),
        }
    }
    ModuleSet::from_modules(out).map_err(ResolveError::from)
}
