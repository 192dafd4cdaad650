//! Property composition engine
//!
//! Three stages, always in this order per module: inherited defaults are
//! merged beneath the module's own values, enabled feature overlays are
//! applied on top, and finally the variant-specific section is folded in
//! once the module has a concrete variant tag.

use rustc_hash::FxHashMap;

use kiln_core::props::{merge_list, Discipline};
use kiln_core::{
    Apply, ConfigError, FeatureRegistry, InternalError, Module, ModuleKind, ModuleSet, Overlay,
    Variant,
};

use crate::error::ResolveError;

/// Merge all inherited defaults into the module at `index`.
///
/// Defaults are gathered in declared order and accumulated among
/// themselves first (a later sibling overlays an earlier one), then the
/// accumulator is merged beneath the module so its own explicit values
/// keep precedence. The defaults' per-feature overlay tables accumulate
/// the same way and land beneath the module's own feature overlays.
pub fn compose_defaults(set: &mut ModuleSet, index: usize) -> Result<(), ResolveError> {
    let module = set.module(index);
    if module.defaults.is_empty() {
        return Ok(());
    }
    let name = module.name.clone();
    let kind = module.kind;
    let defaults = module.defaults.clone();

    let mut acc = Overlay::default();
    let mut acc_features: FxHashMap<String, Overlay> = FxHashMap::default();
    for dep_name in &defaults {
        let dep = set
            .get(dep_name)
            .filter(|d| d.enabled)
            .ok_or_else(|| ConfigError::MissingDependency {
                module: name.clone(),
                dependency: dep_name.clone(),
            })?;
        if dep.kind != ModuleKind::Defaults {
            return Err(ConfigError::NotADefaults {
                module: name,
                dependency: dep_name.clone(),
            }
            .into());
        }
        acc.apply(&dep.props, Apply::Augment);
        for (feature, overlay) in &dep.features {
            acc_features
                .entry(feature.clone())
                .or_default()
                .apply(overlay, Apply::Augment);
        }
    }

    for group in acc.provided_groups() {
        if !kind.supports(group) {
            return Err(ConfigError::PropertyTypeNotFound {
                module: name,
                kind: kind.name().to_string(),
                group: group.name().to_string(),
            }
            .into());
        }
    }

    let module = set.module_mut(index);
    module.props.apply(&acc, Apply::Underlay);
    for (feature, overlay) in acc_features {
        module
            .features
            .entry(feature)
            .or_default()
            .apply(&overlay, Apply::Underlay);
    }
    Ok(())
}

/// Apply the overlays of every enabled feature, in global declaration
/// order, then release all per-feature storage.
///
/// Each enabled feature applies its top-level overlay to the module and
/// its section-local overlays to the `host`/`target` sections. An empty
/// overlay for an enabled feature is a no-op.
pub fn apply_features(module: &mut Module, registry: &FeatureRegistry) {
    for feature in registry.enabled_in_order() {
        if let Some(overlay) = module.features.remove(feature) {
            module.props.apply(&overlay, Apply::Augment);
        }
        if let Some(section) = module.props.host.features.remove(feature) {
            module.props.host.props.apply(&section, Apply::Augment);
        }
        if let Some(section) = module.props.target.features.remove(feature) {
            module.props.target.props.apply(&section, Apply::Augment);
        }
    }
    module.features.clear();
    module.props.host.features.clear();
    module.props.target.features.clear();
}

/// Fold the section matching the module's concrete variant into its main
/// property groups.
pub fn apply_target_specific(module: &mut Module) -> Result<(), InternalError> {
    let section = match module.variant {
        Some(Variant::Host) => module.props.host.props.clone(),
        Some(Variant::Target) => module.props.target.props.clone(),
        None => {
            return Err(InternalError::UnresolvedVariant {
                module: module.name.clone(),
            })
        }
    };

    let props = &mut module.props;
    merge_list(
        &mut props.common.srcs,
        &section.srcs,
        Discipline::Override,
        Apply::Augment,
    );
    merge_list(
        &mut props.common.cflags,
        &section.cflags,
        Discipline::Override,
        Apply::Augment,
    );
    merge_list(
        &mut props.common.defines,
        &section.defines,
        Discipline::Override,
        Apply::Augment,
    );
    merge_list(
        &mut props.common.include_dirs,
        &section.include_dirs,
        Discipline::FirstWins,
        Apply::Augment,
    );
    merge_list(
        &mut props.link.ldflags,
        &section.ldflags,
        Discipline::Override,
        Apply::Augment,
    );
    Ok(())
}
