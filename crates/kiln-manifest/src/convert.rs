//! Conversion from raw declarations to module prototypes
//!
//! Validates each declaration against its module kind and allocates a
//! feature overlay slot for every declared feature, present in the
//! manifest or not.

use kiln_core::{
    CommonProps, DepEdge, DepTag, FeatureRegistry, InstallProps, KernelProps, LinkProps, Module,
    ModuleKind, ModuleSet, Overlay, SectionOverlay, SplittableProps, VariantSection,
};

use crate::decl::{RawManifest, RawModule, RawOverlay, RawSection, RawSectionOverlay};
use crate::{Manifest, ManifestError};

pub(crate) fn convert(raw: RawManifest) -> Result<Manifest, ManifestError> {
    let features = FeatureRegistry::new(raw.config.features, raw.config.enabled)?;

    // Module tables are keyed by name; sort so prototype order (and
    // everything derived from it) is stable.
    let mut names: Vec<&String> = raw.module.keys().collect();
    names.sort();

    let mut modules = Vec::with_capacity(names.len());
    for name in names {
        modules.push(convert_module(name, &raw.module[name], &features)?);
    }

    let modules = ModuleSet::from_modules(modules)?;
    Ok(Manifest { modules, features })
}

fn parse_kind(name: &str) -> Option<ModuleKind> {
    ModuleKind::ALL.iter().copied().find(|k| k.name() == name)
}

fn check_groups(
    module: &str,
    kind: ModuleKind,
    overlay: &Overlay,
) -> Result<(), ManifestError> {
    for group in overlay.provided_groups() {
        if !kind.supports(group) {
            return Err(ManifestError::UnsupportedGroup {
                module: module.to_string(),
                kind: kind.name().to_string(),
                group: group.name().to_string(),
            });
        }
    }
    Ok(())
}

// RawModule and RawOverlay share the same property fields; one
// expansion builds the typed overlay from either.
macro_rules! overlay_from {
    ($raw:expr) => {
        Overlay {
            common: CommonProps {
                srcs: $raw.srcs.clone(),
                cflags: $raw.cflags.clone(),
                defines: $raw.defines.clone(),
                include_dirs: $raw.include_dirs.clone(),
                enabled: $raw.enabled,
            },
            link: LinkProps {
                ldflags: $raw.ldflags.clone(),
                static_libs: $raw.static_libs.clone(),
                whole_static_libs: $raw.whole_static_libs.clone(),
                shared_libs: $raw.shared_libs.clone(),
                export_include_dirs: $raw.export_include_dirs.clone(),
            },
            install: InstallProps {
                install_path: $raw.install_path.clone(),
                relative_install_path: $raw.relative_install_path.clone(),
                install_group: $raw.install_group.clone(),
                post_install_cmd: $raw.post_install_cmd.clone(),
            },
            splittable: SplittableProps {
                host_supported: $raw.host_supported,
                target_supported: $raw.target_supported,
            },
            kernel: KernelProps {
                kernel_dir: $raw.kernel_dir.clone(),
                extra_symbols: $raw.extra_symbols.clone(),
                kbuild_options: $raw.kbuild_options.clone(),
            },
            host: VariantSection::default(),
            target: VariantSection::default(),
        }
    };
}

fn module_overlay(raw: &RawModule) -> Overlay {
    overlay_from!(raw)
}

fn feature_overlay(raw: &RawOverlay) -> Overlay {
    overlay_from!(raw)
}

fn section_overlay(raw: &RawSectionOverlay) -> SectionOverlay {
    SectionOverlay {
        srcs: raw.srcs.clone(),
        cflags: raw.cflags.clone(),
        defines: raw.defines.clone(),
        include_dirs: raw.include_dirs.clone(),
        ldflags: raw.ldflags.clone(),
    }
}

fn convert_section(
    module: &str,
    raw: &RawSection,
    features: &FeatureRegistry,
) -> Result<VariantSection, ManifestError> {
    let mut referenced: Vec<&String> = raw.features.keys().collect();
    referenced.sort();
    for feature in referenced {
        if !features.is_declared(feature) {
            return Err(ManifestError::UnknownFeature {
                module: module.to_string(),
                feature: feature.clone(),
            });
        }
    }

    let mut section = VariantSection {
        props: SectionOverlay {
            srcs: raw.srcs.clone(),
            cflags: raw.cflags.clone(),
            defines: raw.defines.clone(),
            include_dirs: raw.include_dirs.clone(),
            ldflags: raw.ldflags.clone(),
        },
        ..Default::default()
    };
    for feature in features.declared() {
        let overlay = raw
            .features
            .get(feature)
            .map(section_overlay)
            .unwrap_or_default();
        section.features.insert(feature.clone(), overlay);
    }
    Ok(section)
}

fn convert_module(
    name: &str,
    raw: &RawModule,
    features: &FeatureRegistry,
) -> Result<Module, ManifestError> {
    let kind = parse_kind(&raw.kind).ok_or_else(|| ManifestError::UnknownKind {
        module: name.to_string(),
        kind: raw.kind.clone(),
    })?;

    let overlay = module_overlay(raw);
    check_groups(name, kind, &overlay)?;

    let has_sections = raw.host != RawSection::default() || raw.target != RawSection::default();
    if has_sections && !kind.has_variant_sections() {
        return Err(ManifestError::UnsupportedProperty {
            module: name.to_string(),
            property: "host/target sections".to_string(),
        });
    }

    let mut module = Module::new(name, kind);
    module.defaults = raw.defaults.clone();
    module.props = overlay;
    module.props.host = convert_section(name, &raw.host, features)?;
    module.props.target = convert_section(name, &raw.target, features)?;

    let mut referenced: Vec<&String> = raw.features.keys().collect();
    referenced.sort();
    for feature in referenced {
        if !features.is_declared(feature) {
            return Err(ManifestError::UnknownFeature {
                module: name.to_string(),
                feature: feature.clone(),
            });
        }
    }
    for feature in features.declared() {
        let overlay = raw
            .features
            .get(feature)
            .map(feature_overlay)
            .unwrap_or_default();
        check_groups(name, kind, &overlay)?;
        module.features.insert(feature.clone(), overlay);
    }

    match (kind, &raw.actual) {
        (ModuleKind::Alias, Some(actual)) => {
            module.deps.push(DepEdge::new(DepTag::Alias, actual.clone()));
        }
        (ModuleKind::Alias, None) => {
            return Err(ManifestError::MissingAliasTarget {
                module: name.to_string(),
            });
        }
        (_, Some(_)) => {
            return Err(ManifestError::UnsupportedProperty {
                module: name.to_string(),
                property: "actual".to_string(),
            });
        }
        (_, None) => {}
    }

    Ok(module)
}
