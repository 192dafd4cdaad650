//! build.ninja emission
//!
//! Translates a completed resolution into Ninja rule text. Inputs to a
//! link edge follow the module's resolved static-link order exactly;
//! whole-archive members are wrapped so the linker keeps every object.
//! Output is deterministic: the same resolution always renders the same
//! bytes.
//!
//! Writing the file is the only I/O here; nothing is executed.

use std::fmt::Write as _;
use std::path::Path;

use thiserror::Error;

use kiln_core::{Module, ModuleKind, Variant};
use kiln_resolver::Resolution;

/// Errors raised while rendering or writing rule text.
#[derive(Debug, Error)]
pub enum EmitError {
    /// A module needs installing but no installation directory resolved.
    #[error("{module} is installed but resolves to an empty install path")]
    EmptyInstallPath {
        /// The module missing its path.
        module: String,
    },

    /// Failed to write the output file.
    #[error("Failed to write ninja file: {0}")]
    IoError(#[from] std::io::Error),
}

/// Render `build.ninja` text for every buildable module.
pub fn emit(resolution: &Resolution) -> Result<String, EmitError> {
    let mut out = String::new();
    let _ = writeln!(out, "# Generated by kiln. Do not edit.");
    let _ = writeln!(out, "ninja_required_version = 1.7");
    let _ = writeln!(out, "builddir = out");
    let _ = writeln!(out);
    emit_rules(&mut out);

    let mut modules: Vec<&Module> = resolution.buildable_modules().collect();
    modules.sort_by_key(|m| (m.name.clone(), m.variant));

    for module in modules {
        emit_module(&mut out, resolution, module)?;
    }
    Ok(out)
}

/// Render and write `build.ninja` to `path`.
pub fn emit_to_path(resolution: &Resolution, path: impl AsRef<Path>) -> Result<(), EmitError> {
    let text = emit(resolution)?;
    std::fs::write(path, text)?;
    Ok(())
}

fn emit_rules(out: &mut String) {
    let _ = writeln!(out, "rule cc");
    let _ = writeln!(out, "  command = $cc $cflags -c $in -o $out");
    let _ = writeln!(out, "  description = CC $out");
    let _ = writeln!(out);
    let _ = writeln!(out, "rule ar");
    let _ = writeln!(out, "  command = rm -f $out && $ar rcs $out $in");
    let _ = writeln!(out, "  description = AR $out");
    let _ = writeln!(out);
    let _ = writeln!(out, "rule link");
    let _ = writeln!(out, "  command = $cc -o $out $in $libs $ldflags");
    let _ = writeln!(out, "  description = LINK $out");
    let _ = writeln!(out);
    let _ = writeln!(out, "rule kbuild");
    let _ = writeln!(
        out,
        "  command = make -C $kdir M=$$PWD/$moddir modules"
    );
    let _ = writeln!(out, "  description = KBUILD $out");
    let _ = writeln!(out);
    let _ = writeln!(out, "rule install");
    let _ = writeln!(out, "  command = install -m 0755 $in $out");
    let _ = writeln!(out, "  description = INSTALL $out");
    let _ = writeln!(out);
}

fn variant_dir(variant: Variant) -> &'static str {
    match variant {
        Variant::Host => "out/host",
        Variant::Target => "out/target",
    }
}

fn archive_path(name: &str, variant: Variant) -> String {
    format!("{}/lib/{}.a", variant_dir(variant), name)
}

/// Where a resolved static dependency's archive lives: built libraries
/// under the variant output tree, prebuilts at their declared source.
fn dep_archive(resolution: &Resolution, lib: &str, variant: Variant) -> Option<String> {
    match resolution.get_variant(lib, variant) {
        Some(dep) if dep.kind == ModuleKind::ExternalLib => dep.props.common.srcs.first().cloned(),
        _ => Some(archive_path(lib, variant)),
    }
}

fn object_path(module: &Module, variant: Variant, src: &str) -> String {
    format!(
        "{}/obj/{}/{}.o",
        variant_dir(variant),
        module.name,
        src.trim_end_matches(".c")
    )
}

/// Compile flags for a module: its own flags, defines, then include
/// paths (the module's own first, then the exported paths of its static
/// closure, in resolved order).
fn cflags_var(resolution: &Resolution, module: &Module, variant: Variant) -> String {
    let mut flags: Vec<String> = module.props.common.cflags.clone();
    for define in &module.props.common.defines {
        flags.push(format!("-D{define}"));
    }
    for dir in &module.props.common.include_dirs {
        flags.push(format!("-I{dir}"));
    }
    for lib in &module.resolved_static_libs {
        if let Some(dep) = resolution.get_variant(lib, variant) {
            for dir in &dep.props.link.export_include_dirs {
                flags.push(format!("-I{dir}"));
            }
        }
    }
    flags.join(" ")
}

fn emit_objects(
    out: &mut String,
    resolution: &Resolution,
    module: &Module,
    variant: Variant,
) -> Vec<String> {
    let cflags = cflags_var(resolution, module, variant);
    let mut objects = Vec::new();
    for src in &module.props.common.srcs {
        let object = object_path(module, variant, src);
        let _ = writeln!(out, "build {object}: cc {src}");
        if !cflags.is_empty() {
            let _ = writeln!(out, "  cflags = {cflags}");
        }
        objects.push(object);
    }
    objects
}

/// Static inputs for a link edge: the archive paths (implicit
/// dependencies) and the `$libs` value with resolved order preserved and
/// whole-archive members wrapped.
fn link_inputs(
    resolution: &Resolution,
    module: &Module,
    variant: Variant,
) -> (Vec<String>, Vec<String>) {
    let whole = &module.props.link.whole_static_libs;
    let mut inputs = Vec::new();
    let mut libs = Vec::new();
    for lib in &module.resolved_static_libs {
        let Some(path) = dep_archive(resolution, lib, variant) else {
            continue;
        };
        if whole.contains(lib) {
            libs.push(format!(
                "-Wl,--whole-archive {path} -Wl,--no-whole-archive"
            ));
        } else {
            libs.push(path.clone());
        }
        inputs.push(path);
    }
    (inputs, libs)
}

fn emit_module(
    out: &mut String,
    resolution: &Resolution,
    module: &Module,
) -> Result<(), EmitError> {
    let Some(variant) = module.variant else {
        return Ok(());
    };
    let _ = writeln!(out, "# module {} ({})", module.name, variant);

    let built = match module.kind {
        ModuleKind::Library => {
            let objects = emit_objects(out, resolution, module, variant);
            let archive = archive_path(&module.name, variant);
            let _ = writeln!(out, "build {archive}: ar {}", objects.join(" "));
            Some(archive)
        }
        ModuleKind::Binary => {
            let objects = emit_objects(out, resolution, module, variant);
            let binary = format!("{}/bin/{}", variant_dir(variant), module.name);
            let (inputs, libs) = link_inputs(resolution, module, variant);
            if inputs.is_empty() {
                let _ = writeln!(out, "build {binary}: link {}", objects.join(" "));
            } else {
                let _ = writeln!(
                    out,
                    "build {binary}: link {} | {}",
                    objects.join(" "),
                    inputs.join(" ")
                );
            }
            if !libs.is_empty() {
                let _ = writeln!(out, "  libs = {}", libs.join(" "));
            }
            if !module.props.link.ldflags.is_empty() {
                let _ = writeln!(out, "  ldflags = {}", module.props.link.ldflags.join(" "));
            }
            Some(binary)
        }
        ModuleKind::GenRule => {
            let stamp = format!("{}/gen/{}", variant_dir(variant), module.name);
            let _ = writeln!(
                out,
                "build {stamp}: phony {}",
                module.props.common.srcs.join(" ")
            );
            None
        }
        ModuleKind::KernelObject => {
            let object = format!("{}/kmod/{}.ko", variant_dir(variant), module.name);
            let _ = writeln!(
                out,
                "build {object}: kbuild {}",
                module.props.common.srcs.join(" ")
            );
            if let Some(kdir) = &module.props.kernel.kernel_dir {
                let _ = writeln!(out, "  kdir = {kdir}");
            }
            let _ = writeln!(out, "  moddir = {}/kmod", variant_dir(variant));
            Some(object)
        }
        // Prebuilt: nothing to build, consumers reference it in place.
        ModuleKind::ExternalLib => None,
        ModuleKind::Alias | ModuleKind::Defaults | ModuleKind::InstallGroup => None,
    };

    if let Some(built) = built {
        emit_install(out, resolution, module, &built)?;
    }
    let _ = writeln!(out);
    Ok(())
}

/// Effective installation directory: the module's own path, or its
/// install group's, with any relative path appended. A module that asks
/// for installation must end up with a non-empty directory.
fn install_dir(resolution: &Resolution, module: &Module) -> Result<Option<String>, EmitError> {
    let base = match (&module.props.install.install_path, &module.props.install.install_group) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(group)) => resolution
            .get(group)
            .and_then(|g| g.props.install.install_path.clone()),
        (None, None) => None,
    };

    let wants_install = module.props.install != Default::default();
    let Some(base) = base else {
        if wants_install {
            return Err(EmitError::EmptyInstallPath {
                module: module.name.clone(),
            });
        }
        return Ok(None);
    };
    if base.is_empty() {
        return Err(EmitError::EmptyInstallPath {
            module: module.name.clone(),
        });
    }

    Ok(Some(
        match &module.props.install.relative_install_path {
            Some(rel) => format!("{base}/{rel}"),
            None => base,
        },
    ))
}

fn emit_install(
    out: &mut String,
    resolution: &Resolution,
    module: &Module,
    built: &str,
) -> Result<(), EmitError> {
    let Some(dir) = install_dir(resolution, module)? else {
        return Ok(());
    };
    let file = built.rsplit('/').next().unwrap_or(built);
    let _ = writeln!(out, "build {dir}/{file}: install {built}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_manifest::Manifest;
    use kiln_resolver::Resolver;

    fn resolve(toml: &str) -> Resolution {
        let manifest = Manifest::from_str(toml).unwrap();
        Resolver::new(manifest.modules, manifest.features)
            .unwrap()
            .resolve()
            .unwrap()
    }

    #[test]
    fn test_link_inputs_follow_resolved_order() {
        let resolution = resolve(
            r#"
[module.app]
kind = "binary"
srcs = ["main.c"]
static_libs = ["libhigh", "liblow"]

[module.libhigh]
kind = "library"
srcs = ["high.c"]
static_libs = ["liblow"]

[module.liblow]
kind = "library"
srcs = ["low.c"]
"#,
        );
        let text = emit(&resolution).unwrap();
        let link_line = text
            .lines()
            .find(|l| l.starts_with("build out/target/bin/app"))
            .unwrap();
        let low = link_line.find("liblow.a").unwrap();
        let high = link_line.find("libhigh.a").unwrap();
        assert!(low < high, "dependency archive must come first: {link_line}");
    }

    #[test]
    fn test_whole_archives_are_wrapped() {
        let resolution = resolve(
            r#"
[module.app]
kind = "binary"
srcs = ["main.c"]
whole_static_libs = ["libw"]

[module.libw]
kind = "library"
srcs = ["w.c"]
"#,
        );
        let text = emit(&resolution).unwrap();
        assert!(
            text.contains("-Wl,--whole-archive out/target/lib/libw.a -Wl,--no-whole-archive"),
            "missing whole-archive wrapping:\n{text}"
        );
    }

    #[test]
    fn test_emission_is_deterministic() {
        let toml = r#"
[module.libb]
kind = "library"
srcs = ["b.c"]

[module.liba]
kind = "library"
srcs = ["a.c"]
static_libs = ["libb"]
"#;
        assert_eq!(emit(&resolve(toml)).unwrap(), emit(&resolve(toml)).unwrap());
    }

    #[test]
    fn test_install_path_from_group() {
        let resolution = resolve(
            r#"
[module.bin-group]
kind = "install_group"
install_path = "/opt/firmware/bin"

[module.tool]
kind = "binary"
srcs = ["tool.c"]
install_group = "bin-group"
"#,
        );
        let text = emit(&resolution).unwrap();
        assert!(
            text.contains("build /opt/firmware/bin/tool: install out/target/bin/tool"),
            "missing install edge:\n{text}"
        );
    }

    #[test]
    fn test_empty_install_path_is_fatal() {
        let resolution = resolve(
            r#"
[module.tool]
kind = "binary"
srcs = ["tool.c"]
install_path = ""
"#,
        );
        let err = emit(&resolution).unwrap_err();
        assert!(matches!(err, EmitError::EmptyInstallPath { .. }));
    }

    #[test]
    fn test_prebuilt_archives_link_from_their_source_path() {
        let resolution = resolve(
            r#"
[module.app]
kind = "binary"
srcs = ["main.c"]
static_libs = ["libvendor"]

[module.libvendor]
kind = "external_lib"
srcs = ["vendor/libvendor.a"]
"#,
        );
        let text = emit(&resolution).unwrap();
        assert!(
            text.contains("libs = vendor/libvendor.a"),
            "prebuilt must link in place:\n{text}"
        );
        assert!(!text.contains("out/target/lib/libvendor.a"));
    }

    #[test]
    fn test_exported_include_dirs_reach_consumers() {
        let resolution = resolve(
            r#"
[module.app]
kind = "binary"
srcs = ["main.c"]
static_libs = ["libhdr"]

[module.libhdr]
kind = "library"
srcs = ["hdr.c"]
export_include_dirs = ["include/hdr"]
"#,
        );
        let text = emit(&resolution).unwrap();
        let has_flag = text
            .lines()
            .any(|l| l.trim_start().starts_with("cflags") && l.contains("-Iinclude/hdr"));
        assert!(has_flag, "consumer must see exported include dir:\n{text}");
    }
}
