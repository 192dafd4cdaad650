//! CLI subcommand implementations.

pub mod emit;
pub mod graph;
pub mod resolve;

use std::path::Path;

use anyhow::Context;

use kiln_manifest::Manifest;
use kiln_resolver::{Resolution, Resolver};

/// Load a build description and run the full resolution pipeline.
pub fn load_and_resolve(manifest: &Path) -> anyhow::Result<Resolution> {
    let manifest_path = manifest.display().to_string();
    let manifest = Manifest::from_path(manifest)
        .with_context(|| format!("loading {manifest_path}"))?;
    let resolution = Resolver::new(manifest.modules, manifest.features)?
        .resolve()
        .with_context(|| format!("resolving {manifest_path}"))?;
    Ok(resolution)
}
