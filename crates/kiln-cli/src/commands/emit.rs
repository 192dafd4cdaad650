//! `kiln emit` - write build.ninja.

use std::path::Path;

use anyhow::Context;

use crate::output::StyledOutput;

pub fn run(out: &mut StyledOutput, manifest: &Path, path: &Path) -> anyhow::Result<()> {
    let resolution = super::load_and_resolve(manifest)?;
    kiln_ninja::emit_to_path(&resolution, path)
        .with_context(|| format!("writing {}", path.display()))?;
    out.success(&format!("wrote {}", path.display()));
    Ok(())
}
