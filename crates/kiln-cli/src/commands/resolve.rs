//! `kiln resolve` - inspect the resolved module set.

use std::path::Path;

use crate::output::StyledOutput;

pub fn run(out: &mut StyledOutput, manifest: &Path, json: bool) -> anyhow::Result<()> {
    let resolution = super::load_and_resolve(manifest)?;

    if json {
        out.line(&serde_json::to_string_pretty(&resolution.summary())?);
        return Ok(());
    }

    out.header("resolved modules");
    let mut count = 0usize;
    for module in resolution.buildable_modules() {
        let variant = module
            .variant
            .map(|v| v.name())
            .unwrap_or("-");
        out.line(&format!("  {:30} {:8} {}", module.name, module.kind, variant));
        count += 1;
    }
    out.success(&format!("{count} buildable module instances"));
    Ok(())
}
