//! `kiln graph` - dump resolved static-link orders.

use std::path::Path;

use anyhow::bail;

use crate::output::StyledOutput;

pub fn run(out: &mut StyledOutput, manifest: &Path, module: Option<&str>) -> anyhow::Result<()> {
    let resolution = super::load_and_resolve(manifest)?;

    let mut found = false;
    for m in resolution.buildable_modules() {
        if let Some(filter) = module {
            if m.name != filter {
                continue;
            }
        }
        found = true;
        if m.resolved_static_libs.is_empty() {
            continue;
        }
        let variant = m.variant.map(|v| v.name()).unwrap_or("-");
        out.header(&format!("{} ({variant})", m.name));
        for lib in &m.resolved_static_libs {
            out.line(&format!("  {lib}"));
        }
    }

    if let Some(filter) = module {
        if !found {
            bail!("no buildable module named {filter}");
        }
    }
    Ok(())
}
