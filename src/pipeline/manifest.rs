//! npm manifest cleanup step.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// Delete the npm manifest wasm-pack leaves in the module directory.
///
/// The strict default treats an absent manifest as a broken build layout.
/// `optional` tolerates absence as a no-op, for variants that re-run
/// cleanup over an already-pruned bundle.
///
/// Returns whether a file was removed.
pub fn remove_pkg_manifest(manifest: &Path, optional: bool) -> Result<bool> {
    if !manifest.is_file() {
        if optional {
            println!("  No `{}` to remove", manifest.display());
            return Ok(false);
        }
        bail!("package manifest not found: {}", manifest.display());
    }

    println!("  Removing `{}`", manifest.display());
    fs::remove_file(manifest)
        .with_context(|| format!("removing package manifest '{}'", manifest.display()))?;

    Ok(true)
}
