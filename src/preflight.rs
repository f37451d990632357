//! Preflight checks for bundle preparation.
//!
//! Validates that the host has the toolchain needed to build the wasm
//! module before a packaging run starts. This prevents cryptic errors
//! halfway through the pipeline.
//!
//! # Example
//!
//! ```rust
//! use bundle_builder::preflight::{command_exists, check_required_tools};
//!
//! if !command_exists("wasm-pack") {
//!     println!("wasm-pack not installed");
//! }
//!
//! let tools = &[("wasm-pack", "cargo install wasm-pack")];
//! if let Err(e) = check_required_tools(tools) {
//!     eprintln!("{}", e);
//! }
//! ```

use anyhow::{bail, Result};

/// Check if a command exists on the host system.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Required host tools for building the module bundle.
///
/// Each tuple is (command_name, install_hint).
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[
    ("wasm-pack", "cargo install wasm-pack"),
    ("cargo", "rustup, https://rustup.rs"),
];

/// Check that specific tools are available.
///
/// # Arguments
///
/// * `tools` - Slice of (command, install hint) tuples
///
/// # Returns
///
/// * `Ok(())` if all tools are found
/// * `Err` with the list of missing tools and how to install them
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let mut missing = Vec::new();

    for (tool, hint) in tools {
        if !command_exists(tool) {
            missing.push((*tool, *hint));
        }
    }

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, h)| format!("  {} (install: {})", t, h))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// Check that all tools in [`REQUIRED_TOOLS`] are available.
pub fn check_host_tools() -> Result<()> {
    check_required_tools(REQUIRED_TOOLS)
}
