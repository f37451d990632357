//! wasm-pack build step for the bundle's WebAssembly module.
//!
//! Binary resolution order:
//! 1. `WASM_PACK_BIN` env var (path to binary)
//! 2. System PATH

use anyhow::{bail, Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Resolved inputs for one module build.
#[derive(Debug, Clone)]
pub struct ModuleBuildSpec {
    /// Artifact name, for messages only; wasm-pack derives the real one
    /// from the crate manifest.
    pub name: String,
    /// Directory wasm-pack runs in.
    pub crate_dir: PathBuf,
    /// Output directory for the built module.
    pub out_dir: PathBuf,
    /// Cargo features passed to the build.
    pub features: Vec<String>,
    /// Build with `--release`.
    pub release: bool,
}

/// Builder for wasm-pack build commands.
///
/// Always targets the web (no bundler) and suppresses the TypeScript
/// declarations the bundle has no loader for.
pub struct WasmPackBuilder {
    crate_dir: PathBuf,
    out_dir: PathBuf,
    features: Vec<String>,
    release: bool,
}

impl WasmPackBuilder {
    pub fn new(crate_dir: &Path, out_dir: &Path) -> Self {
        Self {
            crate_dir: crate_dir.to_path_buf(),
            out_dir: out_dir.to_path_buf(),
            features: Vec::new(),
            release: true,
        }
    }

    pub fn features(mut self, features: &[String]) -> Self {
        self.features = features.to_vec();
        self
    }

    pub fn release(mut self, release: bool) -> Self {
        self.release = release;
        self
    }

    /// Assemble the command. The out dir should be absolute so the
    /// crate-dir override only affects crate discovery.
    pub fn build(self, wasm_pack_bin: &Path) -> Command {
        let mut cmd = Command::new(wasm_pack_bin);
        cmd.arg("build");
        if self.release {
            cmd.arg("--release");
        }
        cmd.args(["--target=web", "--no-typescript"]);
        if !self.features.is_empty() {
            cmd.arg(format!("--features={}", self.features.join(",")));
        }
        cmd.arg(format!("--out-dir={}", self.out_dir.display()));
        cmd.current_dir(&self.crate_dir);
        cmd
    }
}

/// Find the wasm-pack binary.
pub fn find_wasm_pack() -> Result<PathBuf> {
    if let Ok(bin_path) = env::var("WASM_PACK_BIN") {
        let path = PathBuf::from(&bin_path);
        if path.is_file() {
            return Ok(path);
        }
        bail!("WASM_PACK_BIN points to non-existent path: {}", bin_path);
    }

    if let Ok(path) = which::which("wasm-pack") {
        return Ok(path);
    }

    bail!(
        "Could not find wasm-pack binary.\n\n\
         Solutions:\n\
         - Install wasm-pack: cargo install wasm-pack\n\
         - Set WASM_PACK_BIN=/path/to/wasm-pack"
    )
}

/// Run the module build, blocking until wasm-pack exits.
pub fn build_module(spec: &ModuleBuildSpec) -> Result<()> {
    let wasm_pack = find_wasm_pack()?;

    if !spec.crate_dir.is_dir() {
        bail!(
            "module crate directory not found: {}",
            spec.crate_dir.display()
        );
    }

    // wasm-pack resolves a relative out dir against its own cwd, which the
    // crate-dir override may have shifted. Pin it down before spawning.
    let out_dir = if spec.out_dir.is_absolute() {
        spec.out_dir.clone()
    } else {
        env::current_dir()
            .context("resolving current directory")?
            .join(&spec.out_dir)
    };

    println!("  Building WASM module ({})...", spec.name);
    println!("    Crate dir: {}", spec.crate_dir.display());
    println!("    Out dir: {}", out_dir.display());

    let output = WasmPackBuilder::new(&spec.crate_dir, &out_dir)
        .features(&spec.features)
        .release(spec.release)
        .build(&wasm_pack)
        .output()
        .with_context(|| format!("running wasm-pack in '{}'", spec.crate_dir.display()))?;

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "wasm-pack build failed for '{}'\n  Exit code: {}\n  stdout: {}\n  stderr: {}",
            spec.name,
            output.status.code().unwrap_or(-1),
            stdout.trim(),
            stderr.trim()
        );
    }

    Ok(())
}
