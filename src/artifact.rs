//! wasm-pack output contract for web-target module builds.
//!
//! A `wasm-pack build --target=web` run drops three things into the output
//! directory: a JS loader (`<name>.js`), the wasm binary (`<name>_bg.wasm`),
//! and an npm `package.json` the bundle has no use for. This module knows
//! that layout and how to sanity-check a built module before startup.

use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// npm manifest wasm-pack writes next to the module.
pub const PKG_MANIFEST_FILENAME: &str = "package.json";

/// Suffix of the wasm binary emitted for web targets.
pub const WASM_BINARY_SUFFIX: &str = "_bg.wasm";

/// Entry function the loader script must export.
pub const ENTRY_EXPORT: &str = "main";

const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];
const WASM_VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// Path of the npm manifest inside a module output directory.
pub fn pkg_manifest_path(module_dir: &Path) -> PathBuf {
    module_dir.join(PKG_MANIFEST_FILENAME)
}

/// Located wasm-pack output for one module.
#[derive(Debug, Clone)]
pub struct ModuleArtifact {
    pub name: String,
    pub loader_script: PathBuf,
    pub binary: PathBuf,
}

impl ModuleArtifact {
    /// Resolve the loader/binary pair for `name` under `module_dir`.
    pub fn locate(module_dir: &Path, name: &str) -> Result<Self> {
        let loader_script = module_dir.join(format!("{name}.js"));
        let binary = module_dir.join(format!("{name}{WASM_BINARY_SUFFIX}"));

        if !loader_script.is_file() {
            bail!(
                "module loader script not found: {}",
                loader_script.display()
            );
        }
        if !binary.is_file() {
            bail!("module binary not found: {}", binary.display());
        }

        Ok(Self {
            name: name.to_string(),
            loader_script,
            binary,
        })
    }

    /// Check the binary header and the loader's exported symbols.
    ///
    /// The loader must carry a default export (the init function) and an
    /// `export function main`, matching what wasm-bindgen emits for a
    /// `#[wasm_bindgen] pub fn main` entry.
    pub fn verify(&self) -> Result<()> {
        let mut file = File::open(&self.binary)
            .with_context(|| format!("opening module binary '{}'", self.binary.display()))?;
        let mut header = [0u8; 8];
        file.read_exact(&mut header)
            .with_context(|| format!("reading module binary header '{}'", self.binary.display()))?;

        if header[0..4] != WASM_MAGIC {
            bail!(
                "module binary is not WebAssembly (bad magic): {}",
                self.binary.display()
            );
        }
        if header[4..8] != WASM_VERSION {
            bail!(
                "module binary has unsupported wasm version (expected 1): {}",
                self.binary.display()
            );
        }

        let loader_src = fs::read_to_string(&self.loader_script).with_context(|| {
            format!(
                "reading module loader script '{}'",
                self.loader_script.display()
            )
        })?;

        if !loader_src.contains("export default") {
            bail!(
                "loader script has no default init export: {}",
                self.loader_script.display()
            );
        }
        if !loader_src.contains(&format!("export function {ENTRY_EXPORT}")) {
            bail!(
                "loader script does not export entry '{}': {}",
                ENTRY_EXPORT,
                self.loader_script.display()
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LOADER_SRC: &str = "\
let wasm;\n\
async function __wbg_init(module_or_path) { return wasm; }\n\
export function main() {\n    wasm.main();\n}\n\
export default __wbg_init;\n";

    fn wasm_bytes() -> Vec<u8> {
        let mut bytes = vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&[0u8; 16]);
        bytes
    }

    fn write_artifact(dir: &Path, name: &str) {
        fs::write(dir.join(format!("{name}.js")), LOADER_SRC).unwrap();
        fs::write(dir.join(format!("{name}_bg.wasm")), wasm_bytes()).unwrap();
    }

    #[test]
    fn locate_finds_loader_and_binary() {
        let tmp = TempDir::new().unwrap();
        write_artifact(tmp.path(), "app_gui");

        let artifact = ModuleArtifact::locate(tmp.path(), "app_gui").unwrap();
        assert_eq!(artifact.loader_script, tmp.path().join("app_gui.js"));
        assert_eq!(artifact.binary, tmp.path().join("app_gui_bg.wasm"));
    }

    #[test]
    fn locate_fails_without_binary() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("app_gui.js"), LOADER_SRC).unwrap();

        let err = ModuleArtifact::locate(tmp.path(), "app_gui").unwrap_err();
        assert!(format!("{err:#}").contains("module binary not found"));
    }

    #[test]
    fn verify_accepts_well_formed_artifact() {
        let tmp = TempDir::new().unwrap();
        write_artifact(tmp.path(), "app_gui");

        let artifact = ModuleArtifact::locate(tmp.path(), "app_gui").unwrap();
        artifact.verify().unwrap();
    }

    #[test]
    fn verify_rejects_bad_magic() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("app_gui.js"), LOADER_SRC).unwrap();
        fs::write(tmp.path().join("app_gui_bg.wasm"), b"not a wasm binary").unwrap();

        let artifact = ModuleArtifact::locate(tmp.path(), "app_gui").unwrap();
        let err = artifact.verify().unwrap_err();
        assert!(format!("{err:#}").contains("bad magic"));
    }

    #[test]
    fn verify_rejects_truncated_binary() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("app_gui.js"), LOADER_SRC).unwrap();
        fs::write(tmp.path().join("app_gui_bg.wasm"), [0x00, 0x61]).unwrap();

        let artifact = ModuleArtifact::locate(tmp.path(), "app_gui").unwrap();
        assert!(artifact.verify().is_err());
    }

    #[test]
    fn verify_rejects_loader_without_entry_export() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("app_gui.js"),
            "export default function init() {}\n",
        )
        .unwrap();
        fs::write(tmp.path().join("app_gui_bg.wasm"), wasm_bytes()).unwrap();

        let artifact = ModuleArtifact::locate(tmp.path(), "app_gui").unwrap();
        let err = artifact.verify().unwrap_err();
        assert!(format!("{err:#}").contains("does not export entry"));
    }
}
