//! Packaging variant configuration.
//!
//! Each packaging variant of the app carries a `Prepare.toml` describing how
//! its web bundle is assembled. The plain web variant only copies the
//! stylesheet; the device variant also builds the wasm module and prunes the
//! npm metadata wasm-pack leaves behind.
//!
//! All paths are relative to the project root passed on the command line.
//! Sources and the crate-dir override may point above the root (the device
//! variant reads the stylesheet from its parent checkout); destination
//! directories must stay inside it.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Conventional config filename under the project root.
pub const PREPARE_CONFIG_FILENAME: &str = "Prepare.toml";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PrepareToml {
    prepare: PrepareSectionToml,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PrepareSectionToml {
    stylesheet: String,
    css_dir: String,
    module: Option<ModuleSectionToml>,
    bootstrap: Option<BootstrapSectionToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModuleSectionToml {
    name: String,
    out_dir: String,
    crate_dir: Option<String>,
    features: Option<Vec<String>>,
    release: Option<bool>,
    remove_pkg_manifest: Option<bool>,
    pkg_manifest_optional: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BootstrapSectionToml {
    background_mode: Option<bool>,
    silent: Option<bool>,
}

/// Validated configuration for one packaging variant.
#[derive(Debug, Clone)]
pub struct PrepareConfig {
    /// Stylesheet source file.
    pub stylesheet: PathBuf,
    /// Bundle directory the stylesheet is copied into.
    pub css_dir: PathBuf,
    /// Module build settings; absent for stylesheet-only variants.
    pub module: Option<ModuleConfig>,
    /// Device startup settings.
    pub bootstrap: BootstrapConfig,
}

/// wasm module build settings.
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    /// Artifact name as emitted by wasm-pack (`<name>.js`, `<name>_bg.wasm`).
    pub name: String,
    /// Bundle directory the module is built into.
    pub out_dir: PathBuf,
    /// Directory wasm-pack runs in; defaults to the project root.
    pub crate_dir: Option<PathBuf>,
    /// Cargo features passed to the build.
    pub features: Vec<String>,
    /// Build with `--release`.
    pub release: bool,
    /// Delete the npm manifest after the build.
    pub remove_pkg_manifest: bool,
    /// Tolerate an already-absent manifest during cleanup.
    pub pkg_manifest_optional: bool,
}

/// Device startup settings.
#[derive(Debug, Clone, Default)]
pub struct BootstrapConfig {
    /// Keep the app running when the host moves it to the background.
    pub background_mode: bool,
    /// Suppress the host's foreground notification.
    pub silent: bool,
}

/// Load and validate a variant config.
pub fn load_prepare_config(config_path: &Path) -> Result<PrepareConfig> {
    let config_bytes = fs::read_to_string(config_path)
        .with_context(|| format!("reading prepare config '{}'", config_path.display()))?;
    let parsed: PrepareToml = toml::from_str(&config_bytes)
        .with_context(|| format!("parsing prepare config '{}'", config_path.display()))?;

    let section = parsed.prepare;

    let stylesheet = parse_source_path(&section.stylesheet, "stylesheet", config_path)?;
    let css_dir = parse_bundle_relative_path(&section.css_dir, "css_dir", config_path)?;

    let module = section
        .module
        .map(|m| parse_module_section(m, config_path))
        .transpose()?;

    let bootstrap = match section.bootstrap {
        Some(b) => {
            let background_mode = b.background_mode.unwrap_or(false);
            let silent = b.silent.unwrap_or(false);
            if silent && !background_mode {
                bail!(
                    "invalid prepare config '{}': bootstrap.silent requires background_mode = true",
                    config_path.display()
                );
            }
            BootstrapConfig {
                background_mode,
                silent,
            }
        }
        None => BootstrapConfig::default(),
    };

    Ok(PrepareConfig {
        stylesheet,
        css_dir,
        module,
        bootstrap,
    })
}

fn parse_module_section(section: ModuleSectionToml, config_path: &Path) -> Result<ModuleConfig> {
    let name = section.name.trim().to_string();
    if name.is_empty() {
        bail!(
            "invalid prepare config '{}': module.name must not be empty",
            config_path.display()
        );
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        bail!(
            "invalid prepare config '{}': module.name '{}' must match the wasm-pack output stem (ascii letters, digits, '_')",
            config_path.display(),
            name
        );
    }

    let out_dir = parse_bundle_relative_path(&section.out_dir, "module.out_dir", config_path)?;
    let crate_dir = section
        .crate_dir
        .as_deref()
        .map(|raw| parse_crate_dir(raw, config_path))
        .transpose()?;
    let features = parse_features(section.features, config_path)?;

    Ok(ModuleConfig {
        name,
        out_dir,
        crate_dir,
        features,
        release: section.release.unwrap_or(true),
        remove_pkg_manifest: section.remove_pkg_manifest.unwrap_or(true),
        pkg_manifest_optional: section.pkg_manifest_optional.unwrap_or(false),
    })
}

fn parse_bundle_relative_path(raw: &str, field: &str, config_path: &Path) -> Result<PathBuf> {
    if raw.trim().is_empty() {
        bail!(
            "invalid prepare config '{}': {} must not be empty",
            config_path.display(),
            field
        );
    }
    let candidate = Path::new(raw);
    if candidate.is_absolute() {
        bail!(
            "invalid prepare config '{}': {} must be relative, got absolute path '{}'",
            config_path.display(),
            field,
            raw
        );
    }
    for component in candidate.components() {
        if matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        ) {
            bail!(
                "invalid prepare config '{}': {} contains invalid traversal/root component in '{}'",
                config_path.display(),
                field,
                raw
            );
        }
    }
    Ok(candidate.to_path_buf())
}

fn parse_source_path(raw: &str, field: &str, config_path: &Path) -> Result<PathBuf> {
    if raw.trim().is_empty() {
        bail!(
            "invalid prepare config '{}': {} must not be empty",
            config_path.display(),
            field
        );
    }
    let candidate = Path::new(raw);
    if candidate.is_absolute() {
        bail!(
            "invalid prepare config '{}': {} must be relative to the project root, got '{}'",
            config_path.display(),
            field,
            raw
        );
    }
    match candidate.components().next_back() {
        Some(Component::Normal(_)) => Ok(candidate.to_path_buf()),
        _ => bail!(
            "invalid prepare config '{}': {} must name a file, got '{}'",
            config_path.display(),
            field,
            raw
        ),
    }
}

fn parse_crate_dir(raw: &str, config_path: &Path) -> Result<PathBuf> {
    if raw.trim().is_empty() {
        bail!(
            "invalid prepare config '{}': module.crate_dir must not be empty",
            config_path.display()
        );
    }
    let candidate = Path::new(raw);
    if candidate.is_absolute() {
        bail!(
            "invalid prepare config '{}': module.crate_dir must be relative to the project root, got '{}'",
            config_path.display(),
            raw
        );
    }
    Ok(candidate.to_path_buf())
}

fn parse_features(raw: Option<Vec<String>>, config_path: &Path) -> Result<Vec<String>> {
    let features = raw.unwrap_or_default();
    for feature in &features {
        if feature.trim().is_empty() {
            bail!(
                "invalid prepare config '{}': module.features must not contain empty entries",
                config_path.display()
            );
        }
        if !feature
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            bail!(
                "invalid prepare config '{}': invalid feature name '{}'",
                config_path.display(),
                feature
            );
        }
    }
    Ok(features)
}
