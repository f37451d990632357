//! Path definitions for a prepared web bundle.
//!
//! The copy, build, and cleanup logic lives in `pipeline`.
//! This module only defines WHERE things go, not HOW they get there.

use std::path::{Path, PathBuf};

use crate::artifact;
use crate::config::PrepareConfig;

/// Run-state directory under the project root (lock, report).
pub const STATE_DIR: &str = ".prepare";

/// Resolved locations for one packaging variant.
pub struct BundleLayout {
    /// Project root all config paths resolve against.
    pub root: PathBuf,
    /// Stylesheet source file.
    pub stylesheet_source: PathBuf,
    /// Bundle CSS directory.
    pub css_dir: PathBuf,
    /// Module output directory, when the variant builds a module.
    pub module_dir: Option<PathBuf>,
    /// Directory wasm-pack runs in.
    pub crate_dir: PathBuf,
    /// Run-state directory.
    pub state_dir: PathBuf,
}

impl BundleLayout {
    /// Resolve paths for `config` against the project root.
    pub fn new(root: &Path, config: &PrepareConfig) -> Self {
        let module_dir = config
            .module
            .as_ref()
            .map(|module| root.join(&module.out_dir));
        let crate_dir = config
            .module
            .as_ref()
            .and_then(|module| module.crate_dir.as_ref())
            .map(|dir| root.join(dir))
            .unwrap_or_else(|| root.to_path_buf());

        Self {
            root: root.to_path_buf(),
            stylesheet_source: root.join(&config.stylesheet),
            css_dir: root.join(&config.css_dir),
            module_dir,
            crate_dir,
            state_dir: root.join(STATE_DIR),
        }
    }

    /// Lock file guarding a packaging run.
    pub fn lock_path(&self) -> PathBuf {
        self.state_dir.join("prepare.lock")
    }

    /// Destination the stylesheet lands at. None when the source path has
    /// no final file name.
    pub fn stylesheet_dest(&self) -> Option<PathBuf> {
        self.stylesheet_source
            .file_name()
            .map(|name| self.css_dir.join(name))
    }

    /// npm manifest inside the module directory, when there is one.
    pub fn pkg_manifest(&self) -> Option<PathBuf> {
        self.module_dir
            .as_ref()
            .map(|dir| artifact::pkg_manifest_path(dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BootstrapConfig, ModuleConfig};

    fn device_config() -> PrepareConfig {
        PrepareConfig {
            stylesheet: PathBuf::from("../index.css"),
            css_dir: PathBuf::from("www/css"),
            module: Some(ModuleConfig {
                name: "app_gui".to_string(),
                out_dir: PathBuf::from("www/js"),
                crate_dir: Some(PathBuf::from("..")),
                features: vec!["keyboard".to_string()],
                release: true,
                remove_pkg_manifest: true,
                pkg_manifest_optional: false,
            }),
            bootstrap: BootstrapConfig::default(),
        }
    }

    #[test]
    fn resolves_device_variant_paths() {
        let layout = BundleLayout::new(Path::new("/repo/app"), &device_config());

        assert_eq!(
            layout.stylesheet_source,
            PathBuf::from("/repo/app/../index.css")
        );
        assert_eq!(layout.css_dir, PathBuf::from("/repo/app/www/css"));
        assert_eq!(
            layout.stylesheet_dest(),
            Some(PathBuf::from("/repo/app/www/css/index.css"))
        );
        assert_eq!(layout.module_dir, Some(PathBuf::from("/repo/app/www/js")));
        assert_eq!(layout.crate_dir, PathBuf::from("/repo/app/.."));
        assert_eq!(
            layout.pkg_manifest(),
            Some(PathBuf::from("/repo/app/www/js/package.json"))
        );
        assert_eq!(
            layout.lock_path(),
            PathBuf::from("/repo/app/.prepare/prepare.lock")
        );
    }

    #[test]
    fn stylesheet_only_variant_has_no_module_dir() {
        let config = PrepareConfig {
            stylesheet: PathBuf::from("index.css"),
            css_dir: PathBuf::from("www/css"),
            module: None,
            bootstrap: BootstrapConfig::default(),
        };
        let layout = BundleLayout::new(Path::new("/repo/app"), &config);

        assert!(layout.module_dir.is_none());
        assert!(layout.pkg_manifest().is_none());
        assert_eq!(layout.crate_dir, PathBuf::from("/repo/app"));
    }
}
