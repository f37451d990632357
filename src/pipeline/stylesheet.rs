//! Stylesheet copy step.

use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Copy the variant stylesheet into the bundle CSS directory.
///
/// The CSS directory must already exist: a missing directory means the
/// bundle skeleton is broken, and creating it here would hide that. An
/// existing destination file is overwritten byte for byte.
///
/// Returns the destination path.
pub fn copy_stylesheet(source: &Path, css_dir: &Path) -> Result<PathBuf> {
    if !source.is_file() {
        bail!("stylesheet source not found: {}", source.display());
    }
    if !css_dir.is_dir() {
        bail!("bundle CSS directory not found: {}", css_dir.display());
    }

    let file_name = source
        .file_name()
        .ok_or_else(|| anyhow!("stylesheet path has no file name: {}", source.display()))?;
    let dest = css_dir.join(file_name);

    println!("  Copying `{}` -> `{}`", source.display(), dest.display());
    fs::copy(source, &dest).with_context(|| {
        format!(
            "copying stylesheet from '{}' to '{}'",
            source.display(),
            dest.display()
        )
    })?;

    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copies_stylesheet_bytes() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("index.css");
        let css_dir = tmp.path().join("www/css");
        fs::write(&source, "body { color: red; }").unwrap();
        fs::create_dir_all(&css_dir).unwrap();

        let dest = copy_stylesheet(&source, &css_dir).unwrap();

        assert_eq!(dest, css_dir.join("index.css"));
        assert_eq!(
            fs::read_to_string(&dest).unwrap(),
            "body { color: red; }"
        );
    }

    #[test]
    fn overwrites_existing_destination() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("index.css");
        let css_dir = tmp.path().join("www/css");
        fs::write(&source, "body { color: red; }").unwrap();
        fs::create_dir_all(&css_dir).unwrap();
        fs::write(css_dir.join("index.css"), "body { color: blue; }").unwrap();

        copy_stylesheet(&source, &css_dir).unwrap();

        assert_eq!(
            fs::read_to_string(css_dir.join("index.css")).unwrap(),
            "body { color: red; }"
        );
    }

    #[test]
    fn missing_source_leaves_destination_untouched() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("index.css");
        let css_dir = tmp.path().join("www/css");
        fs::create_dir_all(&css_dir).unwrap();

        let err = copy_stylesheet(&source, &css_dir).unwrap_err();

        assert!(format!("{err:#}").contains("stylesheet source not found"));
        assert!(!css_dir.join("index.css").exists());
    }

    #[test]
    fn missing_css_dir_is_not_created() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("index.css");
        let css_dir = tmp.path().join("www/css");
        fs::write(&source, "body {}").unwrap();

        let err = copy_stylesheet(&source, &css_dir).unwrap_err();

        assert!(format!("{err:#}").contains("bundle CSS directory not found"));
        assert!(!css_dir.exists());
    }
}
