//! Per-run prepare reports.
//!
//! Every pipeline run writes `<root>/.prepare/prepare-report.json`, aborted
//! runs included, so packaging orchestrators can see what happened without
//! scraping console output. The report carries per-step outcomes and an
//! inventory of the bundle files the run touched.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use walkdir::WalkDir;

pub const REPORT_FILENAME: &str = "prepare-report.json";

/// Outcome of a single pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub name: String,
    /// "success", "failed" or "skipped".
    pub status: String,
    #[serde(default)]
    pub detail: Option<String>,
}

/// One tracked bundle file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// Path relative to the project root.
    pub path: String,
    pub size_bytes: u64,
    pub sha256: String,
}

/// Report written at the end of every prepare run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareReport {
    pub schema: u32,
    /// "success", "degraded" (a tolerated step failed) or "failed".
    pub status: String,
    pub created_at_utc: String,
    pub finished_at_utc: Option<String>,
    pub steps: Vec<StepReport>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactEntry>,
}

/// Report location inside a run-state directory.
pub fn report_path(state_dir: &Path) -> PathBuf {
    state_dir.join(REPORT_FILENAME)
}

pub fn write_report(path: &Path, report: &PrepareReport) -> Result<()> {
    write_json_atomic(path, report)
        .with_context(|| format!("writing prepare report '{}'", path.display()))
}

pub fn load_report(path: &Path) -> Result<PrepareReport> {
    let bytes =
        fs::read(path).with_context(|| format!("reading prepare report '{}'", path.display()))?;
    let report: PrepareReport = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing prepare report '{}'", path.display()))?;
    Ok(report)
}

/// Inventory the bundle directories a run touched.
///
/// Unreadable files are skipped; a file vanishing mid-scan must not sink
/// the report.
pub fn collect_artifacts(root: &Path, dirs: &[PathBuf]) -> Vec<ArtifactEntry> {
    let mut out = Vec::new();
    for dir in dirs {
        if !dir.is_dir() {
            continue;
        }
        for ent in WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_map(Result::ok)
        {
            if !ent.file_type().is_file() {
                continue;
            }
            let Ok((sha256, size_bytes)) = sha256_file(ent.path()) else {
                continue;
            };
            let rel = ent.path().strip_prefix(root).unwrap_or(ent.path());
            out.push(ArtifactEntry {
                path: rel.to_string_lossy().replace('\\', "/"),
                size_bytes,
                sha256,
            });
        }
    }
    out.sort_by(|a, b| a.path.cmp(&b.path));
    out
}

pub(crate) fn now_utc_compact() -> String {
    let now = OffsetDateTime::now_utc();
    format!(
        "{:04}{:02}{:02}T{:02}{:02}{:02}Z",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow!("path without parent '{}'", path.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("creating parent directory '{}'", parent.display()))?;
    let tmp = path.with_extension(format!("tmp-{}", std::process::id()));
    let payload = serde_json::to_vec_pretty(value).with_context(|| "serializing prepare report")?;
    fs::write(&tmp, payload).with_context(|| format!("writing temp file '{}'", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| {
        format!(
            "renaming temp file '{}' to '{}'",
            tmp.display(),
            path.display()
        )
    })?;
    Ok(())
}

fn sha256_file(path: &Path) -> Result<(String, u64)> {
    let f = File::open(path).with_context(|| format!("opening '{}'", path.display()))?;
    let mut r = BufReader::new(f);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let n = r.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    let sha = format!("{:x}", hasher.finalize());
    Ok((sha, size))
}
