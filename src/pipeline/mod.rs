//! Bundle preparation pipeline.
//!
//! Derives an ordered operation plan from the variant config and applies it
//! with a per-operation failure policy. A broken stylesheet copy aborts the
//! run; a failed module build is recorded and the run carries on, so the
//! packaging step that follows can still inspect the bundle.
//!
//! Runs are exclusive per project root. A lock file under `.prepare/`
//! rejects concurrent invocations, and every run (aborted ones included)
//! leaves a report behind.

pub mod manifest;
pub mod stylesheet;
pub mod wasm;

use anyhow::{bail, Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::artifact;
use crate::bundle::BundleLayout;
use crate::config::PrepareConfig;
use crate::pipeline::wasm::ModuleBuildSpec;
use crate::report::{self, PrepareReport, StepReport};

/// How a failed operation affects the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the run; later operations are skipped.
    Abort,
    /// Record the failure and keep going.
    Continue,
}

/// One operation of a prepare plan.
#[derive(Debug, Clone)]
pub enum PrepareOp {
    CopyStylesheet {
        source: PathBuf,
        css_dir: PathBuf,
    },
    BuildModule {
        spec: ModuleBuildSpec,
    },
    RemovePkgManifest {
        manifest: PathBuf,
        optional: bool,
    },
}

impl PrepareOp {
    /// Step name used in logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            PrepareOp::CopyStylesheet { .. } => "copy-stylesheet",
            PrepareOp::BuildModule { .. } => "build-module",
            PrepareOp::RemovePkgManifest { .. } => "remove-pkg-manifest",
        }
    }

    /// Whether a failure aborts the run.
    ///
    /// The module build is the only tolerated failure: the bundle is still
    /// inspectable without a fresh module, while a missing stylesheet or a
    /// cleanup error means the bundle itself is broken.
    pub fn failure_policy(&self) -> FailurePolicy {
        match self {
            PrepareOp::BuildModule { .. } => FailurePolicy::Continue,
            _ => FailurePolicy::Abort,
        }
    }
}

/// Derive the ordered operation plan for a variant.
pub fn build_prepare_plan(config: &PrepareConfig, layout: &BundleLayout) -> Vec<PrepareOp> {
    let mut plan = vec![PrepareOp::CopyStylesheet {
        source: layout.stylesheet_source.clone(),
        css_dir: layout.css_dir.clone(),
    }];

    if let Some(module) = &config.module {
        if let Some(out_dir) = &layout.module_dir {
            plan.push(PrepareOp::BuildModule {
                spec: ModuleBuildSpec {
                    name: module.name.clone(),
                    crate_dir: layout.crate_dir.clone(),
                    out_dir: out_dir.clone(),
                    features: module.features.clone(),
                    release: module.release,
                },
            });
            if module.remove_pkg_manifest {
                plan.push(PrepareOp::RemovePkgManifest {
                    manifest: artifact::pkg_manifest_path(out_dir),
                    optional: module.pkg_manifest_optional,
                });
            }
        }
    }

    plan
}

/// Run the full pipeline for one variant.
///
/// Returns the report for completed runs, including degraded ones where
/// the module build failed. Aborted runs return the aborting error after
/// the report is written.
pub fn run_prepare(root: &Path, config: &PrepareConfig) -> Result<PrepareReport> {
    let layout = BundleLayout::new(root, config);
    let _lock = acquire_run_lock(&layout)?;

    let created_at_utc = report::now_utc_compact();
    let plan = build_prepare_plan(config, &layout);
    println!(
        "Preparing bundle at {} ({} steps)",
        root.display(),
        plan.len()
    );

    let mut steps = Vec::new();
    let mut abort_error: Option<anyhow::Error> = None;
    let mut degraded = false;

    for op in &plan {
        if abort_error.is_some() {
            steps.push(StepReport {
                name: op.name().to_string(),
                status: "skipped".to_string(),
                detail: None,
            });
            continue;
        }

        match apply_op(op) {
            Ok(detail) => steps.push(StepReport {
                name: op.name().to_string(),
                status: "success".to_string(),
                detail,
            }),
            Err(err) => {
                steps.push(StepReport {
                    name: op.name().to_string(),
                    status: "failed".to_string(),
                    detail: Some(format!("{err:#}")),
                });
                match op.failure_policy() {
                    FailurePolicy::Continue => {
                        eprintln!("  [WARN] {} failed ({err:#}); continuing", op.name());
                        degraded = true;
                    }
                    FailurePolicy::Abort => abort_error = Some(err),
                }
            }
        }
    }

    let status = if abort_error.is_some() {
        "failed"
    } else if degraded {
        "degraded"
    } else {
        "success"
    };

    let mut inventory_dirs = vec![layout.css_dir.clone()];
    if let Some(module_dir) = &layout.module_dir {
        inventory_dirs.push(module_dir.clone());
    }

    let prepare_report = PrepareReport {
        schema: 1,
        status: status.to_string(),
        created_at_utc,
        finished_at_utc: Some(report::now_utc_compact()),
        steps,
        artifacts: report::collect_artifacts(root, &inventory_dirs),
    };

    let report_file = report::report_path(&layout.state_dir);
    let write_result = report::write_report(&report_file, &prepare_report);

    match abort_error {
        Some(err) => {
            if let Err(write_err) = write_result {
                eprintln!("  [WARN] failed to write prepare report ({write_err:#})");
            }
            Err(err.context(format!("preparing bundle at '{}'", root.display())))
        }
        None => {
            write_result?;
            println!("  Report: {}", report_file.display());
            Ok(prepare_report)
        }
    }
}

fn apply_op(op: &PrepareOp) -> Result<Option<String>> {
    match op {
        PrepareOp::CopyStylesheet { source, css_dir } => {
            let dest = stylesheet::copy_stylesheet(source, css_dir)?;
            Ok(Some(format!("copied to {}", dest.display())))
        }
        PrepareOp::BuildModule { spec } => {
            wasm::build_module(spec)?;
            Ok(Some(format!("built {}", spec.name)))
        }
        PrepareOp::RemovePkgManifest { manifest, optional } => {
            let removed = manifest::remove_pkg_manifest(manifest, *optional)?;
            Ok(Some(if removed {
                format!("removed {}", manifest.display())
            } else {
                "nothing to remove".to_string()
            }))
        }
    }
}

/// RAII guard: unlocks and removes the lock file on drop.
struct RunLock {
    _file: File,
    path: PathBuf,
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn acquire_run_lock(layout: &BundleLayout) -> Result<RunLock> {
    let lock_path = layout.lock_path();
    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating run-state directory '{}'", parent.display()))?;
    }

    // Do not unlink stale lock files. Unlinking a still-locked file would let
    // a second process create a new file at the same path and acquire a
    // separate exclusive lock.
    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .with_context(|| format!("creating lock file '{}'", lock_path.display()))?;

    if lock_file.try_lock_exclusive().is_err() {
        drop(lock_file);
        bail!(
            "another prepare run is active for this project: {}",
            lock_path.display()
        );
    }

    Ok(RunLock {
        _file: lock_file,
        path: lock_path,
    })
}
