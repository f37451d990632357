use std::path::{Path, PathBuf};
use std::sync::mpsc;

use anyhow::{bail, Result};
use bundle_builder::bootstrap::{
    ArtifactLoader, BackgroundMode, Bootstrap, LifecycleEvent, NullHost,
};
use bundle_builder::bundle::STATE_DIR;
use bundle_builder::config::PREPARE_CONFIG_FILENAME;
use bundle_builder::preflight::check_host_tools;
use bundle_builder::report;
use bundle_builder::{load_prepare_config, run_prepare, BundleLayout};

fn usage() -> &'static str {
    "Usage:\n  bundle-builder prepare <project_root> [config_toml]\n  bundle-builder smoke <project_root> [config_toml]\n  bundle-builder report <project_root>\n  bundle-builder preflight"
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.as_slice() {
        [cmd, root] if cmd == "prepare" => prepare(Path::new(root), None),
        [cmd, root, config] if cmd == "prepare" => {
            prepare(Path::new(root), Some(Path::new(config)))
        }
        [cmd, root] if cmd == "smoke" => smoke(Path::new(root), None),
        [cmd, root, config] if cmd == "smoke" => smoke(Path::new(root), Some(Path::new(config))),
        [cmd, root] if cmd == "report" => show_report(Path::new(root)),
        [cmd] if cmd == "preflight" => preflight(),
        _ => bail!(usage()),
    }
}

fn config_path_for(root: &Path, config_override: Option<&Path>) -> PathBuf {
    match config_override {
        Some(path) => path.to_path_buf(),
        None => root.join(PREPARE_CONFIG_FILENAME),
    }
}

fn prepare(root: &Path, config_override: Option<&Path>) -> Result<()> {
    if !root.is_dir() {
        bail!("project root not found: '{}'", root.display());
    }

    let config = load_prepare_config(&config_path_for(root, config_override))?;
    let prepare_report = run_prepare(root, &config)?;

    match prepare_report.status.as_str() {
        "degraded" => {
            println!("Prepare finished degraded; the module build failed but the bundle was cleaned")
        }
        status => println!("Prepare finished: {status}"),
    }
    Ok(())
}

fn smoke(root: &Path, config_override: Option<&Path>) -> Result<()> {
    if !root.is_dir() {
        bail!("project root not found: '{}'", root.display());
    }

    let config = load_prepare_config(&config_path_for(root, config_override))?;
    let layout = BundleLayout::new(root, &config);
    let (Some(module), Some(module_dir)) = (config.module.as_ref(), layout.module_dir.as_deref())
    else {
        bail!("variant has no module section; nothing to smoke test");
    };

    let (events_tx, events_rx) = mpsc::channel();
    if events_tx.send(LifecycleEvent::DeviceReady).is_err() {
        bail!("lifecycle receiver dropped before the device-ready signal was queued");
    }

    let boot = Bootstrap::new(ArtifactLoader::new(module_dir, &module.name), NullHost);
    let boot = if config.bootstrap.background_mode {
        boot.background(BackgroundMode {
            silent: config.bootstrap.silent,
        })
    } else {
        boot
    };
    boot.run(&events_rx)?;

    println!("Smoke startup passed for module '{}'", module.name);
    Ok(())
}

fn show_report(root: &Path) -> Result<()> {
    let report_file = report::report_path(&root.join(STATE_DIR));
    let prepare_report = report::load_report(&report_file)?;

    println!("Prepare report for {}", root.display());
    println!("  Status:   {}", prepare_report.status);
    println!("  Started:  {}", prepare_report.created_at_utc);
    if let Some(finished) = &prepare_report.finished_at_utc {
        println!("  Finished: {finished}");
    }
    println!("  Steps:");
    for step in &prepare_report.steps {
        match &step.detail {
            Some(detail) => println!("    [{}] {} ({detail})", step.status, step.name),
            None => println!("    [{}] {}", step.status, step.name),
        }
    }
    if !prepare_report.artifacts.is_empty() {
        println!("  Artifacts:");
        for artifact in &prepare_report.artifacts {
            println!(
                "    {} ({} bytes, sha256 {})",
                artifact.path, artifact.size_bytes, artifact.sha256
            );
        }
    }
    Ok(())
}

fn preflight() -> Result<()> {
    check_host_tools()?;
    println!("All required host tools found");
    Ok(())
}
