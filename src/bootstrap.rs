//! Device-ready startup sequencing.
//!
//! Hybrid shells fire a one-shot lifecycle signal once the native layer is
//! usable. Startup blocks on that signal, then runs a fixed sequence:
//! optional background-execution request, module load, module init, entry
//! call. There is no retry and no timeout; a failure at any point surfaces
//! as the error of the whole startup.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

use crate::artifact::ModuleArtifact;

/// Signals delivered by the hosting shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The native layer is ready; startup may begin.
    DeviceReady,
}

/// Background-execution request passed to the host.
#[derive(Debug, Clone, Copy)]
pub struct BackgroundMode {
    /// Suppress any host notification about the mode change.
    pub silent: bool,
}

/// Host-side capabilities the startup sequence may call on.
pub trait HostShell {
    fn enable_background_mode(&mut self, mode: BackgroundMode) -> Result<()>;
}

/// Host with no native capabilities. Requests are logged and dropped.
pub struct NullHost;

impl HostShell for NullHost {
    fn enable_background_mode(&mut self, mode: BackgroundMode) -> Result<()> {
        println!(
            "  Background mode requested (silent: {}); host has no such capability, ignoring",
            mode.silent
        );
        Ok(())
    }
}

/// A loaded application module.
///
/// `init` must complete before `main` is called; `main` takes no arguments
/// and hands control to the application.
pub trait AppModule {
    fn init(&mut self) -> Result<()>;
    fn main(&mut self);
}

/// Produces the application module during startup.
pub trait ModuleLoader {
    type Module: AppModule;

    fn load(&mut self) -> Result<Self::Module>;
}

/// One-shot startup driver.
///
/// `run` consumes the driver, so the sequence executes at most once per
/// instance no matter how the caller handles the result.
pub struct Bootstrap<L, H> {
    loader: L,
    host: H,
    background: Option<BackgroundMode>,
}

impl<L: ModuleLoader, H: HostShell> Bootstrap<L, H> {
    pub fn new(loader: L, host: H) -> Self {
        Bootstrap {
            loader,
            host,
            background: None,
        }
    }

    /// Request background execution before the module is loaded.
    pub fn background(mut self, mode: BackgroundMode) -> Self {
        self.background = Some(mode);
        self
    }

    /// Block until the device-ready signal, then run the startup sequence.
    pub fn run(self, events: &Receiver<LifecycleEvent>) -> Result<()> {
        let event = events
            .recv()
            .context("lifecycle channel closed before device-ready")?;
        match event {
            LifecycleEvent::DeviceReady => self.start(),
        }
    }

    fn start(mut self) -> Result<()> {
        if let Some(mode) = self.background {
            self.host
                .enable_background_mode(mode)
                .context("enabling background mode")?;
        }
        let mut module = self.loader.load().context("loading module")?;
        module.init().context("initializing module")?;
        module.main();
        Ok(())
    }
}

/// Loads the packaged module from a bundle's module directory.
pub struct ArtifactLoader {
    module_dir: PathBuf,
    name: String,
}

impl ArtifactLoader {
    pub fn new(module_dir: &Path, name: &str) -> Self {
        ArtifactLoader {
            module_dir: module_dir.to_path_buf(),
            name: name.to_string(),
        }
    }
}

impl ModuleLoader for ArtifactLoader {
    type Module = PackagedModule;

    fn load(&mut self) -> Result<Self::Module> {
        let artifact = ModuleArtifact::locate(&self.module_dir, &self.name)?;
        Ok(PackagedModule { artifact })
    }
}

/// Host-side stand-in for the packaged module.
///
/// Init verifies the on-disk artifact pair the way the real loader would
/// refuse a broken one; entry only reports that it was reached.
pub struct PackagedModule {
    artifact: ModuleArtifact,
}

impl AppModule for PackagedModule {
    fn init(&mut self) -> Result<()> {
        self.artifact.verify()
    }

    fn main(&mut self) {
        println!("  Module '{}' entry reached", self.artifact.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;
    use std::sync::mpsc;
    use tempfile::TempDir;

    type Log = Rc<RefCell<Vec<String>>>;

    struct RecordingHost {
        log: Log,
    }

    impl HostShell for RecordingHost {
        fn enable_background_mode(&mut self, mode: BackgroundMode) -> Result<()> {
            self.log
                .borrow_mut()
                .push(format!("background(silent={})", mode.silent));
            Ok(())
        }
    }

    struct ScriptedModule {
        log: Log,
        fail_init: bool,
    }

    impl AppModule for ScriptedModule {
        fn init(&mut self) -> Result<()> {
            self.log.borrow_mut().push("init".to_string());
            if self.fail_init {
                anyhow::bail!("init exploded");
            }
            Ok(())
        }

        fn main(&mut self) {
            self.log.borrow_mut().push("main".to_string());
        }
    }

    struct ScriptedLoader {
        log: Log,
        fail_load: bool,
        fail_init: bool,
    }

    impl ModuleLoader for ScriptedLoader {
        type Module = ScriptedModule;

        fn load(&mut self) -> Result<Self::Module> {
            self.log.borrow_mut().push("load".to_string());
            if self.fail_load {
                anyhow::bail!("load exploded");
            }
            Ok(ScriptedModule {
                log: self.log.clone(),
                fail_init: self.fail_init,
            })
        }
    }

    fn scripted(log: &Log, fail_load: bool, fail_init: bool) -> Bootstrap<ScriptedLoader, RecordingHost> {
        Bootstrap::new(
            ScriptedLoader {
                log: log.clone(),
                fail_load,
                fail_init,
            },
            RecordingHost { log: log.clone() },
        )
    }

    fn ready_channel() -> Receiver<LifecycleEvent> {
        let (tx, rx) = mpsc::channel();
        tx.send(LifecycleEvent::DeviceReady).unwrap();
        rx
    }

    #[test]
    fn background_mode_runs_before_load() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let rx = ready_channel();

        scripted(&log, false, false)
            .background(BackgroundMode { silent: true })
            .run(&rx)
            .unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["background(silent=true)", "load", "init", "main"]
        );
    }

    #[test]
    fn background_mode_is_skipped_unless_requested() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let rx = ready_channel();

        scripted(&log, false, false).run(&rx).unwrap();

        assert_eq!(*log.borrow(), vec!["load", "init", "main"]);
    }

    #[test]
    fn failed_init_never_reaches_entry() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let rx = ready_channel();

        let err = scripted(&log, false, true).run(&rx).unwrap_err();

        assert!(format!("{err:#}").contains("initializing module"));
        assert_eq!(*log.borrow(), vec!["load", "init"]);
    }

    #[test]
    fn failed_load_never_initializes() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let rx = ready_channel();

        let err = scripted(&log, true, false).run(&rx).unwrap_err();

        assert!(format!("{err:#}").contains("loading module"));
        assert_eq!(*log.borrow(), vec!["load"]);
    }

    #[test]
    fn closed_channel_before_device_ready_is_an_error() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let (tx, rx) = mpsc::channel::<LifecycleEvent>();
        drop(tx);

        let err = scripted(&log, false, false).run(&rx).unwrap_err();

        assert!(format!("{err:#}").contains("lifecycle channel closed"));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn artifact_loader_boots_a_packaged_module() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        fs::write(
            dir.join("app_gui.js"),
            "export default __wbg_init;\nexport function main() {}\n",
        )
        .unwrap();
        let mut wasm = vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];
        wasm.extend_from_slice(&[0x00; 8]);
        fs::write(dir.join("app_gui_bg.wasm"), &wasm).unwrap();

        let rx = ready_channel();
        Bootstrap::new(ArtifactLoader::new(dir, "app_gui"), NullHost)
            .run(&rx)
            .unwrap();
    }

    #[test]
    fn artifact_loader_rejects_a_corrupt_binary() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        fs::write(
            dir.join("app_gui.js"),
            "export default __wbg_init;\nexport function main() {}\n",
        )
        .unwrap();
        fs::write(dir.join("app_gui_bg.wasm"), b"not wasm").unwrap();

        let rx = ready_channel();
        let err = Bootstrap::new(ArtifactLoader::new(dir, "app_gui"), NullHost)
            .run(&rx)
            .unwrap_err();

        assert!(format!("{err:#}").contains("initializing module"));
    }
}
