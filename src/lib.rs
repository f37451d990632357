//! Shared infrastructure for preparing hybrid app web bundles.
//!
//! This crate provides the host-side tooling that turns a checked-out
//! project into a loadable web bundle before the native packaging step
//! runs. It covers:
//!
//! - **Preparation pipeline** - Stylesheet staging, wasm module builds, and
//!   bundle cleanup as an ordered plan with per-step failure policy
//! - **Artifact contract** - The loader/binary pair a packaged module must
//!   ship, plus verification of both halves
//! - **Startup sequencing** - Device-ready gating and the load/init/entry
//!   order the packaged module is driven through
//! - **Run reporting** - A JSON report and artifact inventory for every run
//!
//! # Architecture
//!
//! ```text
//! bundle-builder (this crate)
//!     │
//!     ├── config     Prepare.toml parsing and variant validation
//!     ├── bundle     resolved on-disk layout of one project
//!     ├── pipeline   plan derivation and the run driver
//!     │     ├── stylesheet   copy step
//!     │     ├── wasm         wasm-pack invocation
//!     │     └── manifest     package manifest removal
//!     ├── artifact   loader/binary contract and verification
//!     ├── bootstrap  device-ready startup sequence
//!     └── report     run reports and artifact inventory
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use bundle_builder::{load_prepare_config, run_prepare};
//! use std::path::Path;
//!
//! let root = Path::new("app");
//! let config = load_prepare_config(&root.join("Prepare.toml"))?;
//! let report = run_prepare(root, &config)?;
//! println!("prepare finished: {}", report.status);
//! ```

pub mod artifact;
pub mod bootstrap;
pub mod bundle;
pub mod config;
pub mod pipeline;
pub mod preflight;
pub mod report;

pub use bundle::BundleLayout;
pub use config::{load_prepare_config, PrepareConfig};
pub use pipeline::{build_prepare_plan, run_prepare, FailurePolicy, PrepareOp};
