//! Modpack Installer Library
//!
//! Installs a modpack from a manifest: every referenced resource is
//! resolved against the project host (following its redirect chain by
//! hand), streamed into the pack's resources directory, and recorded in a
//! per-pack index so that later runs replace superseded files instead of
//! piling them up. Override files from the pack are merged over the game
//! directory afterwards.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use modpack_installer::{InstallerConfig, PackInstaller, ProgressEvent};
//! use std::sync::Arc;
//!
//! # async fn example() -> modpack_installer::Result<()> {
//! let config = InstallerConfig::from_env()?;
//!
//! let progress_callback = Arc::new(|event: ProgressEvent| {
//!     if let ProgressEvent::ResourceInstalled { file_name, .. } = event {
//!         println!("Installed {}", file_name);
//!     }
//! });
//!
//! let installer = PackInstaller::new(config, ".")?.with_progress(progress_callback);
//! let outcome = installer.install("mods.txt").await?;
//! println!(
//!     "{} installed, {} skipped",
//!     outcome.report.installed_count, outcome.report.skipped_count
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Inputs
//!
//! - **Structured manifest**: `manifest.json`, installed next to itself
//! - **Archive**: a zip with a manifest and overrides, unpacked under `packs/`
//! - **Mod-list**: `key=value` settings plus one project URL per line
//! - **Installer file**: `.ccip` XML naming a single pack file
//! - **Pack URL**: a hosted pack page; the latest file is fetched

pub mod config;
pub mod error;
pub mod index;
pub mod layout;
pub mod locator;
pub mod manifest;
pub mod pack;
pub mod progress;
pub mod sync;

pub use config::{InstallerConfig, InstallerConfigBuilder};
pub use error::{FileOperation, InstallError, Result};
pub use index::InstallIndex;
pub use layout::{PackLayout, normalize_pack_name};
pub use locator::{Resolution, ResourceLocator, ResourceResolver, SkipReason};
pub use manifest::{
    BuiltManifest, Manifest, ManifestBuilder, ModList, PackInput, Requirements, ResourceReference,
};
pub use pack::{InstallOutcome, PackInstaller};
pub use progress::{
    IntoProgressCallback, NullProgressReporter, ProgressCallback, ProgressEvent, ProgressReporter,
};
pub use sync::{SyncEngine, SyncReport};

#[cfg(test)]
mod tests;
