//! End-to-end install: classify input, build the manifest, sync it

use std::path::PathBuf;

use tracing::info;

use crate::config::InstallerConfig;
use crate::error::Result;
use crate::layout::PackLayout;
use crate::locator::ResourceLocator;
use crate::manifest::{Manifest, ManifestBuilder, PackInput};
use crate::progress::ProgressCallback;
use crate::sync::{SyncEngine, SyncReport};

/// Everything an install produced
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub manifest: Manifest,
    pub layout: PackLayout,
    pub report: SyncReport,
}

/// High-level entry point tying the manifest builder to the sync engine
pub struct PackInstaller {
    config: InstallerConfig,
    locator: ResourceLocator,
    install_root: PathBuf,
    progress_callback: Option<ProgressCallback>,
}

impl PackInstaller {
    /// `install_root` is where unpacked packs are placed (under `packs/`)
    pub fn new<P: Into<PathBuf>>(config: InstallerConfig, install_root: P) -> Result<Self> {
        let locator = ResourceLocator::new(&config)?;
        Ok(Self {
            config,
            locator,
            install_root: install_root.into(),
            progress_callback: None,
        })
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// Install from a manifest path, archive, mod-list, `.ccip` file or pack URL
    pub async fn install(&self, input: &str) -> Result<InstallOutcome> {
        let input = PackInput::detect(input).await;
        info!("Installing from {:?}", input);

        let built = ManifestBuilder::new(&self.config, &self.locator, &self.install_root)
            .with_progress(self.progress_callback.clone())
            .build(&input)
            .await?;

        let report = SyncEngine::new(&self.locator)
            .with_progress(self.progress_callback.clone())
            .sync(&built.manifest, &built.layout)
            .await?;

        Ok(InstallOutcome {
            manifest: built.manifest,
            layout: built.layout,
            report,
        })
    }
}
