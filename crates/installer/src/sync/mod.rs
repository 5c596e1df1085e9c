//! Manifest-driven synchronization
//!
//! For each reference the engine resolves a file, records it in the
//! install index and deletes the file it replaces. Per-resource failures
//! are counted as skips and never abort the run; only manifest problems
//! and filesystem failures on the pack itself are fatal.

pub mod overrides;

use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{FileOperation, InstallError, Result};
use crate::index::InstallIndex;
use crate::layout::PackLayout;
use crate::locator::{Resolution, ResourceResolver, SkipReason};
use crate::manifest::{Manifest, ResourceReference};
use crate::progress::{self, ProgressCallback, ProgressEvent};

/// Summary of one sync run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Resources downloaded during this run
    pub installed_count: usize,
    /// Resources not downloaded (missing, unknown size, already present, failed)
    pub skipped_count: usize,
    /// Stale files removed because a project resolved to a new file
    pub superseded_count: usize,
    /// Override files copied into the game directory
    pub override_files: usize,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.installed_count + self.skipped_count
    }
}

pub struct SyncEngine<'a> {
    resolver: &'a dyn ResourceResolver,
    progress_callback: Option<ProgressCallback>,
}

impl<'a> SyncEngine<'a> {
    pub fn new(resolver: &'a dyn ResourceResolver) -> Self {
        Self {
            resolver,
            progress_callback: None,
        }
    }

    pub fn with_progress(mut self, callback: Option<ProgressCallback>) -> Self {
        self.progress_callback = callback;
        self
    }

    /// Bring `layout` in line with `manifest`
    pub async fn sync(&self, manifest: &Manifest, layout: &PackLayout) -> Result<SyncReport> {
        manifest.validate()?;
        info!(
            "Starting setup of modpack {}, version {} - created by {}",
            manifest.name, manifest.version, manifest.author
        );

        let resources_dir = layout.resources_dir();
        fs::create_dir_all(&resources_dir)
            .await
            .map_err(InstallError::fs(&resources_dir, FileOperation::CreateDir))?;

        let index_path = layout.index_path();
        let mut index = InstallIndex::load(&index_path).await?;
        let mut report = SyncReport::default();
        let total = manifest.references.len();

        for (position, reference) in manifest.references.iter().enumerate() {
            self.emit(ProgressEvent::ResourceStarted {
                index: position + 1,
                total,
                reference: reference.clone(),
            });

            let resolution = match self
                .resolver
                .resolve(reference, &resources_dir, self.progress_callback.clone())
                .await
            {
                Ok(resolution) => resolution,
                Err(e) => {
                    warn!("Resource {} skipped due to errors: {} ({})", reference, e, e.category());
                    report.skipped_count += 1;
                    self.emit(ProgressEvent::ResourceSkipped {
                        reference: reference.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match resolution {
                Resolution::Resolved { file_name, .. } => {
                    report.installed_count += 1;
                    self.supersede(&mut index, reference, &file_name, &resources_dir, &mut report)
                        .await;
                    self.emit(ProgressEvent::ResourceInstalled {
                        reference: reference.clone(),
                        file_name,
                    });
                }
                Resolution::Skipped(reason) => {
                    report.skipped_count += 1;
                    if let SkipReason::AlreadyPresent { file_name } = &reason {
                        self.supersede(&mut index, reference, file_name, &resources_dir, &mut report)
                            .await;
                    }
                    debug!("Resource {} skipped: {}", reference, reason.describe());
                    self.emit(ProgressEvent::ResourceSkipped {
                        reference: reference.clone(),
                        reason: reason.describe(),
                    });
                }
            }
        }

        info!(
            "Finished downloading files. {} installed, {} skipped.",
            report.installed_count, report.skipped_count
        );

        if let Some(overrides_dir) = layout.overrides_dir(manifest) {
            if overrides_dir.is_dir() {
                info!("Installing game files from {}", overrides_dir.display());
                report.override_files =
                    overrides::apply_overrides(&overrides_dir, &layout.game_dir()).await?;
                self.emit(ProgressEvent::OverridesApplied {
                    files: report.override_files,
                });
            } else {
                warn!("Overrides directory {} does not exist, skipping", overrides_dir.display());
                self.emit(ProgressEvent::Warning {
                    message: format!("overrides directory {} is missing", overrides_dir.display()),
                });
            }
        }

        index.persist(&index_path).await?;
        Ok(report)
    }

    /// Record the new file and delete the one it replaces, if any
    async fn supersede(
        &self,
        index: &mut InstallIndex,
        reference: &ResourceReference,
        file_name: &str,
        resources_dir: &Path,
        report: &mut SyncReport,
    ) {
        let Some(old_file) = index.record_and_supersede(&reference.project_id, file_name) else {
            return;
        };

        let old_path = resources_dir.join(&old_file);
        match fs::remove_file(&old_path).await {
            Ok(()) => {
                info!("Removed superseded {} (replaced by {})", old_file, file_name);
                report.superseded_count += 1;
                self.emit(ProgressEvent::Superseded {
                    project_id: reference.project_id.clone(),
                    old_file,
                    new_file: file_name.to_string(),
                });
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Superseded file {} was already gone", old_path.display());
            }
            Err(e) => {
                warn!("Could not remove superseded file {}: {}", old_path.display(), e);
            }
        }
    }

    fn emit(&self, event: ProgressEvent) {
        progress::emit(self.progress_callback.as_ref(), event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstallerConfig;
    use crate::manifest::GameRequirements;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Resolver that writes canned file names instead of touching the network
    struct CannedResolver {
        outcomes: Mutex<HashMap<String, Result<Resolution>>>,
    }

    impl CannedResolver {
        fn new(outcomes: Vec<(&str, Result<Resolution>)>) -> Self {
            Self {
                outcomes: Mutex::new(
                    outcomes.into_iter().map(|(id, r)| (id.to_string(), r)).collect(),
                ),
            }
        }
    }

    #[async_trait]
    impl ResourceResolver for CannedResolver {
        async fn resolve(
            &self,
            reference: &ResourceReference,
            resources_dir: &Path,
            _progress_callback: Option<ProgressCallback>,
        ) -> Result<Resolution> {
            let outcome = self
                .outcomes
                .lock()
                .unwrap()
                .remove(&reference.project_id)
                .expect("unexpected reference");
            if let Ok(Resolution::Resolved { file_name, .. }) = &outcome {
                std::fs::write(resources_dir.join(file_name), b"jar").unwrap();
            }
            outcome
        }
    }

    fn manifest(ids: &[&str]) -> Manifest {
        Manifest {
            name: "Test".to_string(),
            version: "1.0.0".to_string(),
            author: "tester".to_string(),
            manifest_type: None,
            manifest_version: None,
            minecraft: GameRequirements::default(),
            references: ids.iter().map(|id| ResourceReference::new(*id, "1")).collect(),
            overrides: None,
        }
    }

    fn resolved(name: &str) -> Result<Resolution> {
        Ok(Resolution::Resolved { file_name: name.to_string(), size: 3 })
    }

    #[tokio::test]
    async fn test_transport_errors_count_as_skips() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PackLayout::new(dir.path(), &InstallerConfig::default());
        let resolver = CannedResolver::new(vec![
            ("1", resolved("a.jar")),
            ("2", Err(InstallError::HttpStatus { url: "http://x".to_string(), status: 500 })),
            ("3", Ok(Resolution::Skipped(SkipReason::NotFound { url: "http://x".to_string() }))),
        ]);

        let report = SyncEngine::new(&resolver).sync(&manifest(&["1", "2", "3"]), &layout).await.unwrap();

        assert_eq!(report.installed_count, 1);
        assert_eq!(report.skipped_count, 2);
        let index = InstallIndex::load(&layout.index_path()).await.unwrap();
        assert_eq!(index.get("1"), Some("a.jar"));
        assert_eq!(index.get("2"), None);
    }

    #[tokio::test]
    async fn test_already_present_is_indexed_but_not_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PackLayout::new(dir.path(), &InstallerConfig::default());
        std::fs::create_dir_all(layout.resources_dir()).unwrap();
        std::fs::write(layout.resources_dir().join("same.jar"), b"jar").unwrap();

        let mut index = InstallIndex::new();
        index.record_and_supersede("7", "same.jar");
        index.persist(&layout.index_path()).await.unwrap();

        let resolver = CannedResolver::new(vec![(
            "7",
            Ok(Resolution::Skipped(SkipReason::AlreadyPresent { file_name: "same.jar".to_string() })),
        )]);
        let report = SyncEngine::new(&resolver).sync(&manifest(&["7"]), &layout).await.unwrap();

        assert_eq!(report.skipped_count, 1);
        assert_eq!(report.superseded_count, 0);
        assert!(layout.resources_dir().join("same.jar").exists());
    }

    #[tokio::test]
    async fn test_invalid_type_tag_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PackLayout::new(dir.path(), &InstallerConfig::default());
        let resolver = CannedResolver::new(vec![]);

        let mut bad = manifest(&[]);
        bad.manifest_type = Some("resourcePack".to_string());

        let err = SyncEngine::new(&resolver).sync(&bad, &layout).await.unwrap_err();
        assert!(matches!(err, InstallError::InvalidManifest { .. }));
        assert!(!layout.resources_dir().exists());
    }
}
