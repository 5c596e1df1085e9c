//! Canonical modpack manifest and the builder that produces it
//!
//! Three input shapes end up as the same [`Manifest`]:
//!
//! - a structured `manifest.json` (loaded and validated as-is)
//! - a zip archive containing one (unpacked under the install root first)
//! - a text mod-list with `key=value` lines and project URLs
//!
//! Remote pack URLs and `.ccip` installer files are resolved to an archive
//! and then follow the archive path.

pub mod archive;
pub mod installer_file;
pub mod modlist;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::InstallerConfig;
use crate::error::{FileOperation, InstallError, Result};
use crate::layout::{PackLayout, normalize_pack_name};
use crate::locator::{Resolution, ResourceLocator, SkipReason};
use crate::progress::{self, ProgressCallback, ProgressEvent};
use crate::sync;

pub use modlist::{ModList, ModListEntry};

/// Manifest type tag accepted in `manifestType`
pub const MANIFEST_TYPE: &str = "minecraftModpack";

/// File identifier meaning "the most recent version"
pub const LATEST_FILE_ID: &str = "latest";

/// Directory inside a pack that holds its overrides tree
pub const OVERRIDES_DIR_NAME: &str = "overrides";

/// One remote resource: owning project plus a specific file (or `latest`)
///
/// `project_id` is the identity used by the install index; `file_id`
/// changes whenever the resource is updated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceReference {
    #[serde(rename = "projectID", deserialize_with = "id_from_string_or_number")]
    pub project_id: String,
    #[serde(rename = "fileID", deserialize_with = "id_from_string_or_number")]
    pub file_id: String,
}

impl ResourceReference {
    pub fn new<P: Into<String>, F: Into<String>>(project_id: P, file_id: F) -> Self {
        Self {
            project_id: project_id.into(),
            file_id: file_id.into(),
        }
    }

    pub fn latest<P: Into<String>>(project_id: P) -> Self {
        Self::new(project_id, LATEST_FILE_ID)
    }

    pub fn is_latest(&self) -> bool {
        self.file_id == LATEST_FILE_ID
    }
}

impl std::fmt::Display for ResourceReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.project_id, self.file_id)
    }
}

/// Curse manifests write ids as numbers, mod-lists produce strings; accept both.
fn id_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

/// A mod loader the pack needs, e.g. `forge-14.23.5.2847`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModLoader {
    pub id: String,
    #[serde(default)]
    pub primary: bool,
}

/// The `minecraft` block of a manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRequirements {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub mod_loaders: Vec<ModLoader>,
}

/// Canonical installation description
///
/// Built once per invocation and never mutated by the sync engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_version: Option<u32>,
    pub minecraft: GameRequirements,
    /// Order only drives progress reporting
    #[serde(rename = "files")]
    pub references: Vec<ResourceReference>,
    /// Path of the overrides tree, relative to the manifest's directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<String>,
}

/// Manifest exactly as it appears on disk, before required fields are checked
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    manifest_type: Option<String>,
    #[serde(default)]
    manifest_version: Option<u32>,
    #[serde(default)]
    minecraft: GameRequirements,
    #[serde(default)]
    files: Option<Vec<ResourceReference>>,
    #[serde(default)]
    overrides: Option<String>,
}

impl TryFrom<RawManifest> for Manifest {
    type Error = InstallError;

    fn try_from(raw: RawManifest) -> Result<Self> {
        let references = raw
            .files
            .ok_or_else(|| InstallError::invalid_manifest("no files defined in manifest"))?;

        let manifest = Manifest {
            name: raw.name,
            version: raw.version,
            author: raw.author,
            manifest_type: raw.manifest_type,
            manifest_version: raw.manifest_version,
            minecraft: raw.minecraft,
            references,
            overrides: raw.overrides.filter(|path| !path.trim().is_empty()),
        };
        manifest.validate()?;
        Ok(manifest)
    }
}

impl Manifest {
    /// Parse and validate a structured manifest; `origin` is only used for errors
    pub fn from_json_str(json: &str, origin: &Path) -> Result<Self> {
        let raw: RawManifest = serde_json::from_str(json).map_err(|source| InstallError::Json {
            path: origin.to_path_buf(),
            source,
        })?;
        Manifest::try_from(raw)
    }

    /// Load a structured manifest from disk
    pub async fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .await
            .map_err(InstallError::fs(path, FileOperation::Read))?;
        let manifest = Self::from_json_str(&json, path)?;
        debug!("Loaded manifest '{}' with {} files from {}", manifest.name, manifest.references.len(), path.display());
        Ok(manifest)
    }

    /// Write the manifest in structured form
    pub async fn persist(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|source| InstallError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json)
            .await
            .map_err(InstallError::fs(path, FileOperation::Write))?;
        debug!("Persisted manifest to {}", path.display());
        Ok(())
    }

    /// Reject manifests carrying a foreign type tag
    pub fn validate(&self) -> Result<()> {
        match self.manifest_type.as_deref() {
            Some(tag) if tag != MANIFEST_TYPE => Err(InstallError::invalid_manifest(format!(
                "unsupported manifestType '{}' (expected '{}')",
                tag, MANIFEST_TYPE
            ))),
            _ => Ok(()),
        }
    }

    pub fn game_version(&self) -> &str {
        &self.minecraft.version
    }

    pub fn loaders(&self) -> &[ModLoader] {
        &self.minecraft.mod_loaders
    }

    /// What the user has to set up in the launcher before playing
    pub fn requirements(&self) -> Requirements {
        let game_version = self.minecraft.version.clone();
        let loaders = self
            .minecraft
            .mod_loaders
            .iter()
            .map(|loader| {
                let is_forge = loader.id.starts_with("forge");
                LoaderRequirement {
                    id: loader.id.clone(),
                    primary: loader.primary,
                    is_forge,
                    download_page: is_forge.then(|| forge_download_page(&game_version)),
                }
            })
            .collect();

        Requirements { game_version, loaders }
    }
}

/// Game version and loaders a pack needs, for the user-facing summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirements {
    pub game_version: String,
    pub loaders: Vec<LoaderRequirement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderRequirement {
    pub id: String,
    pub primary: bool,
    pub is_forge: bool,
    pub download_page: Option<String>,
}

fn forge_download_page(game_version: &str) -> String {
    format!(
        "http://files.minecraftforge.net/maven/net/minecraftforge/forge/index_{}.html",
        game_version
    )
}

/// Where a manifest comes from, picked by sniffing the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackInput {
    /// `manifest.json`-shaped file
    Structured(PathBuf),
    /// Local zip containing a manifest
    Archive(PathBuf),
    /// Text mod-list
    ModList(PathBuf),
    /// `.ccip` XML naming a single pack file
    InstallerFile(PathBuf),
    /// Project URL of a pack hosted remotely
    RemotePack(String),
}

impl PackInput {
    /// Classify an input by scheme, extension and finally content
    pub async fn detect(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return PackInput::RemotePack(trimmed.to_string());
        }

        let path = PathBuf::from(trimmed);
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("ccip") => PackInput::InstallerFile(path),
            Some("zip") => PackInput::Archive(path),
            Some("json") => PackInput::Structured(path),
            _ => {
                let looks_structured = fs::read(&path)
                    .await
                    .ok()
                    .and_then(|bytes| bytes.iter().find(|b| !b.is_ascii_whitespace()).copied())
                    == Some(b'{');
                if looks_structured {
                    PackInput::Structured(path)
                } else {
                    PackInput::ModList(path)
                }
            }
        }
    }
}

/// A manifest together with the directory it will be installed into
#[derive(Debug, Clone)]
pub struct BuiltManifest {
    pub manifest: Manifest,
    pub layout: PackLayout,
}

/// Turns any [`PackInput`] into a canonical [`Manifest`] and its [`PackLayout`]
pub struct ManifestBuilder<'a> {
    config: &'a InstallerConfig,
    locator: &'a ResourceLocator,
    install_root: PathBuf,
    progress_callback: Option<ProgressCallback>,
}

impl<'a> ManifestBuilder<'a> {
    pub fn new<P: Into<PathBuf>>(config: &'a InstallerConfig, locator: &'a ResourceLocator, install_root: P) -> Self {
        Self {
            config,
            locator,
            install_root: install_root.into(),
            progress_callback: None,
        }
    }

    pub fn with_progress(mut self, callback: Option<ProgressCallback>) -> Self {
        self.progress_callback = callback;
        self
    }

    /// Directory holding unpacked packs
    pub fn packs_dir(&self) -> PathBuf {
        self.install_root.join(&self.config.packs_dir_name)
    }

    pub async fn build(&self, input: &PackInput) -> Result<BuiltManifest> {
        match input {
            PackInput::Structured(path) => self.from_structured(path).await,
            PackInput::Archive(path) => self.from_archive(path).await,
            PackInput::ModList(path) => self.from_mod_list(path).await,
            PackInput::InstallerFile(path) => self.from_installer_file(path).await,
            PackInput::RemotePack(url) => self.from_remote_pack(url).await,
        }
    }

    /// Structured manifest: the pack lives next to the manifest file
    pub async fn from_structured(&self, path: &Path) -> Result<BuiltManifest> {
        let manifest = Manifest::load(path).await?;
        let pack_dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(BuiltManifest {
            manifest,
            layout: PackLayout::new(pack_dir, self.config),
        })
    }

    /// Local archive: unpack, load, then settle on the normalized pack directory
    pub async fn from_archive(&self, archive_path: &Path) -> Result<BuiltManifest> {
        let stem = archive_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
            .ok_or_else(|| InstallError::invalid_manifest(format!(
                "archive path '{}' has no file name",
                archive_path.display()
            )))?;

        let packs_dir = self.packs_dir();
        let staging_dir = packs_dir.join(&stem);
        fs::create_dir_all(&staging_dir)
            .await
            .map_err(InstallError::fs(&staging_dir, FileOperation::CreateDir))?;

        info!("Extracting {} into {}", archive_path.display(), staging_dir.display());
        archive::extract_zip(archive_path, &staging_dir).await?;

        let manifest_path = staging_dir.join(&self.config.manifest_file_name);
        if !manifest_path.exists() {
            return Err(InstallError::invalid_manifest(format!(
                "archive '{}' does not contain {}",
                archive_path.display(),
                self.config.manifest_file_name
            )));
        }

        let mut manifest = Manifest::load(&manifest_path).await?;
        if manifest.name.trim().is_empty() {
            manifest.name = stem.clone();
        }

        let pack_dir = packs_dir.join(normalize_pack_name(&manifest.name));
        if pack_dir != staging_dir {
            if pack_dir.exists() {
                info!("Found an existing installation at {}, merging", pack_dir.display());
                archive::merge_into(&staging_dir, &pack_dir).await?;
            } else {
                fs::rename(&staging_dir, &pack_dir)
                    .await
                    .map_err(InstallError::fs(&staging_dir, FileOperation::Move))?;
            }
        }

        Ok(BuiltManifest {
            manifest,
            layout: PackLayout::new(pack_dir, self.config),
        })
    }

    /// Text mod-list: derive a manifest, fetch overrides, persist it in the pack dir
    pub async fn from_mod_list(&self, path: &Path) -> Result<BuiltManifest> {
        let text = fs::read_to_string(path)
            .await
            .map_err(InstallError::fs(path, FileOperation::Read))?;

        let mod_list = ModList::parse(&text);
        let overrides_url = mod_list.overrides_url.clone();
        // Anchored absolutely so the override path survives the move to the pack dir
        let parent = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let source_dir =
            std::path::absolute(parent).map_err(InstallError::fs(parent, FileOperation::Metadata))?;
        let mut manifest = mod_list.into_manifest(self.config, path, &source_dir)?;

        let pack_dir = self.packs_dir().join(normalize_pack_name(&manifest.name));
        fs::create_dir_all(&pack_dir)
            .await
            .map_err(InstallError::fs(&pack_dir, FileOperation::CreateDir))?;
        let layout = PackLayout::new(pack_dir, self.config);

        let local_overrides = manifest.overrides.take().map(PathBuf::from);
        if let Some(url) = overrides_url {
            match self.fetch_overrides(&url, &layout).await {
                Ok(relative) => manifest.overrides = Some(relative),
                Err(e) => self.warn(format!("Overrides omitted: {}", e)),
            }
        }
        if manifest.overrides.is_none() {
            if let Some(source) = local_overrides {
                manifest.overrides = self.stage_local_overrides(&source, &layout).await?;
            }
        }

        manifest.persist(&layout.manifest_path()).await?;
        info!(
            "Built manifest '{}' ({} files) from mod-list {}",
            manifest.name,
            manifest.references.len(),
            path.display()
        );

        Ok(BuiltManifest { manifest, layout })
    }

    /// `.ccip` installer description: one pack file to download
    pub async fn from_installer_file(&self, path: &Path) -> Result<BuiltManifest> {
        let xml = fs::read_to_string(path)
            .await
            .map_err(InstallError::fs(path, FileOperation::Read))?;
        let reference = installer_file::parse(&xml, path)?;
        let url = self.locator.resource_url(&reference.project_id, &reference.file_id);
        self.download_and_unpack(&url).await
    }

    /// Remote pack listing URL; `/files/latest` is implied when no file is named
    pub async fn from_remote_pack(&self, url: &str) -> Result<BuiltManifest> {
        let url = if url.contains("/files") {
            url.to_string()
        } else {
            format!("{}/files/{}", url.trim_end_matches('/'), LATEST_FILE_ID)
        };
        self.download_and_unpack(&url).await
    }

    async fn download_and_unpack(&self, url: &str) -> Result<BuiltManifest> {
        let packs_dir = self.packs_dir();
        fs::create_dir_all(&packs_dir)
            .await
            .map_err(InstallError::fs(&packs_dir, FileOperation::CreateDir))?;

        let resolution = self
            .locator
            .fetch(url, &packs_dir, "pack.zip", self.progress_callback.clone())
            .await
            .map_err(|e| InstallError::PackDownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let file_name = match resolution {
            Resolution::Resolved { file_name, .. } => file_name,
            Resolution::Skipped(SkipReason::AlreadyPresent { file_name }) => {
                debug!("Pack archive {} already downloaded", file_name);
                file_name
            }
            Resolution::Skipped(reason) => {
                return Err(InstallError::PackDownloadFailed {
                    url: url.to_string(),
                    reason: reason.describe(),
                });
            }
        };

        let archive_path = packs_dir.join(&file_name);
        if !file_name.to_ascii_lowercase().ends_with(".zip") {
            if let Err(e) = fs::remove_file(&archive_path).await {
                warn!("Could not remove rejected download {}: {}", archive_path.display(), e);
            }
            return Err(InstallError::UnsupportedArchive { file_name });
        }

        let built = self.from_archive(&archive_path).await?;
        fs::remove_file(&archive_path)
            .await
            .map_err(InstallError::fs(&archive_path, FileOperation::Delete))?;
        Ok(built)
    }

    /// Download and unpack a mod-list's overrides archive into the pack dir
    async fn fetch_overrides(&self, url: &str, layout: &PackLayout) -> Result<String> {
        let failed = |reason: String| InstallError::OverrideFetchFailed {
            url: url.to_string(),
            reason,
        };

        let scratch = tempfile::tempdir_in(layout.pack_dir()).map_err(|e| failed(e.to_string()))?;
        let resolution = self
            .locator
            .fetch(url, scratch.path(), "overrides.zip", self.progress_callback.clone())
            .await
            .map_err(|e| failed(e.to_string()))?;

        let file_name = match resolution {
            Resolution::Resolved { file_name, .. } => file_name,
            Resolution::Skipped(reason) => return Err(failed(reason.describe())),
        };

        let target = layout.pack_dir().join(OVERRIDES_DIR_NAME);
        archive::extract_zip(&scratch.path().join(&file_name), &target)
            .await
            .map_err(|e| failed(e.to_string()))?;

        Ok(OVERRIDES_DIR_NAME.to_string())
    }

    /// Copy a mod-list's local `overrides=` tree into the pack so the
    /// persisted manifest only refers to it by a pack-relative path
    async fn stage_local_overrides(&self, source: &Path, layout: &PackLayout) -> Result<Option<String>> {
        if !source.is_dir() {
            self.warn(format!("Overrides directory {} does not exist, skipping", source.display()));
            return Ok(None);
        }

        let target = layout.pack_dir().join(OVERRIDES_DIR_NAME);
        let already_in_pack = std::path::absolute(&target).is_ok_and(|target| target == source);
        if !already_in_pack {
            let copied = sync::overrides::apply_overrides(source, &target).await?;
            debug!("Staged {} override files from {}", copied, source.display());
        }

        Ok(Some(OVERRIDES_DIR_NAME.to_string()))
    }

    fn warn(&self, message: String) {
        warn!("{}", message);
        progress::emit(self.progress_callback.as_ref(), ProgressEvent::Warning { message });
    }
}
