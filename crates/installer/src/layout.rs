//! On-disk layout of an installed pack
//!
//! ```text
//! <pack_dir>/
//!   manifest.json
//!   index.json
//!   minecraft/          game root, overrides merge here
//!     mods/             resolved resources
//! ```

use std::path::{Path, PathBuf};

use crate::config::InstallerConfig;
use crate::manifest::Manifest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackLayout {
    pack_dir: PathBuf,
    game_dir_name: String,
    resources_dir_name: String,
    manifest_file_name: String,
    index_file_name: String,
}

impl PackLayout {
    pub fn new<P: Into<PathBuf>>(pack_dir: P, config: &InstallerConfig) -> Self {
        Self {
            pack_dir: pack_dir.into(),
            game_dir_name: config.game_dir_name.clone(),
            resources_dir_name: config.resources_dir_name.clone(),
            manifest_file_name: config.manifest_file_name.clone(),
            index_file_name: config.index_file_name.clone(),
        }
    }

    pub fn pack_dir(&self) -> &Path {
        &self.pack_dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.pack_dir.join(&self.manifest_file_name)
    }

    pub fn index_path(&self) -> PathBuf {
        self.pack_dir.join(&self.index_file_name)
    }

    /// Install root; override files are merged here
    pub fn game_dir(&self) -> PathBuf {
        self.pack_dir.join(&self.game_dir_name)
    }

    /// Where resolved resources are written
    pub fn resources_dir(&self) -> PathBuf {
        self.game_dir().join(&self.resources_dir_name)
    }

    /// Overrides tree named by the manifest, resolved against the pack dir
    pub fn overrides_dir(&self, manifest: &Manifest) -> Option<PathBuf> {
        manifest.overrides.as_ref().map(|relative| self.pack_dir.join(relative))
    }
}

/// Turn a pack name into a safe directory name.
///
/// Whitespace becomes `_`, anything outside `[A-Za-z0-9._-]` is dropped.
pub fn normalize_pack_name(name: &str) -> String {
    let normalized: String = name
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() => Some(c),
            '-' | '_' | '.' => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    let normalized = normalized.trim_matches('.').to_string();
    if normalized.is_empty() {
        "modpack".to_string()
    } else {
        normalized
    }
}
