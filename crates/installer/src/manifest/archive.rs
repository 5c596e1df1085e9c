//! Zip unpacking and directory merging for archive-wrapped packs

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{FileOperation, InstallError, Result};

/// Unpack a zip archive into `dest`, overwriting files that already exist
pub async fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let archive_path = archive_path.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || extract_zip_blocking(&archive_path, &dest))
        .await
        .map_err(|e| InstallError::FileSystem {
            path: PathBuf::new(),
            operation: FileOperation::Write,
            source: io::Error::other(e),
        })?
}

fn extract_zip_blocking(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(InstallError::fs(archive_path, FileOperation::Read))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|source| InstallError::Archive {
        path: archive_path.to_path_buf(),
        source,
    })?;

    fs::create_dir_all(dest).map_err(InstallError::fs(dest, FileOperation::CreateDir))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|source| InstallError::Archive {
            path: archive_path.to_path_buf(),
            source,
        })?;

        // Entries escaping the destination are dropped
        let Some(relative) = entry.enclosed_name() else {
            debug!("Skipping unsafe archive entry {}", entry.name());
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(InstallError::fs(&out_path, FileOperation::CreateDir))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(InstallError::fs(parent, FileOperation::CreateDir))?;
        }
        let mut out_file = File::create(&out_path).map_err(InstallError::fs(&out_path, FileOperation::Create))?;
        io::copy(&mut entry, &mut out_file).map_err(InstallError::fs(&out_path, FileOperation::Write))?;
    }

    debug!("Extracted {} entries from {} into {}", archive.len(), archive_path.display(), dest.display());
    Ok(())
}

/// Move everything under `source` into `target`, then remove `source`.
///
/// Directories present on both sides are merged recursively; files in
/// `target` with the same relative path are replaced.
pub async fn merge_into(source: &Path, target: &Path) -> Result<()> {
    let source = source.to_path_buf();
    let target = target.to_path_buf();

    tokio::task::spawn_blocking(move || {
        merge_blocking(&source, &target)?;
        fs::remove_dir_all(&source).map_err(InstallError::fs(&source, FileOperation::Delete))
    })
    .await
    .map_err(|e| InstallError::FileSystem {
        path: PathBuf::new(),
        operation: FileOperation::Move,
        source: io::Error::other(e),
    })?
}

fn merge_blocking(source: &Path, target: &Path) -> Result<()> {
    fs::create_dir_all(target).map_err(InstallError::fs(target, FileOperation::CreateDir))?;

    for entry in fs::read_dir(source).map_err(InstallError::fs(source, FileOperation::Read))? {
        let entry = entry.map_err(InstallError::fs(source, FileOperation::Read))?;
        let from = entry.path();
        let to = target.join(entry.file_name());

        if from.is_dir() && to.is_dir() {
            merge_blocking(&from, &to)?;
            continue;
        }

        if to.is_dir() {
            fs::remove_dir_all(&to).map_err(InstallError::fs(&to, FileOperation::Delete))?;
        } else if to.exists() {
            fs::remove_file(&to).map_err(InstallError::fs(&to, FileOperation::Delete))?;
        }
        fs::rename(&from, &to).map_err(InstallError::fs(&from, FileOperation::Move))?;
    }

    Ok(())
}
