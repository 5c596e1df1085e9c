//! Merge an overrides tree over the game directory

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{FileOperation, InstallError, Result};

/// Copy every file under `source` into `target`, keeping relative paths.
///
/// Existing directories are descended into, existing files are overwritten.
/// Returns the number of files copied.
pub async fn apply_overrides(source: &Path, target: &Path) -> Result<usize> {
    let source = source.to_path_buf();
    let target = target.to_path_buf();

    tokio::task::spawn_blocking(move || copy_tree(&source, &target))
        .await
        .map_err(|e| InstallError::FileSystem {
            path: PathBuf::new(),
            operation: FileOperation::Copy,
            source: io::Error::other(e),
        })?
}

fn copy_tree(source: &Path, target: &Path) -> Result<usize> {
    fs::create_dir_all(target).map_err(InstallError::fs(target, FileOperation::CreateDir))?;

    let mut copied = 0;
    for entry in fs::read_dir(source).map_err(InstallError::fs(source, FileOperation::Read))? {
        let entry = entry.map_err(InstallError::fs(source, FileOperation::Read))?;
        let from = entry.path();
        let to = target.join(entry.file_name());

        if from.is_dir() {
            copied += copy_tree(&from, &to)?;
        } else {
            debug!("Installing {} -> {}", from.display(), to.display());
            fs::copy(&from, &to).map_err(InstallError::fs(&to, FileOperation::Copy))?;
            copied += 1;
        }
    }

    Ok(copied)
}
