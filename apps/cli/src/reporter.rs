use std::sync::Mutex;
use std::time::Instant;

use modpack_installer::{ProgressReporter, ResourceReference};

/// Console progress output; download progress lines are throttled per second
#[derive(Debug, Default)]
pub struct ConsoleProgressReporter {
    last_progress: Mutex<Option<Instant>>,
}

impl ConsoleProgressReporter {
    pub fn new() -> Self {
        Self {
            last_progress: Mutex::new(None),
        }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn on_resource_started(&self, index: usize, total: usize, reference: &ResourceReference) {
        println!("[{}/{}] {}", index, total, reference);
    }

    fn on_download_started(&self, _url: &str, file_name: &str, total_size: u64) {
        println!("  ⬇️  {} ({} bytes)", file_name, total_size);
    }

    fn on_download_progress(&self, file_name: &str, downloaded: u64, total: u64) {
        let Ok(mut last) = self.last_progress.lock() else {
            return;
        };
        if last.is_some_and(|at| at.elapsed().as_secs() < 1) {
            return;
        }
        *last = Some(Instant::now());

        let percent = if total > 0 {
            (downloaded as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        println!("  📁 {}: {:.1}% ({}/{} bytes)", file_name, percent, downloaded, total);
    }

    fn on_resource_installed(&self, _reference: &ResourceReference, file_name: &str) {
        println!("  ✅ {}", file_name);
    }

    fn on_resource_skipped(&self, _reference: &ResourceReference, reason: &str) {
        println!("  ⏭️  skipped: {}", reason);
    }

    fn on_superseded(&self, _project_id: &str, old_file: &str, new_file: &str) {
        println!("  ♻️  {} replaced by {}", old_file, new_file);
    }

    fn on_overrides_applied(&self, files: usize) {
        println!("📦 Installed {} override files", files);
    }

    fn on_warning(&self, message: &str) {
        eprintln!("⚠️  {}", message);
    }
}
