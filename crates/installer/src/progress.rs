//! Progress tracking and reporting for sync operations

use std::sync::Arc;

use crate::manifest::ResourceReference;

/// Progress callback for sync operations
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Events emitted while a pack is being installed
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    ResourceStarted {
        index: usize,
        total: usize,
        reference: ResourceReference,
    },
    DownloadStarted {
        url: String,
        file_name: String,
        total_size: u64,
    },
    DownloadProgress {
        file_name: String,
        downloaded: u64,
        total: u64,
    },
    DownloadComplete {
        file_name: String,
        final_size: u64,
    },
    ResourceInstalled {
        reference: ResourceReference,
        file_name: String,
    },
    ResourceSkipped {
        reference: ResourceReference,
        reason: String,
    },
    Superseded {
        project_id: String,
        old_file: String,
        new_file: String,
    },
    OverridesApplied {
        files: usize,
    },
    Warning {
        message: String,
    },
}

/// Trait for progress reporting with more granular control
pub trait ProgressReporter: Send + Sync {
    fn on_resource_started(&self, _index: usize, _total: usize, _reference: &ResourceReference) {}
    fn on_download_started(&self, _url: &str, _file_name: &str, _total_size: u64) {}
    fn on_download_progress(&self, _file_name: &str, _downloaded: u64, _total: u64) {}
    fn on_download_complete(&self, _file_name: &str, _final_size: u64) {}
    fn on_resource_installed(&self, _reference: &ResourceReference, _file_name: &str) {}
    fn on_resource_skipped(&self, _reference: &ResourceReference, _reason: &str) {}
    fn on_superseded(&self, _project_id: &str, _old_file: &str, _new_file: &str) {}
    fn on_overrides_applied(&self, _files: usize) {}
    fn on_warning(&self, _message: &str) {}
}

/// Extension trait to convert ProgressReporter to ProgressCallback
pub trait IntoProgressCallback {
    fn into_callback(self) -> ProgressCallback;
}

impl<T: ProgressReporter + 'static> IntoProgressCallback for T {
    fn into_callback(self) -> ProgressCallback {
        Arc::new(move |event| match event {
            ProgressEvent::ResourceStarted { index, total, reference } => {
                self.on_resource_started(index, total, &reference);
            }
            ProgressEvent::DownloadStarted { url, file_name, total_size } => {
                self.on_download_started(&url, &file_name, total_size);
            }
            ProgressEvent::DownloadProgress { file_name, downloaded, total } => {
                self.on_download_progress(&file_name, downloaded, total);
            }
            ProgressEvent::DownloadComplete { file_name, final_size } => {
                self.on_download_complete(&file_name, final_size);
            }
            ProgressEvent::ResourceInstalled { reference, file_name } => {
                self.on_resource_installed(&reference, &file_name);
            }
            ProgressEvent::ResourceSkipped { reference, reason } => {
                self.on_resource_skipped(&reference, &reason);
            }
            ProgressEvent::Superseded { project_id, old_file, new_file } => {
                self.on_superseded(&project_id, &old_file, &new_file);
            }
            ProgressEvent::OverridesApplied { files } => {
                self.on_overrides_applied(files);
            }
            ProgressEvent::Warning { message } => {
                self.on_warning(&message);
            }
        })
    }
}

/// Progress reporter that ignores every event
#[derive(Debug, Default)]
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {}

/// Send an event if a callback is attached
pub(crate) fn emit(callback: Option<&ProgressCallback>, event: ProgressEvent) {
    if let Some(callback) = callback {
        callback(event);
    }
}

