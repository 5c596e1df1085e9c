//! Resource resolution
//!
//! Turns a [`ResourceReference`] into a file on disk by following the
//! host's redirect chain by hand. The file is named after the last
//! segment of the final URL; when that is `download` or `latest` the
//! caller's fallback (`<fileId>.jar`) is used instead.

pub mod http;
pub mod naming;

use std::path::Path;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, info};
use url::Url;

use crate::config::InstallerConfig;
use crate::error::{InstallError, Result};
use crate::manifest::ResourceReference;
use crate::progress::ProgressCallback;

pub use http::HttpClient;

/// Outcome of resolving one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// File was streamed to disk under `file_name`
    Resolved { file_name: String, size: u64 },
    /// Nothing was written
    Skipped(SkipReason),
}

/// Why a resolution wrote nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 404 at this identifier/version
    NotFound { url: String },
    /// Final response had no content length
    UnknownSize { url: String },
    /// Target file is already on disk; treated as installed
    AlreadyPresent { file_name: String },
}

impl SkipReason {
    pub fn describe(&self) -> String {
        match self {
            SkipReason::NotFound { url } => format!("could not find resource at {}", url),
            SkipReason::UnknownSize { url } => format!("no content length from {}", url),
            SkipReason::AlreadyPresent { file_name } => format!("{} already present", file_name),
        }
    }
}

/// Seam between the sync engine and whatever fetches resources
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    async fn resolve(
        &self,
        reference: &ResourceReference,
        resources_dir: &Path,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<Resolution>;
}

/// Resolves references against the configured project host
pub struct ResourceLocator {
    http: HttpClient,
    project_base_url: String,
    project_lookup_url: String,
    resolve_project_slugs: bool,
    max_redirects: usize,
}

impl ResourceLocator {
    pub fn new(config: &InstallerConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::from_config(config)?,
            project_base_url: config.project_base_url.trim_end_matches('/').to_string(),
            project_lookup_url: config.project_lookup_url.trim_end_matches('/').to_string(),
            resolve_project_slugs: config.resolve_project_slugs,
            max_redirects: config.max_redirects,
        })
    }

    /// Initial URL for a project/file pair.
    ///
    /// Numeric file ids point at a file page, so `/download` is appended to
    /// reach the bytes; `latest` already redirects to them.
    pub fn resource_url(&self, project: &str, file_id: &str) -> String {
        if naming::is_numeric_id(file_id) {
            format!("{}/projects/{}/files/{}/download", self.project_base_url, project, file_id)
        } else {
            format!("{}/projects/{}/files/{}", self.project_base_url, project, file_id)
        }
    }

    /// Follow redirects from `url` and stream the final body into `target_dir`
    pub async fn fetch(
        &self,
        url: &str,
        target_dir: &Path,
        fallback_name: &str,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<Resolution> {
        let mut current = Url::parse(url).map_err(|source| InstallError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let mut hops = 0;

        loop {
            let response = self.http.get(&current).await?;

            if let Some(location) = http::redirect_location(&response) {
                if hops >= self.max_redirects {
                    return Err(InstallError::TooManyRedirects {
                        url: url.to_string(),
                        hops,
                    });
                }
                hops += 1;
                let next = current.join(location).map_err(|source| InstallError::InvalidUrl {
                    url: location.to_string(),
                    source,
                })?;
                debug!("Redirect {} -> {}", current, next);
                current = next;
                continue;
            }

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                info!("Could not find resource at {}", current);
                return Ok(Resolution::Skipped(SkipReason::NotFound { url: current.to_string() }));
            }
            if !status.is_success() {
                return Err(InstallError::HttpStatus {
                    url: current.to_string(),
                    status: status.as_u16(),
                });
            }

            let Some(total_size) = response.content_length() else {
                return Ok(Resolution::Skipped(SkipReason::UnknownSize { url: current.to_string() }));
            };

            // Only the final URL may name the file; intermediate hops say nothing about it
            let file_name = naming::file_name_for(&current, fallback_name);
            let dest_path = target_dir.join(&file_name);
            if dest_path.exists() {
                debug!("File found, skipping download: {}", dest_path.display());
                return Ok(Resolution::Skipped(SkipReason::AlreadyPresent { file_name }));
            }

            let size = self
                .http
                .stream_to_file(response, &dest_path, total_size, progress_callback)
                .await?;
            info!("Downloaded {} ({} bytes)", file_name, size);
            return Ok(Resolution::Resolved { file_name, size });
        }
    }

    /// Look up a project's slug via the redirect its numeric page issues
    pub async fn project_slug(&self, project_id: &str) -> Option<String> {
        let url = Url::parse(&format!("{}/{}", self.project_lookup_url, project_id)).ok()?;
        let response = match self.http.get(&url).await {
            Ok(response) => response,
            Err(e) => {
                debug!("Project lookup for {} failed: {}", project_id, e);
                return None;
            }
        };

        let location = http::redirect_location(&response)?;
        let target = url.join(location).ok()?;
        let slug = naming::last_segment(&target)?;
        let slug = naming::strip_id_prefix(&slug);
        (!slug.is_empty()).then(|| slug.to_string())
    }
}

#[async_trait]
impl ResourceResolver for ResourceLocator {
    async fn resolve(
        &self,
        reference: &ResourceReference,
        resources_dir: &Path,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<Resolution> {
        let project = if self.resolve_project_slugs {
            self.project_slug(&reference.project_id)
                .await
                .unwrap_or_else(|| reference.project_id.clone())
        } else {
            reference.project_id.clone()
        };

        let url = self.resource_url(&project, &reference.file_id);
        let fallback = naming::fallback_file_name(&reference.project_id, &reference.file_id);
        self.fetch(&url, resources_dir, &fallback, progress_callback).await
    }
}
