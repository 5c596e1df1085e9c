//! HTTP client with manual redirect handling and streaming downloads

use std::path::{Path, PathBuf};
use std::time::Instant;

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, LOCATION};
use reqwest::{Client, Response, redirect};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

use crate::config::InstallerConfig;
use crate::error::{FileOperation, InstallError, Result};
use crate::progress::{self, ProgressCallback, ProgressEvent};

/// HTTP client that never follows redirects on its own
///
/// Redirects are surfaced to the locator so it can bound the chain length
/// and name the file from the final URL.
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn from_config(config: &InstallerConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (key, value) in &config.default_headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| InstallError::Configuration {
                message: format!("invalid header name '{}': {}", key, e),
                field: Some("default_headers".to_string()),
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| InstallError::Configuration {
                message: format!("invalid value for header '{}': {}", key, e),
                field: Some("default_headers".to_string()),
            })?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| InstallError::Configuration {
                message: format!("failed to create HTTP client: {}", e),
                field: None,
            })?;

        Ok(Self { client })
    }

    pub async fn get(&self, url: &Url) -> Result<Response> {
        debug!("GET {}", url);
        self.client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| InstallError::HttpRequest {
                url: url.to_string(),
                source,
            })
    }

    /// Stream a response body to `dest_path`.
    ///
    /// Bytes land in `<dest>.part` and are renamed into place only once the
    /// advertised length has been received; any failure removes the partial file.
    pub async fn stream_to_file(
        &self,
        response: Response,
        dest_path: &Path,
        total_size: u64,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<u64> {
        let temp_path = create_temp_path(dest_path);
        let result = self
            .write_body(response, &temp_path, dest_path, total_size, progress_callback)
            .await;

        if result.is_err() && temp_path.exists() {
            if let Err(e) = fs::remove_file(&temp_path).await {
                debug!("Could not remove partial file {}: {}", temp_path.display(), e);
            }
        }
        result
    }

    async fn write_body(
        &self,
        response: Response,
        temp_path: &Path,
        dest_path: &Path,
        total_size: u64,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<u64> {
        let url = response.url().to_string();
        let file_name = dest_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        progress::emit(
            progress_callback.as_ref(),
            ProgressEvent::DownloadStarted {
                url: url.clone(),
                file_name: file_name.clone(),
                total_size,
            },
        );

        let mut file = fs::File::create(temp_path)
            .await
            .map_err(InstallError::fs(temp_path, FileOperation::Create))?;

        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;
        let mut last_progress_time = Instant::now();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|source| InstallError::HttpRequest {
                url: url.clone(),
                source,
            })?;

            file.write_all(&chunk)
                .await
                .map_err(InstallError::fs(temp_path, FileOperation::Write))?;
            downloaded += chunk.len() as u64;

            // Report progress at most every 100ms
            let now = Instant::now();
            if now.duration_since(last_progress_time).as_millis() >= 100 {
                progress::emit(
                    progress_callback.as_ref(),
                    ProgressEvent::DownloadProgress {
                        file_name: file_name.clone(),
                        downloaded,
                        total: total_size,
                    },
                );
                last_progress_time = now;
            }
        }

        file.flush()
            .await
            .map_err(InstallError::fs(temp_path, FileOperation::Write))?;
        file.sync_all()
            .await
            .map_err(InstallError::fs(temp_path, FileOperation::Write))?;
        drop(file);

        if downloaded != total_size {
            return Err(InstallError::SizeMismatch {
                file: dest_path.to_path_buf(),
                expected: total_size,
                actual: downloaded,
            });
        }

        fs::rename(temp_path, dest_path)
            .await
            .map_err(InstallError::fs(temp_path, FileOperation::Move))?;

        progress::emit(
            progress_callback.as_ref(),
            ProgressEvent::DownloadComplete {
                file_name,
                final_size: downloaded,
            },
        );

        debug!("Stream download completed: {} bytes to {}", downloaded, dest_path.display());
        Ok(downloaded)
    }
}

/// Redirect target of a response, if it carries one
pub fn redirect_location(response: &Response) -> Option<&str> {
    if !response.status().is_redirection() {
        return None;
    }
    response.headers().get(LOCATION).and_then(|value| value.to_str().ok())
}

/// Sibling path used while a download is in flight
pub fn create_temp_path(dest_path: &Path) -> PathBuf {
    let mut name = dest_path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest_path.with_file_name(name)
}
