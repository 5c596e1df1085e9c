//! Error types for the installer with context and fatality information

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while building a manifest or syncing a pack
#[derive(Error, Debug)]
pub enum InstallError {
    /// Manifest is structurally wrong (bad type tag, missing `files`, unreadable shape)
    #[error("Invalid manifest: {reason}")]
    InvalidManifest { reason: String },

    /// Text mod-list has no `minecraft=` line
    #[error("Mod-list '{path}' does not declare a game version (add a `minecraft=<version>` line)")]
    MissingGameVersion { path: PathBuf },

    /// HTTP transport failure with context
    #[error("HTTP request to '{url}' failed")]
    HttpRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a status we cannot use
    #[error("HTTP request to '{url}' returned status {status}")]
    HttpStatus { url: String, status: u16 },

    /// Redirect chain exceeded the configured hop bound
    #[error("Too many redirects ({hops}) while resolving '{url}'")]
    TooManyRedirects { url: String, hops: usize },

    /// Streamed body length disagrees with the advertised length
    #[error("Size mismatch for '{file}': expected {expected} bytes, got {actual} bytes")]
    SizeMismatch {
        file: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// File system I/O errors with file context
    #[error("File operation failed on '{path}' while {operation}")]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    /// URL parsing errors
    #[error("Invalid URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Zip archive could not be read or unpacked
    #[error("Archive '{path}' could not be unpacked")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// Installer description (`.ccip`) is not valid XML for our schema
    #[error("Installer file '{path}' could not be parsed")]
    InstallerFile {
        path: PathBuf,
        #[source]
        source: quick_xml::DeError,
    },

    /// JSON (manifest or index) could not be read or written
    #[error("JSON error in '{path}'")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Downloaded pack is not a zip archive
    #[error("Unsupported archive '{file_name}': most likely not a modpack")]
    UnsupportedArchive { file_name: String },

    /// The pack archive itself could not be fetched
    #[error("Failed to download modpack from '{url}': {reason}")]
    PackDownloadFailed { url: String, reason: String },

    /// Overrides archive could not be fetched or unpacked (never fatal)
    #[error("Failed to fetch overrides from '{url}': {reason}")]
    OverrideFetchFailed { url: String, reason: String },

    /// Configuration errors
    #[error("Invalid configuration: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },
}

/// Types of file operations for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Read,
    Write,
    Create,
    Delete,
    Move,
    Metadata,
    CreateDir,
    Copy,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Create => write!(f, "creating"),
            FileOperation::Delete => write!(f, "deleting"),
            FileOperation::Move => write!(f, "moving"),
            FileOperation::Metadata => write!(f, "reading metadata"),
            FileOperation::CreateDir => write!(f, "creating directory"),
            FileOperation::Copy => write!(f, "copying"),
        }
    }
}

pub type Result<T> = std::result::Result<T, InstallError>;

impl InstallError {
    /// Build a `FileSystem` error; meant for `map_err` closures
    pub fn fs(path: impl Into<PathBuf>, operation: FileOperation) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| InstallError::FileSystem { path, operation, source }
    }

    pub fn invalid_manifest(reason: impl Into<String>) -> Self {
        InstallError::InvalidManifest { reason: reason.into() }
    }

    /// Whether this error aborts the whole run.
    ///
    /// Per-resource problems (transport, status, size, redirect loops) are
    /// isolated by the sync engine and only counted as skips.
    pub fn is_fatal(&self) -> bool {
        match self {
            InstallError::InvalidManifest { .. } => true,
            InstallError::MissingGameVersion { .. } => true,
            InstallError::UnsupportedArchive { .. } => true,
            InstallError::PackDownloadFailed { .. } => true,
            InstallError::InstallerFile { .. } => true,
            InstallError::Configuration { .. } => true,
            InstallError::Archive { .. } => true,
            InstallError::Json { .. } => true,
            InstallError::FileSystem { .. } => true,
            InstallError::HttpRequest { .. } => false,
            InstallError::HttpStatus { .. } => false,
            InstallError::TooManyRedirects { .. } => false,
            InstallError::SizeMismatch { .. } => false,
            InstallError::InvalidUrl { .. } => false,
            InstallError::OverrideFetchFailed { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            InstallError::InvalidManifest { .. } => "invalid_manifest",
            InstallError::MissingGameVersion { .. } => "missing_game_version",
            InstallError::HttpRequest { .. } => "http_request",
            InstallError::HttpStatus { .. } => "http_status",
            InstallError::TooManyRedirects { .. } => "too_many_redirects",
            InstallError::SizeMismatch { .. } => "size_mismatch",
            InstallError::FileSystem { .. } => "file_system",
            InstallError::InvalidUrl { .. } => "invalid_url",
            InstallError::Archive { .. } => "archive",
            InstallError::InstallerFile { .. } => "installer_file",
            InstallError::Json { .. } => "json",
            InstallError::UnsupportedArchive { .. } => "unsupported_archive",
            InstallError::PackDownloadFailed { .. } => "pack_download_failed",
            InstallError::OverrideFetchFailed { .. } => "override_fetch_failed",
            InstallError::Configuration { .. } => "configuration",
        }
    }
}
