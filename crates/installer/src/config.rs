//! Configuration types for the installer

use std::time::Duration;

use tracing::debug;

use crate::error::{InstallError, Result};

/// Configuration shared by the locator, manifest builder and sync engine
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Base of the resource download template (`{base}/projects/{project}/files/{file}`)
    pub project_base_url: String,
    /// Base of the project id -> slug lookup (`{base}/{project}`)
    pub project_lookup_url: String,
    /// Look up project slugs before building download URLs
    pub resolve_project_slugs: bool,
    pub user_agent: String,
    /// Extra headers sent with every request
    pub default_headers: Vec<(String, String)>,
    /// Maximum redirect hops followed for a single fetch
    pub max_redirects: usize,
    pub connect_timeout: Duration,
    pub game_dir_name: String,
    pub resources_dir_name: String,
    pub manifest_file_name: String,
    pub index_file_name: String,
    /// Directory under the install root that holds unpacked packs
    pub packs_dir_name: String,
    pub default_pack_name: String,
    pub default_pack_version: String,
    /// Author used for mod-lists without `author=`; falls back to the invoking user
    pub default_author: Option<String>,
}

impl InstallerConfig {
    /// Load configuration from the environment (and a `.env` file if present)
    pub fn from_env() -> Result<Self> {
        if dotenv::dotenv().is_ok() {
            debug!("Loaded environment variables from .env file");
        }

        let mut builder = InstallerConfigBuilder::new();

        if let Ok(base) = std::env::var("MODPACK_PROJECT_BASE_URL") {
            builder = builder.project_base_url(base);
        }
        if let Ok(agent) = std::env::var("MODPACK_USER_AGENT") {
            builder = builder.user_agent(agent);
        }
        if let Ok(author) = std::env::var("MODPACK_AUTHOR") {
            builder = builder.default_author(author);
        }
        if let Ok(raw) = std::env::var("MODPACK_MAX_REDIRECTS") {
            let hops = raw.trim().parse::<usize>().map_err(|_| InstallError::Configuration {
                message: format!("MODPACK_MAX_REDIRECTS must be a non-negative integer, got '{}'", raw),
                field: Some("MODPACK_MAX_REDIRECTS".to_string()),
            })?;
            builder = builder.max_redirects(hops);
        }

        Ok(builder.build())
    }

    /// Author to stamp on mod-list manifests
    pub fn author(&self) -> String {
        self.default_author.clone().unwrap_or_else(current_user)
    }
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            project_base_url: "https://minecraft.curseforge.com".to_string(),
            project_lookup_url: "https://mods.curse.com/project".to_string(),
            resolve_project_slugs: false,
            user_agent: "curl/7.58.0".to_string(),
            default_headers: vec![
                ("accept".to_string(), "*/*".to_string()),
                ("accept-language".to_string(), "en-GB,en;q=0.5".to_string()),
            ],
            max_redirects: 10,
            connect_timeout: Duration::from_secs(30),
            game_dir_name: "minecraft".to_string(),
            resources_dir_name: "mods".to_string(),
            manifest_file_name: "manifest.json".to_string(),
            index_file_name: "index.json".to_string(),
            packs_dir_name: "packs".to_string(),
            default_pack_name: "Custom Modpack".to_string(),
            default_pack_version: "1.0.0".to_string(),
            default_author: None,
        }
    }
}

/// Fluent builder for [`InstallerConfig`]
#[derive(Debug, Clone, Default)]
pub struct InstallerConfigBuilder {
    config: InstallerConfig,
}

impl InstallerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.project_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn project_lookup_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.project_lookup_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn resolve_project_slugs(mut self, enabled: bool) -> Self {
        self.config.resolve_project_slugs = enabled;
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.config.default_headers.push((key.into(), value.into()));
        self
    }

    pub fn max_redirects(mut self, hops: usize) -> Self {
        self.config.max_redirects = hops;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn default_author<S: Into<String>>(mut self, author: S) -> Self {
        self.config.default_author = Some(author.into());
        self
    }

    pub fn default_pack_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.default_pack_name = name.into();
        self
    }

    pub fn build(self) -> InstallerConfig {
        self.config
    }
}

/// Identity of the user running the installer
pub fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
