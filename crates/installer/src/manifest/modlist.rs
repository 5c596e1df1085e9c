//! Text mod-list parsing
//!
//! A mod-list is UTF-8 text with one directive per line: either a
//! `key=value` setting or a line containing a project URL such as
//! `https://minecraft.curseforge.com/projects/jei/files/2803400`.
//! Blank and unrecognized lines are ignored.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{GameRequirements, MANIFEST_TYPE, Manifest, ModLoader, ResourceReference};
use crate::config::InstallerConfig;
use crate::error::{InstallError, Result};

static PROJECT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/projects/([^/\s?#]+)").expect("project pattern is valid"));

static FILE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"files/([^/\s?#]+)").expect("file pattern is valid"));

const KNOWN_KEYS: &[&str] = &[
    "minecraft",
    "name",
    "author",
    "version",
    "forge",
    "overrides",
    "overrides_url",
];

/// One meaningful line of a mod-list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModListEntry {
    Setting { key: String, value: String },
    Resource(ResourceReference),
}

/// Classify a single line; `None` for blank or unrecognized lines
pub fn parse_line(line: &str) -> Option<ModListEntry> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    // URLs may carry `=` in their query, so look for a project first
    if let Some(project) = PROJECT_PATTERN.captures(line) {
        let project_id = project[1].to_string();
        let after_project = &line[project.get(0).map_or(0, |m| m.end())..];
        let reference = match FILE_PATTERN.captures(after_project) {
            Some(file) => ResourceReference::new(project_id, &file[1]),
            None => ResourceReference::latest(project_id),
        };
        return Some(ModListEntry::Resource(reference));
    }

    let (key, value) = line.split_once('=')?;
    let key = key.trim().to_ascii_lowercase();
    if !KNOWN_KEYS.contains(&key.as_str()) {
        return None;
    }

    Some(ModListEntry::Setting {
        key,
        value: value.trim().to_string(),
    })
}

/// Everything a mod-list declares, before defaults are applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModList {
    pub game_version: Option<String>,
    pub name: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
    pub forge: Option<String>,
    pub overrides: Option<String>,
    pub overrides_url: Option<String>,
    pub references: Vec<ResourceReference>,
}

impl ModList {
    pub fn parse(text: &str) -> Self {
        let mut mod_list = ModList::default();

        for entry in text.lines().filter_map(parse_line) {
            match entry {
                ModListEntry::Resource(reference) => mod_list.references.push(reference),
                ModListEntry::Setting { key, value } => {
                    let value = Some(value).filter(|v| !v.is_empty());
                    match key.as_str() {
                        "minecraft" => mod_list.game_version = value,
                        "name" => mod_list.name = value,
                        "author" => mod_list.author = value,
                        "version" => mod_list.version = value,
                        "forge" => mod_list.forge = value,
                        "overrides" => mod_list.overrides = value,
                        "overrides_url" => mod_list.overrides_url = value,
                        _ => {}
                    }
                }
            }
        }

        mod_list
    }

    /// Apply defaults and produce a canonical manifest.
    ///
    /// `overrides=` is taken relative to `source_dir` (the mod-list's folder).
    /// `overrides_url` is left to the caller since it needs the network.
    pub fn into_manifest(self, config: &InstallerConfig, path: &Path, source_dir: &Path) -> Result<Manifest> {
        let game_version = self.game_version.ok_or_else(|| InstallError::MissingGameVersion {
            path: path.to_path_buf(),
        })?;

        let mod_loaders = self
            .forge
            .map(|forge| {
                let id = if forge.starts_with("forge") {
                    forge
                } else {
                    format!("forge-{}", forge)
                };
                vec![ModLoader { id, primary: true }]
            })
            .unwrap_or_default();

        let overrides = self
            .overrides
            .map(|relative| source_dir.join(relative).to_string_lossy().into_owned());

        Ok(Manifest {
            name: self.name.unwrap_or_else(|| config.default_pack_name.clone()),
            version: self.version.unwrap_or_else(|| config.default_pack_version.clone()),
            author: self.author.unwrap_or_else(|| config.author()),
            manifest_type: Some(MANIFEST_TYPE.to_string()),
            manifest_version: Some(1),
            minecraft: GameRequirements {
                version: game_version,
                mod_loaders,
            },
            references: self.references,
            overrides,
        })
    }
}
