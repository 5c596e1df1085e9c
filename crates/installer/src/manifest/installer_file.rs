//! Installer description (`.ccip`) parsing
//!
//! ```xml
//! <package>
//!   <project id="238222" file="2803400" />
//! </package>
//! ```

use std::path::Path;

use quick_xml::de::from_str;
use serde::Deserialize;

use super::ResourceReference;
use crate::error::{InstallError, Result};

#[derive(Debug, Deserialize, Default)]
struct InstallerDescription {
    #[serde(default)]
    project: Option<ProjectElement>,
}

#[derive(Debug, Deserialize)]
struct ProjectElement {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@file")]
    file: String,
}

/// Extract the pack reference named by an installer description
pub fn parse(xml: &str, path: &Path) -> Result<ResourceReference> {
    let description: InstallerDescription = from_str(xml).map_err(|source| InstallError::InstallerFile {
        path: path.to_path_buf(),
        source,
    })?;

    let project = description
        .project
        .ok_or_else(|| InstallError::invalid_manifest(format!("unrecognized installer file '{}'", path.display())))?;

    Ok(ResourceReference::new(project.id, project.file))
}
