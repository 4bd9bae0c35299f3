//! Model manifest: which artifact file backs the active version.
//!
//! Two manifest generations are accepted so that artifact directories can be
//! migrated without a flag day:
//!
//! ```json
//! {"active_model_version": "1.0.0",
//!  "versions": {"1.0.0": {"artifact_file": "model_v1.json"}}}
//! ```
//!
//! ```json
//! {"active_model_version": "1.0.0",
//!  "available_versions": ["1.0.0"],
//!  "paths": {"1.0.0": "model_v1.json"}}
//! ```
//!
//! A non-empty `versions` table takes priority over the newer layout.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use serde::Deserialize;

use crate::{Result, TriadError};

/// Artifact descriptor in the legacy manifest layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionDescriptor {
    pub artifact_file: String,
}

/// Resolution table, resolved once from whichever layout the file used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestLayout {
    /// `versions: {version → {artifact_file}}`
    Legacy {
        versions: BTreeMap<String, VersionDescriptor>,
    },
    /// `available_versions: [..]` plus `paths: {version → file}`
    Current {
        available_versions: Vec<String>,
        paths: BTreeMap<String, String>,
    },
}

/// Parsed model manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelManifest {
    pub active_version: String,
    pub layout: ManifestLayout,
}

/// On-disk shape, tolerant of both layouts.
#[derive(Deserialize)]
struct RawManifest {
    #[serde(alias = "active_version")]
    active_model_version: String,
    #[serde(default)]
    versions: Option<BTreeMap<String, VersionDescriptor>>,
    #[serde(default)]
    available_versions: Vec<String>,
    #[serde(default)]
    paths: BTreeMap<String, String>,
}

impl From<RawManifest> for ModelManifest {
    fn from(raw: RawManifest) -> Self {
        let layout = match raw.versions {
            Some(versions) if !versions.is_empty() => ManifestLayout::Legacy { versions },
            _ => ManifestLayout::Current {
                available_versions: raw.available_versions,
                paths: raw.paths,
            },
        };
        Self {
            active_version: raw.active_model_version,
            layout,
        }
    }
}

impl ModelManifest {
    /// Parse a manifest from JSON text.
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawManifest>(json).map(Self::from)
    }

    /// Read and parse a manifest file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TriadError::ManifestRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&content).map_err(|e| TriadError::ManifestRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Artifact file name for the manifest's own active version.
    pub fn active_artifact_file(&self) -> Result<&str> {
        self.resolve_artifact_file(&self.active_version)
    }

    /// Artifact file name for `version`.
    ///
    /// The file name must be relative and must not leave the artifacts
    /// directory.
    pub fn resolve_artifact_file(&self, version: &str) -> Result<&str> {
        let not_found = || TriadError::VersionNotFound {
            version: version.to_string(),
        };
        let file = match &self.layout {
            ManifestLayout::Legacy { versions } => versions
                .get(version)
                .map(|d| d.artifact_file.as_str())
                .ok_or_else(not_found)?,
            ManifestLayout::Current {
                available_versions,
                paths,
            } => {
                if !available_versions.iter().any(|v| v == version) {
                    return Err(not_found());
                }
                paths.get(version).map(String::as_str).ok_or_else(not_found)?
            }
        };

        let contained = !file.is_empty()
            && Path::new(file)
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained {
            return Err(TriadError::ManifestRead {
                path: file.into(),
                message: format!("artifact path for version {version} escapes the artifacts directory"),
            });
        }
        Ok(file)
    }

    /// Every version that resolves to an artifact file, with that file.
    pub fn versions(&self) -> Vec<(&str, &str)> {
        match &self.layout {
            ManifestLayout::Legacy { versions } => versions
                .iter()
                .map(|(v, d)| (v.as_str(), d.artifact_file.as_str()))
                .collect(),
            ManifestLayout::Current {
                available_versions,
                paths,
            } => available_versions
                .iter()
                .filter_map(|v| paths.get(v).map(|p| (v.as_str(), p.as_str())))
                .collect(),
        }
    }
}
