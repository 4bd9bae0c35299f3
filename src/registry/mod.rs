//! Model registry: owns the active model snapshot.
//!
//! The registry reads three kinds of files from one artifacts directory:
//! the manifest, the checksum table, and the artifact body named by the
//! manifest's active version. A successful [`load`](ModelRegistry::load) or
//! [`reload`](ModelRegistry::reload) builds a complete [`ModelSnapshot`]
//! first and only then publishes it by swapping a single `Arc`. Readers
//! holding an older snapshot keep using it untouched; a failed attempt
//! publishes nothing, so the previous model (or the unloaded state) stays
//! in effect.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{info, warn};

use crate::artifact::{self, ChecksumTable, ModelArtifact, ModelManifest};
use crate::scoring::RuleConfig;
use crate::telemetry;
use crate::types::{ModelBlock, ModelInfo, SCHEMA_VERSION};
use crate::{Result, TriadError};

/// Default manifest file name.
pub const DEFAULT_MANIFEST_FILE: &str = "model_manifest.json";

/// Default checksum table file name.
pub const DEFAULT_CHECKSUMS_FILE: &str = "CHECKSUMS.json";

/// Where the registry finds its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
    pub artifacts_dir: PathBuf,
    pub manifest_file: String,
    pub checksums_file: String,
}

impl ArtifactSource {
    /// Source using the default file names inside `artifacts_dir`.
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifacts_dir: artifacts_dir.into(),
            manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
            checksums_file: DEFAULT_CHECKSUMS_FILE.to_string(),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.artifacts_dir.join(&self.manifest_file)
    }

    pub fn checksums_path(&self) -> PathBuf {
        self.artifacts_dir.join(&self.checksums_file)
    }

    /// Read the manifest and build a snapshot of its active version.
    ///
    /// The artifact body is read once; the digest is computed over exactly
    /// the bytes that get parsed.
    pub fn build_snapshot(&self) -> Result<ModelSnapshot> {
        let manifest = ModelManifest::from_file(&self.manifest_path())?;
        let checksums = ChecksumTable::from_file(&self.checksums_path())?;

        let version = manifest.active_version.clone();
        let file = manifest.resolve_artifact_file(&version)?.to_string();
        let artifact_path = self.artifacts_dir.join(&file);

        let bytes = std::fs::read(&artifact_path).map_err(|e| TriadError::ArtifactParse {
            file: file.clone(),
            message: format!("failed to read artifact: {e}"),
        })?;
        let checksum = artifact::digest_bytes(&bytes);
        artifact::verify(&file, checksums.expected(&file), &checksum)?;

        let artifact = ModelArtifact::parse(&file, &bytes)?;
        let rules = RuleConfig::compile(&artifact.rule_config).map_err(|e| {
            TriadError::ArtifactParse {
                file: file.clone(),
                message: e.to_string(),
            }
        })?;

        Ok(ModelSnapshot {
            version,
            checksum,
            artifact_path,
            artifact,
            rules: Arc::new(rules),
        })
    }
}

/// An immutable, fully validated model: what readers see.
#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    pub version: String,
    /// Lowercase hex SHA-256 of the artifact body.
    pub checksum: String,
    pub artifact_path: PathBuf,
    pub artifact: ModelArtifact,
    pub rules: Arc<RuleConfig>,
}

impl ModelSnapshot {
    /// Metadata view of this snapshot.
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            provider: self.artifact.provider.clone(),
            model_name: self.artifact.model_name.clone(),
            model_version: self.version.clone(),
            created_at: self.artifact.created_at.clone(),
            artifact_path: self.artifact_path.display().to_string(),
            artifact_checksum_sha256: self.checksum.clone(),
            rule_config: self.artifact.rule_config.clone(),
        }
    }

    /// Model identification for prediction responses.
    pub fn model_block(&self) -> ModelBlock {
        ModelBlock {
            provider: self.artifact.provider.clone(),
            model_name: self.artifact.model_name.clone(),
            model_version: self.version.clone(),
            artifact_checksum_sha256: self.checksum.clone(),
            schema_version: SCHEMA_VERSION.to_string(),
        }
    }
}

/// Process-wide owner of the active model snapshot.
///
/// Cheap to share behind an `Arc`; every accessor takes `&self`.
#[derive(Debug)]
pub struct ModelRegistry {
    source: ArtifactSource,
    active: RwLock<Option<Arc<ModelSnapshot>>>,
    /// Serialises load/reload so two swaps cannot interleave.
    reload_lock: Mutex<()>,
}

impl ModelRegistry {
    /// Create an unloaded registry reading from `artifacts_dir` with default file names.
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Self {
        Self::with_source(ArtifactSource::new(artifacts_dir))
    }

    /// Create an unloaded registry with an explicit source.
    pub fn with_source(source: ArtifactSource) -> Self {
        Self {
            source,
            active: RwLock::new(None),
            reload_lock: Mutex::new(()),
        }
    }

    pub fn source(&self) -> &ArtifactSource {
        &self.source
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.source.artifacts_dir
    }

    /// Load the manifest's active version.
    ///
    /// On failure the registry keeps whatever state it had (unloaded on
    /// first start).
    pub fn load(&self) -> Result<Arc<ModelSnapshot>> {
        let snapshot = self.swap_in("load")?;
        info!(
            model_version = %snapshot.version,
            artifact_checksum = %snapshot.checksum,
            "model registry loaded"
        );
        Ok(snapshot)
    }

    /// Re-read the manifest and switch to its (possibly new) active version.
    ///
    /// On failure the previously active snapshot stays in effect.
    pub fn reload(&self) -> Result<Arc<ModelSnapshot>> {
        let previous = self.active_version();
        let snapshot = self.swap_in("reload")?;
        info!(
            previous_version = previous.as_deref().unwrap_or("none"),
            model_version = %snapshot.version,
            artifact_checksum = %snapshot.checksum,
            "model reloaded"
        );
        Ok(snapshot)
    }

    fn swap_in(&self, operation: &'static str) -> Result<Arc<ModelSnapshot>> {
        let _guard = self
            .reload_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match self.source.build_snapshot() {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *self.active.write().unwrap_or_else(PoisonError::into_inner) =
                    Some(Arc::clone(&snapshot));
                metrics::counter!(telemetry::MODEL_LOADS_TOTAL, "operation" => operation, "status" => "ok")
                    .increment(1);
                Ok(snapshot)
            }
            Err(e) => {
                metrics::counter!(telemetry::MODEL_LOADS_TOTAL, "operation" => operation, "status" => "error")
                    .increment(1);
                warn!(
                    operation,
                    error = %e,
                    kept_version = self.active_version().as_deref().unwrap_or("none"),
                    "model load failed; keeping previous state"
                );
                Err(e)
            }
        }
    }

    /// The active snapshot, or [`TriadError::NotLoaded`].
    pub fn snapshot(&self) -> Result<Arc<ModelSnapshot>> {
        self.current().ok_or(TriadError::NotLoaded)
    }

    fn current(&self) -> Option<Arc<ModelSnapshot>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Metadata view of the active model.
    pub fn get_model_info(&self) -> Result<ModelInfo> {
        self.snapshot().map(|s| s.info())
    }

    pub fn is_loaded(&self) -> bool {
        self.current().is_some()
    }

    pub fn active_version(&self) -> Option<String> {
        self.current().map(|s| s.version.clone())
    }

    pub fn active_checksum(&self) -> Option<String> {
        self.current().map(|s| s.checksum.clone())
    }
}
