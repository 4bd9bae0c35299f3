//! Configuration loading for triadd.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.triad/config.toml` (user)
//! 3. `/etc/triad/config.toml` (system)
//!
//! When none of these exist the built-in defaults are used. Environment
//! overrides are applied afterwards:
//! - `MODEL_DIR` replaces `model.artifacts_dir`
//! - `AUDIT_LOG_DIR` places the audit log at `<dir>/audit.jsonl`
//! - `TRIAD_ADDRESS` replaces `server.address`

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::guardrails::{DEFAULT_DISALLOWED_PHRASES, PolicyGuard};
use crate::registry::{ArtifactSource, DEFAULT_CHECKSUMS_FILE, DEFAULT_MANIFEST_FILE};
use crate::{Result, TriadError};

pub const ENV_MODEL_DIR: &str = "MODEL_DIR";
pub const ENV_AUDIT_LOG_DIR: &str = "AUDIT_LOG_DIR";
pub const ENV_ADDRESS: &str = "TRIAD_ADDRESS";

/// Audit file name used when the directory comes from `AUDIT_LOG_DIR`.
const AUDIT_FILE_NAME: &str = "audit.jsonl";

/// Daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub guardrails: GuardrailsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:8080).
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            limits: LimitsConfig::default(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:8080".to_string()
}

/// Request limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum inputs per prediction request (default: 50).
    #[serde(default = "default_max_inputs")]
    pub max_inputs: usize,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_inputs: default_max_inputs(),
            request_timeout_secs: default_timeout(),
        }
    }
}

impl LimitsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_max_inputs() -> usize {
    crate::predict::DEFAULT_MAX_INPUTS
}

fn default_timeout() -> u64 {
    30
}

/// Where model artifacts live.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,
    #[serde(default = "default_checksums_file")]
    pub checksums_file: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: default_artifacts_dir(),
            manifest_file: default_manifest_file(),
            checksums_file: default_checksums_file(),
        }
    }
}

impl ModelConfig {
    pub fn source(&self) -> ArtifactSource {
        ArtifactSource {
            artifacts_dir: self.artifacts_dir.clone(),
            manifest_file: self.manifest_file.clone(),
            checksums_file: self.checksums_file.clone(),
        }
    }
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("model_artifacts")
}

fn default_manifest_file() -> String {
    DEFAULT_MANIFEST_FILE.to_string()
}

fn default_checksums_file() -> String {
    DEFAULT_CHECKSUMS_FILE.to_string()
}

/// Audit log settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_audit_path")]
    pub path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_audit_path(),
        }
    }
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("audit_logs").join(AUDIT_FILE_NAME)
}

fn default_true() -> bool {
    true
}

/// `[cache]` section. Disabled unless `enabled = true`.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: u64,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: default_cache_max_entries(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

impl CacheSection {
    /// Cache configuration, or `None` when caching is disabled.
    pub fn to_cache_config(&self) -> Option<CacheConfig> {
        self.enabled.then(|| {
            CacheConfig::new()
                .max_entries(self.max_entries)
                .ttl(Duration::from_secs(self.ttl_secs))
        })
    }
}

fn default_cache_max_entries() -> u64 {
    10_000
}

fn default_cache_ttl() -> u64 {
    3600
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuardrailsConfig {
    #[serde(default = "default_phrases")]
    pub disallowed_phrases: Vec<String>,
}

impl Default for GuardrailsConfig {
    fn default() -> Self {
        Self {
            disallowed_phrases: default_phrases(),
        }
    }
}

impl GuardrailsConfig {
    pub fn policy(&self) -> PolicyGuard {
        PolicyGuard::new(&self.disallowed_phrases)
    }
}

fn default_phrases() -> Vec<String> {
    DEFAULT_DISALLOWED_PHRASES
        .iter()
        .map(|p| p.to_string())
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output (default: true).
    #[serde(default = "default_true")]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { json: true }
    }
}

impl Config {
    /// Load configuration from the standard locations, then apply
    /// environment overrides.
    ///
    /// An explicit path that does not exist is an error; otherwise a
    /// missing config file falls back to the defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a config file without applying overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            TriadError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            TriadError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = set(ENV_MODEL_DIR) {
            self.model.artifacts_dir = PathBuf::from(dir);
        }
        if let Some(dir) = set(ENV_AUDIT_LOG_DIR) {
            self.audit.path = PathBuf::from(dir).join(AUDIT_FILE_NAME);
        }
        if let Some(address) = set(ENV_ADDRESS) {
            self.server.address = address;
        }
    }

    /// Resolve the config file path, if any.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(TriadError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".triad").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/triad/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.address, "127.0.0.1:8080");
        assert_eq!(config.server.limits.max_inputs, 50);
        assert_eq!(config.server.limits.request_timeout_secs, 30);
        assert_eq!(config.model.artifacts_dir, PathBuf::from("model_artifacts"));
        assert_eq!(config.model.manifest_file, "model_manifest.json");
        assert!(config.audit.enabled);
        assert_eq!(config.audit.path, PathBuf::from("audit_logs/audit.jsonl"));
        assert!(config.cache.to_cache_config().is_none());
        assert_eq!(config.guardrails.disallowed_phrases.len(), 4);
        assert!(config.logging.json);
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [server]
            address = "0.0.0.0:8080"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.address, "0.0.0.0:8080");
        // Defaults preserved
        assert_eq!(config.server.limits.max_inputs, 50);
        assert_eq!(config.model.checksums_file, "CHECKSUMS.json");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [server]
            address = "127.0.0.1:9000"

            [server.limits]
            max_inputs = 10
            request_timeout_secs = 5

            [model]
            artifacts_dir = "/srv/models"
            manifest_file = "manifest.json"

            [audit]
            enabled = false
            path = "/var/log/triad/audit.jsonl"

            [cache]
            enabled = true
            max_entries = 500
            ttl_secs = 60

            [guardrails]
            disallowed_phrases = ["wire me money"]

            [logging]
            json = false
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.limits.max_inputs, 10);
        assert_eq!(config.server.limits.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.model.source().manifest_path(), PathBuf::from("/srv/models/manifest.json"));
        assert!(!config.audit.enabled);
        let cache = config.cache.to_cache_config().unwrap();
        assert_eq!(cache.max_entries, 500);
        assert_eq!(cache.ttl, Duration::from_secs(60));
        assert!(config.guardrails.policy().is_blocked(["please WIRE ME MONEY"]));
        assert!(!config.guardrails.policy().is_blocked(["phish"]));
        assert!(!config.logging.json);
    }

    #[test]
    fn env_overrides_applied() {
        let env: HashMap<&str, &str> = [
            ("MODEL_DIR", "/opt/models"),
            ("AUDIT_LOG_DIR", "/var/audit"),
            ("TRIAD_ADDRESS", "0.0.0.0:9999"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.model.artifacts_dir, PathBuf::from("/opt/models"));
        assert_eq!(config.audit.path, PathBuf::from("/var/audit/audit.jsonl"));
        assert_eq!(config.server.address, "0.0.0.0:9999");
    }

    #[test]
    fn blank_env_values_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|_| Some("  ".to_string()));
        assert_eq!(config.server.address, "127.0.0.1:8080");
    }

    #[test]
    fn config_not_found_returns_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }

    #[test]
    fn malformed_config_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server\naddress = 1").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(TriadError::Configuration(_))
        ));
    }

    #[test]
    fn bundled_example_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("triad.example.toml");
        let example = Config::from_file(&path).unwrap();
        let defaults = Config::default();
        assert_eq!(example.server.address, defaults.server.address);
        assert_eq!(example.server.limits.max_inputs, defaults.server.limits.max_inputs);
        assert_eq!(example.model.artifacts_dir, defaults.model.artifacts_dir);
        assert_eq!(example.audit.path, defaults.audit.path);
        assert_eq!(example.cache.max_entries, defaults.cache.max_entries);
        assert_eq!(
            example.guardrails.disallowed_phrases,
            defaults.guardrails.disallowed_phrases
        );
    }
}
