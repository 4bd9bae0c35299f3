//! Model artifact body: metadata plus the raw rule configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, TriadError};

const DEFAULT_PROVIDER: &str = "mock";
const DEFAULT_MODEL_NAME: &str = "risk_triad_classifier";

/// A loaded artifact document.
///
/// `rule_config` is kept in its raw JSON form for reporting; the compiled
/// form lives in [`RuleConfig`](crate::scoring::RuleConfig).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelArtifact {
    pub provider: String,
    pub model_name: String,
    pub created_at: String,
    pub rule_config: Value,
}

#[derive(Deserialize)]
struct RawArtifact {
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    model_name: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    rule_config: Option<Value>,
    /// Legacy key, consulted only when `rule_config` is absent or null.
    #[serde(default)]
    config: Option<Value>,
}

impl ModelArtifact {
    /// Parse an artifact body. `file` is used for error context only.
    pub fn parse(file: &str, bytes: &[u8]) -> Result<Self> {
        let raw: RawArtifact =
            serde_json::from_slice(bytes).map_err(|e| TriadError::ArtifactParse {
                file: file.to_string(),
                message: e.to_string(),
            })?;

        let rule_config = raw
            .rule_config
            .filter(|v| !v.is_null())
            .or(raw.config.filter(|v| !v.is_null()))
            .ok_or_else(|| TriadError::ArtifactParse {
                file: file.to_string(),
                message: "missing rule_config".to_string(),
            })?;

        Ok(Self {
            provider: raw.provider.unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            model_name: raw
                .model_name
                .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            created_at: raw.created_at.unwrap_or_default(),
            rule_config,
        })
    }
}
