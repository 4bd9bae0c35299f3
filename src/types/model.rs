//! Model metadata types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version of the prediction response schema.
pub const SCHEMA_VERSION: &str = "v1";

/// Metadata about the active model, as served by `GET /model`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub provider: String,
    pub model_name: String,
    pub model_version: String,
    /// Free-form creation timestamp copied from the artifact.
    pub created_at: String,
    pub artifact_path: String,
    /// Lowercase hex SHA-256 of the artifact body.
    pub artifact_checksum_sha256: String,
    /// Rule configuration as it appears in the artifact.
    pub rule_config: Value,
}

/// Model identification embedded in every prediction response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelBlock {
    pub provider: String,
    pub model_name: String,
    pub model_version: String,
    pub artifact_checksum_sha256: String,
    pub schema_version: String,
}

impl From<&ModelInfo> for ModelBlock {
    fn from(info: &ModelInfo) -> Self {
        Self {
            provider: info.provider.clone(),
            model_name: info.model_name.clone(),
            model_version: info.model_version.clone(),
            artifact_checksum_sha256: info.artifact_checksum_sha256.clone(),
            schema_version: SCHEMA_VERSION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn model_block_from_info() {
        let info = ModelInfo {
            provider: "mock".into(),
            model_name: "risk_triad_classifier".into(),
            model_version: "1.0.0".into(),
            created_at: "2025-01-01T00:00:00Z".into(),
            artifact_path: "model_artifacts/model_v1.json".into(),
            artifact_checksum_sha256: "ab".repeat(32),
            rule_config: json!({"base_score": 0.1}),
        };
        let block = ModelBlock::from(&info);
        assert_eq!(block.model_version, "1.0.0");
        assert_eq!(block.schema_version, "v1");
        assert_eq!(block.artifact_checksum_sha256, info.artifact_checksum_sha256);
    }
}
