//! `/predict` request and response schemas.

use serde::{Deserialize, Serialize};

use crate::scoring::RiskLabel;
use crate::types::ModelBlock;
use crate::{Result, TriadError};

/// Channel assumed when an input carries no features.
pub const DEFAULT_CHANNEL: &str = "direct";

/// Structured features of one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Features {
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub units: i64,
    #[serde(default = "default_channel")]
    pub channel: String,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            price: 0.0,
            units: 0,
            channel: default_channel(),
        }
    }
}

fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

/// One item to score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputItem {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Features>,
}

impl InputItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            features: None,
        }
    }

    pub fn with_features(mut self, features: Features) -> Self {
        self.features = Some(features);
        self
    }

    /// Features with defaults filled in.
    pub fn features_or_default(&self) -> Features {
        self.features.clone().unwrap_or_default()
    }
}

/// Body of `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub inputs: Vec<InputItem>,
}

impl PredictRequest {
    /// Check input count bounds and that every text is non-blank.
    pub fn validate(&self, max_inputs: usize) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(TriadError::InvalidInput(
                "inputs must contain at least 1 item".to_string(),
            ));
        }
        if self.inputs.len() > max_inputs {
            return Err(TriadError::InvalidInput(format!(
                "inputs must contain at most {max_inputs} items, got {}",
                self.inputs.len()
            )));
        }
        if let Some(item) = self.inputs.iter().find(|i| i.text.trim().is_empty()) {
            return Err(TriadError::InvalidInput(format!(
                "input {:?}: text must be non-empty",
                item.id
            )));
        }
        Ok(())
    }
}

/// Score for one input, echoed back with its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub label: RiskLabel,
    pub score: f64,
    pub reasons: Vec<String>,
}

/// Body of a successful `POST /predict` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub request_id: String,
    pub model: ModelBlock,
    pub predictions: Vec<Prediction>,
    #[serde(default)]
    pub guardrails_triggered: Vec<String>,
    pub latency_ms: u64,
}

/// Error body shared by every non-2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default)]
    pub guardrails_triggered: Vec<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
            request_id: None,
            guardrails_triggered: Vec::new(),
        }
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn guardrails(mut self, triggered: Vec<String>) -> Self {
        self.guardrails_triggered = triggered;
        self
    }
}
