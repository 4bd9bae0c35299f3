//! Triad - deterministic risk scoring with checksummed model artifacts
//!
//! A model is a JSON artifact holding a rule configuration. The
//! [`ModelRegistry`] loads the version named by a manifest, verifies its
//! SHA-256 against a checksum table, compiles its rules once, and publishes
//! the result as an immutable snapshot that can be swapped at runtime.
//! [`score`] evaluates one input against a compiled rule set and labels it
//! `low_risk`, `medium_risk` or `high_risk`.
//!
//! # Scoring Example
//!
//! ```rust,no_run
//! use triad::ModelRegistry;
//!
//! fn main() -> triad::Result<()> {
//!     let registry = ModelRegistry::new("model_artifacts");
//!     let snapshot = registry.load()?;
//!
//!     let result = triad::score("routine order", 250.0, 10, "amazon", &snapshot.rules)?;
//!     println!("{} {} {:?}", result.score, result.label, result.reasons);
//!     Ok(())
//! }
//! ```
//!
//! # Serving Predictions
//!
//! [`Predictor`] wraps the registry with guardrails, an optional cache and
//! an audit sink. The `triadd` binary (feature `server`) exposes it over
//! HTTP.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use triad::{ModelRegistry, Predictor};
//! use triad::types::{InputItem, PredictRequest};
//!
//! let registry = Arc::new(ModelRegistry::new("model_artifacts"));
//! registry.load()?;
//! let predictor = Predictor::new(registry);
//! let response = predictor
//!     .predict(
//!         PredictRequest { request_id: None, inputs: vec![InputItem::new("1", "routine order")] },
//!         "alice@example.com",
//!     )
//!     .await?;
//! ```

pub mod artifact;
pub mod audit;
pub mod cache;
pub mod error;
pub mod guardrails;
pub mod predict;
pub mod registry;
pub mod scoring;
#[cfg(feature = "server")]
pub mod server;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use error::{Result, TriadError};
pub use predict::Predictor;
pub use registry::{ArtifactSource, ModelRegistry, ModelSnapshot};
pub use scoring::{RiskLabel, RuleConfig, Score, score, score_value};
pub use types::ModelInfo;
pub use version::{GIT_BRANCH, GIT_SHA, PKG_VERSION, git_dirty, long_version, version_string};
