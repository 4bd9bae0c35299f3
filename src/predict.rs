//! Prediction request orchestration.
//!
//! [`Predictor`] ties the guardrails, registry, scoring engine, cache and
//! audit sink together for one `/predict` call:
//!
//! 1. validate the request and assign a request id
//! 2. hash the caller identity
//! 3. policy check (blocked requests are audited and rejected)
//! 4. take one registry snapshot, used for the whole request
//! 5. score every input, through the cache when one is configured
//! 6. build the response and digest it
//! 7. audit and return
//!
//! Transport concerns (headers, status codes) stay in the server.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use crate::artifact::digest_bytes;
use crate::audit::{self, AuditRecord, AuditSink, AuditStatus, NoopAuditSink};
use crate::cache::{CacheConfig, CacheKey, PredictionCache};
use crate::guardrails::{self, POLICY_BLOCK, PolicyGuard};
use crate::registry::{ModelRegistry, ModelSnapshot};
use crate::scoring::{self, Score};
use crate::telemetry;
use crate::types::{InputItem, PredictRequest, PredictResponse, Prediction};
use crate::{Result, TriadError};

/// Route name recorded in audit records.
pub const PREDICT_ROUTE: &str = "/predict";

/// Default upper bound on inputs per request.
pub const DEFAULT_MAX_INPUTS: usize = 50;

/// Model version recorded for requests blocked before any model was loaded.
const UNKNOWN_VERSION: &str = "unknown";

/// Scores prediction requests against the registry's active model.
pub struct Predictor {
    registry: Arc<ModelRegistry>,
    audit: Arc<dyn AuditSink>,
    policy: PolicyGuard,
    cache: Option<PredictionCache>,
    max_inputs: usize,
}

impl Predictor {
    /// Predictor with default policy, no cache and auditing disabled.
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            audit: Arc::new(NoopAuditSink),
            policy: PolicyGuard::default(),
            cache: None,
            max_inputs: DEFAULT_MAX_INPUTS,
        }
    }

    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn policy(mut self, policy: PolicyGuard) -> Self {
        self.policy = policy;
        self
    }

    /// Enable the prediction cache.
    pub fn cache(mut self, config: &CacheConfig) -> Self {
        self.cache = Some(PredictionCache::new(config));
        self
    }

    pub fn max_inputs(mut self, n: usize) -> Self {
        self.max_inputs = n;
        self
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Handle one prediction request on behalf of `user_email`.
    ///
    /// Errors map onto outcomes: [`TriadError::InvalidInput`] (rejected
    /// before anything else happens), [`TriadError::PolicyBlocked`]
    /// (audited as `blocked`), [`TriadError::NotLoaded`], and scoring
    /// failures (audited as `error`).
    pub async fn predict(&self, request: PredictRequest, user_email: &str) -> Result<PredictResponse> {
        let start = Instant::now();
        metrics::counter!(telemetry::PREDICT_REQUESTS_TOTAL).increment(1);

        let result = self.run(request, user_email, start).await;
        if let Err(e) = &result {
            metrics::counter!(telemetry::PREDICT_ERRORS_TOTAL, "reason" => e.kind()).increment(1);
        }
        result
    }

    async fn run(
        &self,
        request: PredictRequest,
        user_email: &str,
        start: Instant,
    ) -> Result<PredictResponse> {
        request.validate(self.max_inputs)?;

        let request_id = request
            .request_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let user_hash = guardrails::hash_email(user_email);
        let num_inputs = request.inputs.len();

        if self
            .policy
            .is_blocked(request.inputs.iter().map(|i| i.text.as_str()))
        {
            let record = AuditRecord::new(&request_id, &user_hash, PREDICT_ROUTE, AuditStatus::Blocked)
                .model(
                    self.registry
                        .active_version()
                        .unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
                    self.registry.active_checksum().unwrap_or_default(),
                )
                .num_inputs(num_inputs)
                .guardrails(vec![POLICY_BLOCK.to_string()])
                .latency_ms(elapsed_ms(start));
            audit::record(self.audit.as_ref(), &record).await;
            warn!(request_id = %request_id, num_inputs, "request blocked by policy");
            return Err(TriadError::PolicyBlocked { request_id });
        }

        let snapshot = self.registry.snapshot()?;

        let mut predictions = Vec::with_capacity(num_inputs);
        for item in &request.inputs {
            match self.score_item(&snapshot, item).await {
                Ok(score) => predictions.push(Prediction {
                    id: item.id.clone(),
                    label: score.label,
                    score: score.score,
                    reasons: score.reasons,
                }),
                Err(e) => {
                    let record =
                        AuditRecord::new(&request_id, &user_hash, PREDICT_ROUTE, AuditStatus::Error)
                            .model(&snapshot.version, &snapshot.checksum)
                            .num_inputs(num_inputs)
                            .latency_ms(elapsed_ms(start));
                    audit::record(self.audit.as_ref(), &record).await;
                    warn!(request_id = %request_id, input_id = %item.id, error = %e, "scoring failed");
                    return Err(e);
                }
            }
        }

        let response = PredictResponse {
            request_id: request_id.clone(),
            model: snapshot.model_block(),
            predictions,
            guardrails_triggered: Vec::new(),
            latency_ms: elapsed_ms(start),
        };
        let response_checksum = digest_bytes(&serde_json::to_vec(&response)?);

        let record = AuditRecord::new(&request_id, &user_hash, PREDICT_ROUTE, AuditStatus::Success)
            .model(&snapshot.version, &snapshot.checksum)
            .num_inputs(num_inputs)
            .latency_ms(response.latency_ms)
            .response_checksum(response_checksum);
        audit::record(self.audit.as_ref(), &record).await;

        info!(
            request_id = %request_id,
            model_version = %snapshot.version,
            num_inputs,
            latency_ms = response.latency_ms,
            "prediction served"
        );
        Ok(response)
    }

    async fn score_item(&self, snapshot: &ModelSnapshot, item: &InputItem) -> Result<Score> {
        let features = item.features_or_default();
        let Some(cache) = &self.cache else {
            return scoring::score(
                &item.text,
                features.price,
                features.units,
                &features.channel,
                &snapshot.rules,
            );
        };

        let key = CacheKey {
            artifact_checksum: &snapshot.checksum,
            text: &item.text,
            price: features.price,
            units: features.units,
            channel: &features.channel,
        };
        if let Some(score) = cache.get(&key).await {
            return Ok(score);
        }
        let score = scoring::score(
            &item.text,
            features.price,
            features.units,
            &features.channel,
            &snapshot.rules,
        )?;
        cache.insert(&key, score.clone()).await;
        Ok(score)
    }
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("registry", &self.registry)
            .field("policy", &self.policy)
            .field("cache", &self.cache)
            .field("max_inputs", &self.max_inputs)
            .finish_non_exhaustive()
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
