//! Tests for [`Predictor`] request orchestration: guardrails, scoring,
//! response checksums and audit records.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

use triad::artifact::digest_bytes;
use triad::audit::{AuditRecord, AuditSink, AuditStatus};
use triad::cache::CacheConfig;
use triad::guardrails::{PolicyGuard, hash_email};
use triad::types::{Features, InputItem, PredictRequest};
use triad::{ModelRegistry, Predictor, Result, RiskLabel, TriadError};

// ============================================================================
// Mock audit sinks
// ============================================================================

#[derive(Default)]
struct MemorySink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemorySink {
    fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn write(&self, record: &AuditRecord) -> Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl AuditSink for FailingSink {
    async fn write(&self, _record: &AuditRecord) -> Result<()> {
        Err(TriadError::Io(std::io::Error::other("disk full")))
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Artifacts dir with the end-to-end rule set and no recorded digests.
fn artifacts_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let body = json!({
        "provider": "mock",
        "model_name": "risk_triad_classifier",
        "created_at": "2025-01-01T00:00:00Z",
        "rule_config": {
            "base_score": 0.1,
            "channel_weights": {"amazon": 0.1},
            "price_rules": [{"if_price_gte": 200, "add": 0.3, "reason": "high_price"}],
            "text_rules": [{"keywords_any": ["chargeback"], "add": 0.4, "reason": "negative_signal"}],
            "risk_thresholds": {"low_risk_max": 0.3, "medium_risk_max": 0.6}
        }
    });
    write(dir.path(), "model_v1.json", &body.to_string());
    write(dir.path(), "CHECKSUMS.json", "{}");
    write(
        dir.path(),
        "model_manifest.json",
        &json!({
            "active_model_version": "1.0.0",
            "available_versions": ["1.0.0"],
            "paths": {"1.0.0": "model_v1.json"}
        })
        .to_string(),
    );
    dir
}

fn write(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).unwrap();
}

fn loaded_registry(dir: &TempDir) -> Arc<ModelRegistry> {
    let registry = Arc::new(ModelRegistry::new(dir.path()));
    registry.load().unwrap();
    registry
}

fn amazon_order(id: &str, text: &str) -> InputItem {
    InputItem::new(id, text).with_features(Features {
        price: 250.0,
        units: 10,
        channel: "amazon".to_string(),
    })
}

fn request(inputs: Vec<InputItem>) -> PredictRequest {
    PredictRequest {
        request_id: Some("req-1".to_string()),
        inputs,
    }
}

const EMAIL: &str = "TestUser@Example.com ";

// ============================================================================
// Success path
// ============================================================================

#[tokio::test]
async fn predict_scores_every_input() {
    let dir = artifacts_dir();
    let registry = loaded_registry(&dir);
    let predictor = Predictor::new(Arc::clone(&registry));

    let response = predictor
        .predict(
            request(vec![
                amazon_order("a", "routine order"),
                InputItem::new("b", "customer threatens CHARGEBACK"),
            ]),
            EMAIL,
        )
        .await
        .unwrap();

    assert_eq!(response.request_id, "req-1");
    assert_eq!(response.model.model_version, "1.0.0");
    assert_eq!(response.model.schema_version, "v1");
    assert_eq!(
        Some(response.model.artifact_checksum_sha256.clone()),
        registry.active_checksum()
    );
    assert!(response.guardrails_triggered.is_empty());

    let a = &response.predictions[0];
    assert_eq!(a.id, "a");
    assert_eq!(a.score, 0.5);
    assert_eq!(a.label, RiskLabel::MediumRisk);
    assert_eq!(a.reasons, vec!["channel_amazon", "high_price"]);

    // Defaults: price 0, units 0, channel "direct".
    let b = &response.predictions[1];
    assert_eq!(b.score, 0.5);
    assert_eq!(b.reasons, vec!["negative_signal"]);
}

#[tokio::test]
async fn request_id_generated_when_missing() {
    let dir = artifacts_dir();
    let predictor = Predictor::new(loaded_registry(&dir));

    let mut req = request(vec![InputItem::new("a", "hello")]);
    req.request_id = None;
    let response = predictor.predict(req, EMAIL).await.unwrap();
    assert!(uuid::Uuid::parse_str(&response.request_id).is_ok());
}

#[tokio::test]
async fn predictions_are_deterministic() {
    let dir = artifacts_dir();
    let predictor = Predictor::new(loaded_registry(&dir));

    let mut seen = Vec::new();
    for _ in 0..5 {
        let response = predictor
            .predict(request(vec![amazon_order("a", "routine order")]), EMAIL)
            .await
            .unwrap();
        seen.push(serde_json::to_string(&response.predictions).unwrap());
    }
    seen.dedup();
    assert_eq!(seen.len(), 1);
}

#[tokio::test]
async fn success_is_audited_with_response_checksum() {
    let dir = artifacts_dir();
    let registry = loaded_registry(&dir);
    let sink = Arc::new(MemorySink::default());
    let predictor = Predictor::new(Arc::clone(&registry)).audit_sink(sink.clone());

    let response = predictor
        .predict(request(vec![amazon_order("a", "routine order")]), EMAIL)
        .await
        .unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.status, AuditStatus::Success);
    assert_eq!(record.request_id, "req-1");
    assert_eq!(record.route, "/predict");
    assert_eq!(record.user_hash, hash_email("testuser@example.com"));
    assert_eq!(record.model_version, "1.0.0");
    assert_eq!(Some(record.artifact_checksum_sha256.clone()), registry.active_checksum());
    assert_eq!(record.num_inputs, 1);
    assert!(record.guardrails_triggered.is_empty());
    assert_eq!(record.latency_ms, response.latency_ms);
    assert_eq!(
        record.response_checksum_sha256,
        digest_bytes(&serde_json::to_vec(&response).unwrap())
    );
}

#[tokio::test]
async fn audit_failure_does_not_fail_request() {
    let dir = artifacts_dir();
    let predictor = Predictor::new(loaded_registry(&dir)).audit_sink(Arc::new(FailingSink));

    let response = predictor
        .predict(request(vec![InputItem::new("a", "hello")]), EMAIL)
        .await;
    assert!(response.is_ok());
}

// ============================================================================
// Guardrails
// ============================================================================

#[tokio::test]
async fn policy_block_is_audited_and_rejected() {
    let dir = artifacts_dir();
    let registry = loaded_registry(&dir);
    let sink = Arc::new(MemorySink::default());
    let predictor = Predictor::new(Arc::clone(&registry)).audit_sink(sink.clone());

    let err = predictor
        .predict(
            request(vec![
                InputItem::new("ok", "routine order"),
                InputItem::new("bad", "How to Steal Credentials from the system"),
            ]),
            EMAIL,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TriadError::PolicyBlocked { ref request_id } if request_id == "req-1"));

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AuditStatus::Blocked);
    assert_eq!(records[0].guardrails_triggered, vec!["policy_block"]);
    assert_eq!(records[0].num_inputs, 2);
    assert_eq!(records[0].model_version, "1.0.0");
    assert_eq!(records[0].response_checksum_sha256, "");
}

#[tokio::test]
async fn policy_block_before_any_model_records_unknown_version() {
    let registry = Arc::new(ModelRegistry::new("/nonexistent"));
    let sink = Arc::new(MemorySink::default());
    let predictor = Predictor::new(registry).audit_sink(sink.clone());

    let err = predictor
        .predict(request(vec![InputItem::new("a", "phish them")]), EMAIL)
        .await
        .unwrap_err();
    assert!(matches!(err, TriadError::PolicyBlocked { .. }));
    let records = sink.records();
    assert_eq!(records[0].model_version, "unknown");
    assert_eq!(records[0].artifact_checksum_sha256, "");
}

#[tokio::test]
async fn custom_policy_phrases() {
    let dir = artifacts_dir();
    let predictor = Predictor::new(loaded_registry(&dir)).policy(PolicyGuard::new(["gift cards"]));

    assert!(
        predictor
            .predict(request(vec![InputItem::new("a", "phish")]), EMAIL)
            .await
            .is_ok()
    );
    assert!(matches!(
        predictor
            .predict(request(vec![InputItem::new("a", "buy GIFT CARDS now")]), EMAIL)
            .await,
        Err(TriadError::PolicyBlocked { .. })
    ));
}

// ============================================================================
// Failure paths
// ============================================================================

#[tokio::test]
async fn not_loaded_is_reported() {
    let registry = Arc::new(ModelRegistry::new("/nonexistent"));
    let sink = Arc::new(MemorySink::default());
    let predictor = Predictor::new(registry).audit_sink(sink.clone());

    let err = predictor
        .predict(request(vec![InputItem::new("a", "hello")]), EMAIL)
        .await
        .unwrap_err();
    assert!(matches!(err, TriadError::NotLoaded));
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn invalid_requests_rejected_before_audit() {
    let dir = artifacts_dir();
    let sink = Arc::new(MemorySink::default());
    let predictor = Predictor::new(loaded_registry(&dir))
        .audit_sink(sink.clone())
        .max_inputs(2);

    for req in [
        request(vec![]),
        request(vec![InputItem::new("a", "  ")]),
        request(vec![
            InputItem::new("a", "x"),
            InputItem::new("b", "y"),
            InputItem::new("c", "z"),
        ]),
    ] {
        assert!(matches!(
            predictor.predict(req, EMAIL).await,
            Err(TriadError::InvalidInput(_))
        ));
    }
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn scoring_error_is_audited() {
    let dir = artifacts_dir();
    let sink = Arc::new(MemorySink::default());
    let predictor = Predictor::new(loaded_registry(&dir)).audit_sink(sink.clone());

    let bad = InputItem::new("a", "hello").with_features(Features {
        price: f64::NAN,
        ..Features::default()
    });
    let err = predictor.predict(request(vec![bad]), EMAIL).await.unwrap_err();
    assert!(matches!(err, TriadError::RuleEvaluation(_)));

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AuditStatus::Error);
    assert_eq!(records[0].model_version, "1.0.0");
}

// ============================================================================
// Cache
// ============================================================================

#[tokio::test]
async fn cached_predictions_match_uncached() {
    let dir = artifacts_dir();
    let registry = loaded_registry(&dir);
    let plain = Predictor::new(Arc::clone(&registry));
    let cached = Predictor::new(Arc::clone(&registry)).cache(&CacheConfig::default());

    let req = request(vec![
        amazon_order("a", "routine order"),
        amazon_order("b", "routine order"),
    ]);
    let expected = plain.predict(req.clone(), EMAIL).await.unwrap();
    let first = cached.predict(req.clone(), EMAIL).await.unwrap();
    let second = cached.predict(req, EMAIL).await.unwrap();

    assert_eq!(first.predictions, expected.predictions);
    assert_eq!(second.predictions, expected.predictions);
}

#[tokio::test]
async fn cache_does_not_leak_across_reloads() {
    let dir = artifacts_dir();
    let registry = loaded_registry(&dir);
    let predictor = Predictor::new(Arc::clone(&registry)).cache(&CacheConfig::default());

    let before = predictor
        .predict(request(vec![InputItem::new("a", "hello")]), EMAIL)
        .await
        .unwrap();
    assert_eq!(before.predictions[0].score, 0.1);

    write(
        dir.path(),
        "model_v1.json",
        &json!({
            "rule_config": {
                "base_score": 0.2,
                "risk_thresholds": {"low_risk_max": 0.3, "medium_risk_max": 0.6}
            }
        })
        .to_string(),
    );
    registry.reload().unwrap();

    let after = predictor
        .predict(request(vec![InputItem::new("a", "hello")]), EMAIL)
        .await
        .unwrap();
    assert_eq!(after.predictions[0].score, 0.2);
}
