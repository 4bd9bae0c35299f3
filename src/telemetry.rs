//! Telemetry metric name constants.
//!
//! Centralised metric names for triad operations. The daemon (or any
//! embedding application) installs its own `metrics` recorder; without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `triad_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `route`: HTTP route path (e.g. "/predict")
//! - `operation`: "load" or "reload"
//! - `status`: "ok" or "error" (HTTP metrics use the status code)
//! - `reason`: error kind, see [`TriadError::kind`](crate::TriadError::kind)

/// Total HTTP requests served.
///
/// Labels: `route`, `method`, `status`.
pub const HTTP_REQUESTS_TOTAL: &str = "triad_http_requests_total";

/// HTTP request duration in seconds.
///
/// Labels: `route`.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "triad_http_request_duration_seconds";

/// Total prediction requests received (including blocked and failed ones).
pub const PREDICT_REQUESTS_TOTAL: &str = "triad_predict_requests_total";

/// Total prediction requests that did not produce predictions.
///
/// Labels: `reason`.
pub const PREDICT_ERRORS_TOTAL: &str = "triad_predict_errors_total";

/// Total audit records that could not be written.
pub const AUDIT_WRITE_ERRORS_TOTAL: &str = "triad_audit_write_errors_total";

/// Total model load attempts.
///
/// Labels: `operation` ("load" | "reload"), `status` ("ok" | "error").
pub const MODEL_LOADS_TOTAL: &str = "triad_model_loads_total";

/// Total prediction cache hits.
pub const CACHE_HITS_TOTAL: &str = "triad_cache_hits_total";

/// Total prediction cache misses.
pub const CACHE_MISSES_TOTAL: &str = "triad_cache_misses_total";
