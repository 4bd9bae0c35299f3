//! HTTP daemon support.
//!
//! This module provides:
//! - Configuration types (`config`)
//! - Log subscriber setup with redaction (`logging`)
//! - The axum service: routes, handlers, request metrics (`service`)
//!
//! [`build_state`] wires a [`Config`] into a registry, audit sink and
//! predictor; [`serve`] runs the router on a bound listener until the
//! shutdown future resolves.

pub mod config;
pub mod logging;
pub mod service;

pub use config::Config;
pub use service::{AppState, router};

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::Result;
use crate::audit::{AuditSink, FileAuditSink, NoopAuditSink};
use crate::predict::Predictor;
use crate::registry::ModelRegistry;

/// Build shared state from configuration and attempt the initial model load.
///
/// A failed load is logged and the daemon still comes up; `/readyz`
/// reports not ready until a reload succeeds.
pub async fn build_state(config: &Config) -> Result<Arc<AppState>> {
    let registry = Arc::new(ModelRegistry::with_source(config.model.source()));
    if let Err(e) = registry.load() {
        warn!(
            artifacts_dir = %config.model.artifacts_dir.display(),
            error = %e,
            "initial model load failed; serving without a model"
        );
    }

    let audit: Arc<dyn AuditSink> = if config.audit.enabled {
        let sink = FileAuditSink::open(&config.audit.path).await?;
        info!(path = %sink.path().display(), "audit log opened");
        Arc::new(sink)
    } else {
        Arc::new(NoopAuditSink)
    };

    let mut predictor = Predictor::new(Arc::clone(&registry))
        .audit_sink(audit)
        .policy(config.guardrails.policy())
        .max_inputs(config.server.limits.max_inputs);
    if let Some(cache) = config.cache.to_cache_config() {
        predictor = predictor.cache(&cache);
    }

    Ok(Arc::new(AppState::new(
        predictor,
        config.server.limits.request_timeout(),
    )))
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
