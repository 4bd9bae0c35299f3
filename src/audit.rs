//! Append-only audit trail for prediction requests.
//!
//! Each request that reaches the orchestrator produces exactly one
//! [`AuditRecord`], serialised as one compact JSON line. Records carry the
//! caller's hashed identity and content digests, never raw input text.
//!
//! Writing is best effort: [`record`] swallows sink failures after logging
//! them and bumping [`AUDIT_WRITE_ERRORS_TOTAL`](crate::telemetry::AUDIT_WRITE_ERRORS_TOTAL),
//! so an unwritable audit file degrades the service instead of failing
//! requests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::error;

use crate::{Result, TriadError};
use crate::telemetry;

/// Outcome recorded for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Blocked,
    Error,
}

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    /// SHA-256 of the normalised caller e-mail.
    pub user_hash: String,
    pub route: String,
    pub model_version: String,
    pub artifact_checksum_sha256: String,
    pub num_inputs: usize,
    pub guardrails_triggered: Vec<String>,
    pub status: AuditStatus,
    pub latency_ms: u64,
    /// SHA-256 of the serialised response body; empty when no response was produced.
    pub response_checksum_sha256: String,
}

impl AuditRecord {
    /// Start a record stamped with the current time. Model fields and the
    /// response checksum start empty.
    pub fn new(
        request_id: impl Into<String>,
        user_hash: impl Into<String>,
        route: impl Into<String>,
        status: AuditStatus,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: request_id.into(),
            user_hash: user_hash.into(),
            route: route.into(),
            model_version: String::new(),
            artifact_checksum_sha256: String::new(),
            num_inputs: 0,
            guardrails_triggered: Vec::new(),
            status,
            latency_ms: 0,
            response_checksum_sha256: String::new(),
        }
    }

    pub fn model(mut self, version: impl Into<String>, checksum: impl Into<String>) -> Self {
        self.model_version = version.into();
        self.artifact_checksum_sha256 = checksum.into();
        self
    }

    pub fn num_inputs(mut self, n: usize) -> Self {
        self.num_inputs = n;
        self
    }

    pub fn guardrails(mut self, triggered: Vec<String>) -> Self {
        self.guardrails_triggered = triggered;
        self
    }

    pub fn latency_ms(mut self, ms: u64) -> Self {
        self.latency_ms = ms;
        self
    }

    pub fn response_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.response_checksum_sha256 = checksum.into();
        self
    }

    /// Compact single-line JSON form, without the trailing newline.
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist one record.
    async fn write(&self, record: &AuditRecord) -> Result<()>;
}

/// Appends JSON lines to a file.
///
/// All writes go through one async mutex, so concurrent requests never
/// interleave partial lines. Each line is written from its own task: a
/// caller dropped mid-write (request timeout, client disconnect) cannot
/// leave half a record behind.
#[derive(Debug)]
pub struct FileAuditSink {
    path: PathBuf,
    file: Arc<Mutex<tokio::fs::File>>,
}

impl FileAuditSink {
    /// Open `path` for appending, creating it and its parent directories.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn write(&self, record: &AuditRecord) -> Result<()> {
        let mut line = record.to_line()?;
        line.push('\n');
        let file = Arc::clone(&self.file);
        let task = tokio::spawn(async move {
            let mut file = file.lock().await;
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        });
        task.await.map_err(|e| TriadError::Io(std::io::Error::other(e)))??;
        Ok(())
    }
}

/// Discards every record. Used when auditing is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn write(&self, _record: &AuditRecord) -> Result<()> {
        Ok(())
    }
}

/// Write a record, logging and counting failures instead of returning them.
pub async fn record(sink: &dyn AuditSink, record: &AuditRecord) {
    if let Err(e) = sink.write(record).await {
        metrics::counter!(telemetry::AUDIT_WRITE_ERRORS_TOTAL).increment(1);
        error!(
            request_id = %record.request_id,
            error = %e,
            "failed to write audit record"
        );
    }
}
