//! Request guardrails: policy blocking, PII redaction, identity hashing.
//!
//! None of these touch the model; they run around scoring so that blocked
//! content never reaches the registry and caller identity never reaches an
//! audit record or log line in clear text.

pub mod identity;
pub mod policy;
pub mod redaction;

pub use identity::hash_email;
pub use policy::{DEFAULT_DISALLOWED_PHRASES, POLICY_BLOCK, PolicyGuard};
pub use redaction::redact_pii;
