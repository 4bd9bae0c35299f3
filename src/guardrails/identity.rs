//! Caller identity hashing for audit records.

use crate::artifact::digest_bytes;

/// Normalise an e-mail address (trim, lowercase) and return its SHA-256 hex digest.
pub fn hash_email(email: &str) -> String {
    digest_bytes(email.trim().to_lowercase().as_bytes())
}
