//! SHA-256 content digests and the checksum table.
//!
//! Digests are lowercase hex SHA-256 so that audit records written by any
//! deployment of the service can be compared byte for byte.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Result, TriadError};

/// Read buffer size for streaming file digests.
const CHUNK_SIZE: usize = 8192;

/// Compute the SHA-256 hex digest of a file's contents.
pub fn compute_digest(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex_encode(&hasher.finalize()))
}

/// Compute the SHA-256 hex digest of in-memory bytes.
pub fn digest_bytes(bytes: &[u8]) -> String {
    hex_encode(&Sha256::digest(bytes))
}

/// Verify a computed digest against an optional expected value.
///
/// `None` (or an empty string) skips verification. Comparison ignores the
/// case of `expected`.
pub fn verify(file: &str, expected: Option<&str>, actual: &str) -> Result<()> {
    match expected {
        Some(expected) if !expected.is_empty() && !expected.eq_ignore_ascii_case(actual) => {
            Err(TriadError::ChecksumMismatch {
                file: file.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Expected digests keyed by artifact file name (`CHECKSUMS.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecksumTable {
    entries: BTreeMap<String, String>,
}

impl ChecksumTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a checksum table from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TriadError::ManifestRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| TriadError::ManifestRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Expected digest for a file, `None` when verification should be skipped.
    pub fn expected(&self, file: &str) -> Option<&str> {
        self.entries
            .get(file)
            .map(String::as_str)
            .filter(|digest| !digest.is_empty())
    }

    /// Set the expected digest for a file.
    pub fn insert(&mut self, file: impl Into<String>, digest: impl Into<String>) {
        self.entries.insert(file.into(), digest.into());
    }

    /// Iterate entries in file name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the table to disk (atomic write via tmp + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp_path, format!("{json}\n")).map_err(|e| {
            TriadError::Configuration(format!(
                "failed to write checksum file {}: {e}",
                tmp_path.display()
            ))
        })?;
        std::fs::rename(&tmp_path, path).map_err(|e| {
            TriadError::Configuration(format!(
                "failed to rename checksum file {} → {}: {e}",
                tmp_path.display(),
                path.display()
            ))
        })
    }
}

/// Encode bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
