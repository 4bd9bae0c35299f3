//! Model artifact files: checksums, manifest resolution, and artifact bodies.
//!
//! An artifacts directory contains:
//! - a manifest naming the active version (`model_manifest.json`)
//! - a checksum table (`CHECKSUMS.json`)
//! - one artifact body per version (`model_v1.json`, ...)

pub mod checksum;
pub mod document;
pub mod manifest;

pub use checksum::{ChecksumTable, compute_digest, digest_bytes, verify};
pub use document::ModelArtifact;
pub use manifest::{ManifestLayout, ModelManifest, VersionDescriptor};
