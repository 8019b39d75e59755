// crates/gauntlet-core/src/core/hashing.rs
// ============================================================================
// Module: Gauntlet Canonical Hashing
// Description: RFC 8785 JSON canonicalization, content hashing, report handles.
// Purpose: Provide deterministic hashes for state snapshots and artifact names.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Gauntlet hashes canonical JSON using RFC 8785 (JCS) so state-snapshot
//! integrity checks and report handles are stable across hosts. Report
//! handles are the deterministic names under which the runner writes its
//! output artifacts; stages retrieve artifacts by exact handle and never
//! pick the newest file from the shared output directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::core::identifiers::WorkflowId;

// ============================================================================
// SECTION: Hash Digest
// ============================================================================

/// Deterministic SHA-256 content hash, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashDigest(String);

impl HashDigest {
    /// Creates a digest from raw hash bytes.
    #[must_use]
    pub fn new(bytes: &[u8]) -> Self {
        Self(hex_encode(bytes))
    }

    /// Returns the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing canonical hashes.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Returns canonical JSON bytes for a serializable value using RFC 8785.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes canonical JSON of a serializable value.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(&bytes))
}

/// Hashes raw bytes with SHA-256.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> HashDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    HashDigest::new(&digest)
}

// ============================================================================
// SECTION: Report Handles
// ============================================================================

/// Builds a deterministic, collision-free report handle.
///
/// The handle takes the form `{source-stem}_{stage-tag}_{hash8}` where
/// `hash8` is the first eight hex characters of the SHA-256 of the canonical
/// JSON of `(workflow-id, source-stem, stage-tag, disambiguator)`. The
/// workflow identifier component keeps handles from concurrent workflows on
/// the same runner disjoint.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when the component tuple cannot
/// be serialized.
pub fn report_handle(
    workflow_id: &WorkflowId,
    source_stem: &str,
    stage_tag: &str,
    disambiguator: Option<&str>,
) -> Result<String, HashError> {
    let digest = hash_canonical_json(&(
        workflow_id.as_str(),
        source_stem,
        stage_tag,
        disambiguator.unwrap_or_default(),
    ))?;
    let short = &digest.as_str()[..8];
    Ok(format!("{source_stem}_{stage_tag}_{short}"))
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
