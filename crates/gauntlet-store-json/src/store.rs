// crates/gauntlet-store-json/src/store.rs
// ============================================================================
// Module: JSON Workflow Store
// Description: Versioned per-workflow JSON records with integrity hashes.
// Purpose: Persist workflow snapshots with deterministic serialization.
// Dependencies: gauntlet-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Each workflow persists as one JSON envelope: schema version, snapshot
//! hash, and the state record. Saves are atomic (write-to-temp, rename);
//! loads verify the schema version and the canonical-JSON hash and fail
//! closed on any mismatch. Listing enumerates the state directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use gauntlet_core::WorkflowId;
use gauntlet_core::WorkflowState;
use gauntlet_core::hash_canonical_json;
use gauntlet_core::interfaces::StoreError;
use gauntlet_core::interfaces::WorkflowStore;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Schema version of the persisted state envelope.
pub const STATE_SCHEMA_VERSION: u32 = 1;

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Persisted state envelope.
///
/// # Invariants
/// - `state_hash` is the canonical-JSON SHA-256 of `state`.
#[derive(Debug, Serialize, Deserialize)]
struct StateEnvelope {
    /// Envelope schema version.
    schema_version: u32,
    /// Canonical snapshot hash, lowercase hex.
    state_hash: String,
    /// Workflow state snapshot.
    state: WorkflowState,
}

// ============================================================================
// SECTION: JSON Workflow Store
// ============================================================================

/// Durable workflow store keeping one JSON record per workflow.
#[derive(Debug, Clone)]
pub struct JsonWorkflowStore {
    /// Directory holding the state records.
    state_dir: PathBuf,
}

impl JsonWorkflowStore {
    /// Opens (and creates) the store under a runs directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the state directory cannot be created.
    pub fn open(runs_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let state_dir = runs_dir.into().join("state");
        fs::create_dir_all(&state_dir)
            .map_err(|err| StoreError::Io(format!("create {}: {err}", state_dir.display())))?;
        Ok(Self {
            state_dir,
        })
    }

    /// Returns the record path for a workflow identifier.
    fn record_path(&self, workflow_id: &WorkflowId) -> Result<PathBuf, StoreError> {
        let name = workflow_id.as_str();
        if name.is_empty()
            || !name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        {
            return Err(StoreError::Invalid(format!(
                "workflow id `{name}` is not filesystem-safe"
            )));
        }
        Ok(self.state_dir.join(format!("{name}.json")))
    }
}

impl WorkflowStore for JsonWorkflowStore {
    fn load(&self, workflow_id: &WorkflowId) -> Result<Option<WorkflowState>, StoreError> {
        let path = self.record_path(workflow_id)?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StoreError::Io(format!("read {}: {err}", path.display())));
            }
        };

        let envelope: StateEnvelope = serde_json::from_str(&text)
            .map_err(|err| StoreError::Corrupt(format!("parse {}: {err}", path.display())))?;
        if envelope.schema_version != STATE_SCHEMA_VERSION {
            return Err(StoreError::VersionMismatch(format!(
                "record {} has schema version {}, expected {STATE_SCHEMA_VERSION}",
                path.display(),
                envelope.schema_version
            )));
        }

        let digest = hash_canonical_json(&envelope.state)
            .map_err(|err| StoreError::Invalid(err.to_string()))?;
        if digest.as_str() != envelope.state_hash {
            return Err(StoreError::Corrupt(format!(
                "record {} failed snapshot hash verification",
                path.display()
            )));
        }
        Ok(Some(envelope.state))
    }

    fn save(&self, state: &WorkflowState) -> Result<(), StoreError> {
        let path = self.record_path(&state.workflow_id)?;
        let digest = hash_canonical_json(state)
            .map_err(|err| StoreError::Invalid(err.to_string()))?;
        let envelope = StateEnvelope {
            schema_version: STATE_SCHEMA_VERSION,
            state_hash: digest.as_str().to_string(),
            state: state.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&envelope)
            .map_err(|err| StoreError::Invalid(format!("serialize state: {err}")))?;

        write_atomic(&path, &bytes)
    }

    fn list(&self) -> Result<Vec<WorkflowId>, StoreError> {
        let entries = fs::read_dir(&self.state_dir)
            .map_err(|err| StoreError::Io(format!("list {}: {err}", self.state_dir.display())))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|err| StoreError::Io(format!("list {}: {err}", self.state_dir.display())))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem()
            {
                ids.push(WorkflowId::new(stem.to_string_lossy().into_owned()));
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Writes bytes through a temp file and rename so a crash mid-write leaves
/// the previous record authoritative.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)
        .map_err(|err| StoreError::Io(format!("write {}: {err}", tmp.display())))?;
    fs::rename(&tmp, path)
        .map_err(|err| StoreError::Io(format!("rename {}: {err}", path.display())))
}
