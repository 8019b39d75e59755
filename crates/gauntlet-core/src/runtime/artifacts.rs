// crates/gauntlet-core/src/runtime/artifacts.rs
// ============================================================================
// Module: Gauntlet Artifact Spill Sink
// Description: Filesystem PathSink rooted at the workflow directory.
// Purpose: Give stages a single write path for large auxiliary data.
// Dependencies: crate::interfaces, serde_json, std::fs
// ============================================================================

//! ## Overview
//! Stages spill large data (pass tables, trade lists, INI text) through a
//! [`PathSink`] supplied by the engine. The filesystem implementation writes
//! under the workflow directory, creating parent directories on demand, and
//! returns the absolute path the state records.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use crate::interfaces::ArtifactError;
use crate::interfaces::PathSink;

// ============================================================================
// SECTION: Filesystem Sink
// ============================================================================

/// Spill sink writing into a workflow directory.
#[derive(Debug, Clone)]
pub struct FsPathSink {
    /// Root directory for spilled artifacts.
    root: PathBuf,
}

impl FsPathSink {
    /// Creates a sink rooted at the given directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Resolves a relative artifact name and prepares its parent directory.
    fn prepare(&self, name: &str) -> Result<PathBuf, ArtifactError> {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| ArtifactError::Sink(format!("create {}: {err}", parent.display())))?;
        }
        Ok(path)
    }
}

impl PathSink for FsPathSink {
    fn write_json(
        &self,
        name: &str,
        value: &serde_json::Value,
    ) -> Result<PathBuf, ArtifactError> {
        let path = self.prepare(name)?;
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|err| ArtifactError::Sink(format!("serialize {name}: {err}")))?;
        write_atomic(&path, &bytes)?;
        Ok(path)
    }

    fn write_text(&self, name: &str, content: &str) -> Result<PathBuf, ArtifactError> {
        let path = self.prepare(name)?;
        write_atomic(&path, content.as_bytes())?;
        Ok(path)
    }
}

/// Writes bytes through a temp file and rename so readers never see partials.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)
        .map_err(|err| ArtifactError::Sink(format!("write {}: {err}", tmp.display())))?;
    fs::rename(&tmp, path)
        .map_err(|err| ArtifactError::Sink(format!("rename {}: {err}", path.display())))
}
