// crates/gauntlet-core/src/runtime/store.rs
// ============================================================================
// Module: Gauntlet In-Memory Store
// Description: Simple in-memory workflow store for tests and examples.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides a simple in-memory implementation of
//! [`WorkflowStore`] for tests and local demos. It is not intended for
//! production use; the durable file-backed store lives in
//! `gauntlet-store-json`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::WorkflowId;
use crate::core::WorkflowState;
use crate::interfaces::StoreError;
use crate::interfaces::WorkflowStore;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory workflow store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryWorkflowStore {
    /// Workflow map protected by a mutex.
    workflows: Arc<Mutex<BTreeMap<String, WorkflowState>>>,
}

impl InMemoryWorkflowStore {
    /// Creates a new in-memory workflow store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            workflows: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl WorkflowStore for InMemoryWorkflowStore {
    fn load(&self, workflow_id: &WorkflowId) -> Result<Option<WorkflowState>, StoreError> {
        let guard = self
            .workflows
            .lock()
            .map_err(|_| StoreError::Store("workflow store mutex poisoned".to_string()))?;
        Ok(guard.get(workflow_id.as_str()).cloned())
    }

    fn save(&self, state: &WorkflowState) -> Result<(), StoreError> {
        self.workflows
            .lock()
            .map_err(|_| StoreError::Store("workflow store mutex poisoned".to_string()))?
            .insert(state.workflow_id.as_str().to_string(), state.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<WorkflowId>, StoreError> {
        let guard = self
            .workflows
            .lock()
            .map_err(|_| StoreError::Store("workflow store mutex poisoned".to_string()))?;
        Ok(guard.keys().map(WorkflowId::new).collect())
    }
}
