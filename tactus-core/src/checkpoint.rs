//! C. Checkpoint Journal — deterministic replay for checkpointed steps.
//!
//! A step_id is `<callsite>:<ordinal>`, computed deterministically from where
//! in the procedure a checkpointed operation occurs plus how many times that
//! callsite has fired within the invocation. On first execution the journal
//! misses and the effect runs; on replay the journal hits and the recorded
//! value is returned without re-running the effect.

use crate::error::JournalError;
use crate::id::InvocationId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A recorded checkpoint value plus enough metadata to detect replay drift.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// The deterministic step_id this was recorded under.
    pub step_id: String,
    /// The recorded result, serialized.
    pub value: serde_json::Value,
}

/// Read-through checkpoint journal: a step's first execution records its
/// result; subsequent replays of the same step_id return the recorded value
/// instead of re-executing the side effect.
#[async_trait]
pub trait CheckpointJournal: Send + Sync {
    /// Look up a previously recorded value for this step_id. `Ok(None)` is
    /// a miss — the caller should perform the effect and call `record`.
    async fn get(
        &self,
        invocation: &InvocationId,
        step_id: &str,
    ) -> Result<Option<serde_json::Value>, JournalError>;

    /// Record the result of executing a step. Recording the same step_id
    /// twice with a different value is a conflict — a procedure's control
    /// flow is expected to be deterministic across replays.
    async fn record(
        &self,
        invocation: &InvocationId,
        step_id: &str,
        value: serde_json::Value,
    ) -> Result<(), JournalError>;
}
