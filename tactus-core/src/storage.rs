//! A durable backend ties an invocation's record, its event log, and its
//! checkpoint journal together under one store so a runtime can recover an
//! invocation after a restart: who it is, what happened, and what's already
//! been done.
//!
//! Most backends implement `StorageBackend` alongside `EventLog` and
//! `CheckpointJournal` directly (see `tactus-state-memory`,
//! `tactus-state-fs`) rather than composing separate stores, since all
//! three concerns typically share one underlying medium.

use async_trait::async_trait;

use crate::error::StateError;
use crate::event::{Event, EventKind};
use crate::id::InvocationId;
use crate::invocation::Invocation;

/// Durable storage for invocation records, their event logs, and their
/// checkpoint journals.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Persist (insert or overwrite) an invocation record.
    async fn save_invocation(&self, invocation: &Invocation) -> Result<(), StateError>;

    /// Load an invocation record by id. `Ok(None)` if it doesn't exist.
    async fn load_invocation(
        &self,
        id: &InvocationId,
    ) -> Result<Option<Invocation>, StateError>;

    /// List every invocation currently tracked by this backend.
    async fn list_invocations(&self) -> Result<Vec<Invocation>, StateError>;

    /// Remove an invocation record along with its events and checkpoints.
    async fn delete_invocation(&self, id: &InvocationId) -> Result<(), StateError>;

    /// Append an event to an invocation's log. The implementation assigns
    /// the event's `seq`.
    async fn append_event(
        &self,
        invocation: &InvocationId,
        kind: EventKind,
        timestamp_ms: u64,
    ) -> Result<Event, StateError>;

    /// Read events for an invocation with `seq > since_seq`, in order.
    async fn read_events(
        &self,
        invocation: &InvocationId,
        since_seq: u64,
    ) -> Result<Vec<Event>, StateError>;

    /// Record a checkpointed step's result.
    async fn write_checkpoint(
        &self,
        invocation: &InvocationId,
        step_id: &str,
        value: serde_json::Value,
    ) -> Result<(), StateError>;

    /// Look up a previously recorded checkpoint value. `Ok(None)` is a miss.
    async fn read_checkpoint(
        &self,
        invocation: &InvocationId,
        step_id: &str,
    ) -> Result<Option<serde_json::Value>, StateError>;
}
