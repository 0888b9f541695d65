//! In-memory implementation of tactus_core's StateStore, EventLog,
//! CheckpointJournal, and StorageBackend traits.
//!
//! Uses `HashMap`s behind `RwLock`s for concurrent access.
//! Scopes are serialized to strings for use as key prefixes,
//! providing full scope isolation. Search always returns empty
//! (no semantic search support in the in-memory backend).
//!
//! Nothing here survives a process restart — this is the backend for
//! tests, local development, and short-lived invocations.

use async_trait::async_trait;
use tactus_core::effect::Scope;
use tactus_core::error::StateError;
use tactus_core::event::{Event, EventKind};
use tactus_core::id::InvocationId;
use tactus_core::invocation::Invocation;
use tactus_core::state::{SearchResult, StateStore};
use tactus_core::storage::StorageBackend;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory state store backed by a `HashMap` behind a `RwLock`.
///
/// Suitable for testing, prototyping, and single-process use cases
/// where persistence across restarts is not required.
pub struct MemoryStore {
    data: RwLock<HashMap<String, serde_json::Value>>,
    invocations: RwLock<HashMap<InvocationId, Invocation>>,
    events: RwLock<HashMap<InvocationId, Vec<Event>>>,
    checkpoints: RwLock<HashMap<InvocationId, HashMap<String, serde_json::Value>>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            invocations: RwLock::new(HashMap::new()),
            events: RwLock::new(HashMap::new()),
            checkpoints: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a composite key from scope + key to ensure isolation.
fn composite_key(scope: &Scope, key: &str) -> String {
    let scope_str = serde_json::to_string(scope).unwrap_or_else(|_| "unknown".to_string());
    format!("{scope_str}\0{key}")
}

/// Extract the user-facing key from a composite key, if it belongs to the given scope.
fn extract_key<'a>(composite: &'a str, scope_prefix: &str) -> Option<&'a str> {
    composite
        .strip_prefix(scope_prefix)
        .and_then(|rest| rest.strip_prefix('\0'))
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn read(
        &self,
        scope: &Scope,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StateError> {
        let ck = composite_key(scope, key);
        let data = self.data.read().await;
        Ok(data.get(&ck).cloned())
    }

    async fn write(
        &self,
        scope: &Scope,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StateError> {
        let ck = composite_key(scope, key);
        let mut data = self.data.write().await;
        data.insert(ck, value);
        Ok(())
    }

    async fn delete(&self, scope: &Scope, key: &str) -> Result<(), StateError> {
        let ck = composite_key(scope, key);
        let mut data = self.data.write().await;
        data.remove(&ck);
        Ok(())
    }

    async fn list(&self, scope: &Scope, prefix: &str) -> Result<Vec<String>, StateError> {
        let scope_prefix =
            serde_json::to_string(scope).unwrap_or_else(|_| "unknown".to_string());
        let data = self.data.read().await;
        let keys: Vec<String> = data
            .keys()
            .filter_map(|ck| {
                extract_key(ck, &scope_prefix).and_then(|k| {
                    if k.starts_with(prefix) {
                        Some(k.to_string())
                    } else {
                        None
                    }
                })
            })
            .collect();
        Ok(keys)
    }

    async fn search(
        &self,
        _scope: &Scope,
        _query: &str,
        _limit: usize,
    ) -> Result<Vec<SearchResult>, StateError> {
        // In-memory store does not support semantic search.
        Ok(vec![])
    }
}

#[async_trait]
impl tactus_core::event::EventLog for MemoryStore {
    async fn append(
        &self,
        invocation: &InvocationId,
        kind: EventKind,
        timestamp_ms: u64,
    ) -> Result<Event, StateError> {
        let mut events = self.events.write().await;
        let log = events.entry(invocation.clone()).or_default();
        let seq = log.len() as u64;
        let event = Event {
            invocation: invocation.clone(),
            seq,
            timestamp_ms,
            kind,
        };
        log.push(event.clone());
        Ok(event)
    }

    async fn read(
        &self,
        invocation: &InvocationId,
        since_seq: u64,
    ) -> Result<Vec<Event>, StateError> {
        let events = self.events.read().await;
        Ok(events
            .get(invocation)
            .map(|log| {
                log.iter()
                    .filter(|e| e.seq > since_seq)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl tactus_core::checkpoint::CheckpointJournal for MemoryStore {
    async fn get(
        &self,
        invocation: &InvocationId,
        step_id: &str,
    ) -> Result<Option<serde_json::Value>, tactus_core::error::JournalError> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints
            .get(invocation)
            .and_then(|steps| steps.get(step_id))
            .cloned())
    }

    async fn record(
        &self,
        invocation: &InvocationId,
        step_id: &str,
        value: serde_json::Value,
    ) -> Result<(), tactus_core::error::JournalError> {
        let mut checkpoints = self.checkpoints.write().await;
        let steps = checkpoints.entry(invocation.clone()).or_default();
        match steps.get(step_id) {
            Some(existing) if *existing != value => {
                Err(tactus_core::error::JournalError::Conflict {
                    step_id: step_id.to_string(),
                    reason: "recorded value differs from this replay's value".to_string(),
                })
            }
            _ => {
                steps.insert(step_id.to_string(), value);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryStore {
    async fn save_invocation(&self, invocation: &Invocation) -> Result<(), StateError> {
        let mut invocations = self.invocations.write().await;
        invocations.insert(invocation.id.clone(), invocation.clone());
        Ok(())
    }

    async fn load_invocation(
        &self,
        id: &InvocationId,
    ) -> Result<Option<Invocation>, StateError> {
        let invocations = self.invocations.read().await;
        Ok(invocations.get(id).cloned())
    }

    async fn list_invocations(&self) -> Result<Vec<Invocation>, StateError> {
        let invocations = self.invocations.read().await;
        Ok(invocations.values().cloned().collect())
    }

    async fn delete_invocation(&self, id: &InvocationId) -> Result<(), StateError> {
        self.invocations.write().await.remove(id);
        self.events.write().await.remove(id);
        self.checkpoints.write().await.remove(id);
        Ok(())
    }

    async fn append_event(
        &self,
        invocation: &InvocationId,
        kind: EventKind,
        timestamp_ms: u64,
    ) -> Result<Event, StateError> {
        use tactus_core::event::EventLog;
        EventLog::append(self, invocation, kind, timestamp_ms).await
    }

    async fn read_events(
        &self,
        invocation: &InvocationId,
        since_seq: u64,
    ) -> Result<Vec<Event>, StateError> {
        use tactus_core::event::EventLog;
        EventLog::read(self, invocation, since_seq).await
    }

    async fn write_checkpoint(
        &self,
        invocation: &InvocationId,
        step_id: &str,
        value: serde_json::Value,
    ) -> Result<(), StateError> {
        let mut checkpoints = self.checkpoints.write().await;
        checkpoints
            .entry(invocation.clone())
            .or_default()
            .insert(step_id.to_string(), value);
        Ok(())
    }

    async fn read_checkpoint(
        &self,
        invocation: &InvocationId,
        step_id: &str,
    ) -> Result<Option<serde_json::Value>, StateError> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints
            .get(invocation)
            .and_then(|steps| steps.get(step_id))
            .cloned())
    }
}
