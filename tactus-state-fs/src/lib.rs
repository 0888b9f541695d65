#![deny(missing_docs)]
//! Filesystem-backed implementation of tactus_core's StateStore, EventLog,
//! CheckpointJournal, and StorageBackend traits.
//!
//! Each scope maps to a subdirectory under the root. Keys are
//! URL-encoded and stored as `.json` files within the scope directory.
//! Invocation records, event logs, and checkpoint journals each get their
//! own subdirectory tree alongside the scope data. Provides true
//! persistence across process restarts.

use async_trait::async_trait;
use tactus_core::effect::Scope;
use tactus_core::error::StateError;
use tactus_core::event::{Event, EventKind};
use tactus_core::id::InvocationId;
use tactus_core::invocation::Invocation;
use tactus_core::state::{SearchResult, StateStore};
use tactus_core::storage::StorageBackend;
use std::path::{Path, PathBuf};

/// Filesystem-backed state store.
///
/// Directory layout:
/// ```text
/// root/
///   <scope-hash>/
///     <url-encoded-key>.json
/// ```
///
/// Suitable for development, single-machine deployments, and cases
/// where data must survive process restarts without a database.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a new filesystem store rooted at the given directory.
    ///
    /// The directory is created lazily on first write.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

/// Derive a safe directory name from a scope.
fn scope_dir_name(scope: &Scope) -> String {
    // Use a deterministic, filesystem-safe representation.
    // We hash the JSON serialization of the scope.
    let json = serde_json::to_string(scope).unwrap_or_else(|_| "unknown".into());
    // Simple hash to avoid overly long directory names
    let mut hash: u64 = 5381;
    for byte in json.as_bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(*byte as u64);
    }
    format!("scope-{hash:016x}")
}

/// Encode a key into a safe filename.
fn key_to_filename(key: &str) -> String {
    let mut encoded = String::new();
    for ch in key.chars() {
        match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => encoded.push(ch),
            _ => {
                for byte in ch.to_string().as_bytes() {
                    encoded.push_str(&format!("%{byte:02X}"));
                }
            }
        }
    }
    format!("{encoded}.json")
}

/// Decode a filename back to a key.
fn filename_to_key(filename: &str) -> Option<String> {
    let name = filename.strip_suffix(".json")?;
    let mut result = Vec::new();
    let bytes = name.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok()?;
            let byte = u8::from_str_radix(hex, 16).ok()?;
            result.push(byte);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(result).ok()
}

#[async_trait]
impl StateStore for FsStore {
    async fn read(
        &self,
        scope: &Scope,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StateError> {
        let path = self
            .root
            .join(scope_dir_name(scope))
            .join(key_to_filename(key));
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let value: serde_json::Value = serde_json::from_str(&contents)
                    .map_err(|e| StateError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StateError::WriteFailed(e.to_string())),
        }
    }

    async fn write(
        &self,
        scope: &Scope,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StateError> {
        let dir = self.root.join(scope_dir_name(scope));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StateError::WriteFailed(e.to_string()))?;

        let path = dir.join(key_to_filename(key));
        let contents = serde_json::to_string_pretty(&value)
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| StateError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, scope: &Scope, key: &str) -> Result<(), StateError> {
        let path = self
            .root
            .join(scope_dir_name(scope))
            .join(key_to_filename(key));
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StateError::WriteFailed(e.to_string())),
        }
    }

    async fn list(&self, scope: &Scope, prefix: &str) -> Result<Vec<String>, StateError> {
        let dir = self.root.join(scope_dir_name(scope));
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(StateError::WriteFailed(e.to_string())),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StateError::WriteFailed(e.to_string()))?
        {
            if let Some(filename) = entry.file_name().to_str() {
                if let Some(key) = filename_to_key(filename) {
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }
        Ok(keys)
    }

    async fn search(
        &self,
        _scope: &Scope,
        _query: &str,
        _limit: usize,
    ) -> Result<Vec<SearchResult>, StateError> {
        // Filesystem store does not support semantic search.
        Ok(vec![])
    }
}

impl FsStore {
    fn invocation_path(&self, id: &InvocationId) -> PathBuf {
        self.root
            .join("invocations")
            .join(key_to_filename(id.as_str()))
    }

    fn events_dir(&self, id: &InvocationId) -> PathBuf {
        self.root.join("events").join(key_to_filename(id.as_str()))
    }

    fn checkpoints_dir(&self, id: &InvocationId) -> PathBuf {
        self.root
            .join("checkpoints")
            .join(key_to_filename(id.as_str()))
    }
}

#[async_trait]
impl tactus_core::event::EventLog for FsStore {
    async fn append(
        &self,
        invocation: &InvocationId,
        kind: EventKind,
        timestamp_ms: u64,
    ) -> Result<Event, StateError> {
        let dir = self.events_dir(invocation);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StateError::WriteFailed(e.to_string()))?;

        let existing = count_json_entries(&dir).await?;
        let seq = existing as u64;
        let event = Event {
            invocation: invocation.clone(),
            seq,
            timestamp_ms,
            kind,
        };
        let path = dir.join(format!("{seq:020}.json"));
        let contents = serde_json::to_string_pretty(&event)
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| StateError::WriteFailed(e.to_string()))?;
        Ok(event)
    }

    async fn read(
        &self,
        invocation: &InvocationId,
        since_seq: u64,
    ) -> Result<Vec<Event>, StateError> {
        let dir = self.events_dir(invocation);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(StateError::WriteFailed(e.to_string())),
        };

        let mut events = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StateError::WriteFailed(e.to_string()))?
        {
            let contents = tokio::fs::read_to_string(entry.path())
                .await
                .map_err(|e| StateError::WriteFailed(e.to_string()))?;
            let event: Event = serde_json::from_str(&contents)
                .map_err(|e| StateError::Serialization(e.to_string()))?;
            if event.seq > since_seq {
                events.push(event);
            }
        }
        events.sort_by_key(|e| e.seq);
        Ok(events)
    }
}

#[async_trait]
impl tactus_core::checkpoint::CheckpointJournal for FsStore {
    async fn get(
        &self,
        invocation: &InvocationId,
        step_id: &str,
    ) -> Result<Option<serde_json::Value>, tactus_core::error::JournalError> {
        let path = self.checkpoints_dir(invocation).join(key_to_filename(step_id));
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let value = serde_json::from_str(&contents)
                    .map_err(|e| StateError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StateError::WriteFailed(e.to_string()).into()),
        }
    }

    async fn record(
        &self,
        invocation: &InvocationId,
        step_id: &str,
        value: serde_json::Value,
    ) -> Result<(), tactus_core::error::JournalError> {
        use tactus_core::checkpoint::CheckpointJournal;
        if let Some(existing) = self.get(invocation, step_id).await? {
            if existing != value {
                return Err(tactus_core::error::JournalError::Conflict {
                    step_id: step_id.to_string(),
                    reason: "recorded value differs from this replay's value".to_string(),
                });
            }
            return Ok(());
        }

        let dir = self.checkpoints_dir(invocation);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StateError::WriteFailed(e.to_string()))?;
        let path = dir.join(key_to_filename(step_id));
        let contents = serde_json::to_string_pretty(&value)
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| StateError::WriteFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FsStore {
    async fn save_invocation(&self, invocation: &Invocation) -> Result<(), StateError> {
        let path = self.invocation_path(&invocation.id);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| StateError::WriteFailed(e.to_string()))?;
        }
        let contents = serde_json::to_string_pretty(invocation)
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| StateError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn load_invocation(
        &self,
        id: &InvocationId,
    ) -> Result<Option<Invocation>, StateError> {
        match tokio::fs::read_to_string(self.invocation_path(id)).await {
            Ok(contents) => {
                let invocation = serde_json::from_str(&contents)
                    .map_err(|e| StateError::Serialization(e.to_string()))?;
                Ok(Some(invocation))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StateError::WriteFailed(e.to_string())),
        }
    }

    async fn list_invocations(&self) -> Result<Vec<Invocation>, StateError> {
        let dir = self.root.join("invocations");
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(StateError::WriteFailed(e.to_string())),
        };

        let mut invocations = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StateError::WriteFailed(e.to_string()))?
        {
            let contents = tokio::fs::read_to_string(entry.path())
                .await
                .map_err(|e| StateError::WriteFailed(e.to_string()))?;
            let invocation = serde_json::from_str(&contents)
                .map_err(|e| StateError::Serialization(e.to_string()))?;
            invocations.push(invocation);
        }
        Ok(invocations)
    }

    async fn delete_invocation(&self, id: &InvocationId) -> Result<(), StateError> {
        let _ = tokio::fs::remove_file(self.invocation_path(id)).await;
        let _ = tokio::fs::remove_dir_all(self.events_dir(id)).await;
        let _ = tokio::fs::remove_dir_all(self.checkpoints_dir(id)).await;
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
        let dir = self.checkpoints_dir(invocation);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StateError::WriteFailed(e.to_string()))?;
        let path = dir.join(key_to_filename(step_id));
        let contents = serde_json::to_string_pretty(&value)
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| StateError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn read_checkpoint(
        &self,
        invocation: &InvocationId,
        step_id: &str,
    ) -> Result<Option<serde_json::Value>, StateError> {
        let path = self.checkpoints_dir(invocation).join(key_to_filename(step_id));
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let value = serde_json::from_str(&contents)
                    .map_err(|e| StateError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StateError::WriteFailed(e.to_string())),
        }
    }
}

async fn count_json_entries(dir: &Path) -> Result<usize, StateError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| StateError::WriteFailed(e.to_string()))?;
    let mut count = 0;
    while entries
        .next_entry()
        .await
        .map_err(|e| StateError::WriteFailed(e.to_string()))?
        .is_some()
    {
        count += 1;
    }
    Ok(count)
}
