//! The unit of execution: one call into a procedure definition.

use crate::id::{AgentId, InvocationId};
use serde::{Deserialize, Serialize};

/// A single run of a procedure. Everything the runtime tracks about an
/// invocation while it's in flight or after it finishes.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invocation {
    /// Identity of this invocation.
    pub id: InvocationId,
    /// Name of the procedure definition being run.
    pub procedure: String,
    /// The agent that owns this invocation, if any.
    pub agent: Option<AgentId>,
    /// The invocation that spawned this one, if it's a child.
    pub parent: Option<InvocationId>,
    /// Current status.
    pub status: InvocationStatus,
    /// Resolved parameters this invocation was started with, persisted so a
    /// restarted process can rebuild the same `Params` capability on
    /// resume rather than only having it in the original in-memory handle.
    #[serde(default)]
    pub params: serde_json::Value,
    /// Unix milliseconds this invocation was created.
    pub created_at_ms: u64,
    /// Unix milliseconds this invocation last transitioned status.
    pub updated_at_ms: u64,
}

impl Invocation {
    /// Create a new invocation in the `Running` state.
    pub fn new(id: InvocationId, procedure: impl Into<String>, created_at_ms: u64) -> Self {
        Self {
            id,
            procedure: procedure.into(),
            agent: None,
            parent: None,
            status: InvocationStatus::Running,
            params: serde_json::Value::Null,
            created_at_ms,
            updated_at_ms: created_at_ms,
        }
    }

    /// Attach resolved parameters at construction time.
    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }

    /// Whether this invocation has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Where an invocation stands. `Suspended` covers every reason execution
/// is paused waiting on something external — a HITL request, a spawned
/// child, a signal — the reason distinguishes which.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InvocationStatus {
    /// Actively executing a turn.
    Running,
    /// Paused, waiting on something external.
    Suspended {
        /// Why execution is paused.
        reason: SuspendReason,
    },
    /// Finished normally.
    Completed,
    /// Finished with an unrecoverable error.
    Failed {
        /// What went wrong.
        reason: String,
    },
    /// Cancelled before completion.
    Cancelled,
}

impl InvocationStatus {
    /// Whether this status won't transition further on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InvocationStatus::Completed | InvocationStatus::Failed { .. } | InvocationStatus::Cancelled
        )
    }
}

/// Why an invocation is suspended.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuspendReason {
    /// Waiting on a HITL gateway response.
    AwaitingHuman {
        /// The HITL request id being waited on.
        request_id: String,
    },
    /// Waiting on one or more spawned child invocations.
    AwaitingChildren {
        /// The child invocation ids being waited on.
        children: Vec<InvocationId>,
    },
    /// Waiting on an external signal.
    AwaitingSignal {
        /// The signal type expected.
        signal_type: String,
    },
}
