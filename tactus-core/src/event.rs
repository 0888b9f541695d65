//! A. Event Log — the durable, queryable audit trail of an invocation.
//!
//! Distinct from `tracing` spans (operator-facing diagnostics): the event
//! log is structured domain data a procedure, a UI, or an evaluation run
//! reads back, not a debug stream.

use crate::error::StateError;
use crate::id::InvocationId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One recorded occurrence within an invocation's lifetime. Events are
/// append-only and ordered by `seq` within an invocation.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// The invocation this event belongs to.
    pub invocation: InvocationId,
    /// Monotonically increasing sequence number within the invocation.
    pub seq: u64,
    /// Unix milliseconds this event was recorded.
    pub timestamp_ms: u64,
    /// What happened.
    pub kind: EventKind,
}

/// The kinds of things worth recording against an invocation. Each variant
/// carries enough to reconstruct "what happened" without re-running the
/// invocation — the event log is the audit trail, not a cache.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// A turn began executing.
    TurnStarted {
        /// The agent whose turn this is.
        agent: String,
    },
    /// A turn finished.
    TurnCompleted {
        /// The agent whose turn this was.
        agent: String,
        /// Why the turn ended.
        exit_reason: String,
    },
    /// One `Agent.turn()` call reached `started` or `responded`. Distinct
    /// from `TurnStarted`/`TurnCompleted`, which mark an invocation's own
    /// lifecycle rather than an individual agent's round-trip — counting
    /// `AgentTurn { stage: Responded }` events is what `Iterations.current`
    /// is defined against (§8.5).
    AgentTurn {
        /// The agent whose turn this is.
        agent: String,
        /// Which edge of the turn this event marks.
        stage: AgentTurnStage,
    },
    /// A tool was invoked during a turn.
    ToolCalled {
        /// The tool name.
        tool: String,
        /// Whether the call succeeded.
        success: bool,
    },
    /// A checkpointed step found a recorded value and skipped re-execution.
    CheckpointHit {
        /// The deterministic step_id.
        step_id: String,
    },
    /// A checkpointed step had no recorded value and executed.
    CheckpointMiss {
        /// The deterministic step_id.
        step_id: String,
    },
    /// A HITL request was raised.
    HitlRequested {
        /// The HITL request id.
        request_id: String,
        /// approve, input, or review.
        kind: String,
    },
    /// A HITL request reached a terminal outcome.
    HitlResolved {
        /// The HITL request id.
        request_id: String,
        /// resolved, timed_out, or cancelled.
        outcome: String,
    },
    /// A stage in a multi-stage procedure advanced.
    StageAdvanced {
        /// The stage name being entered.
        stage: String,
    },
    /// A child invocation was spawned.
    ChildSpawned {
        /// The child invocation id.
        child: InvocationId,
    },
    /// Domain-specific event for procedures that want their own vocabulary.
    Custom {
        /// Event type identifier.
        event_type: String,
        /// Arbitrary payload.
        data: serde_json::Value,
    },
}

/// Which edge of an agent turn an [`EventKind::AgentTurn`] event marks.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentTurnStage {
    /// The turn was dispatched to the provider.
    Started,
    /// The turn returned a response (or a journalled replay of one).
    Responded,
}

/// Append-only, per-invocation event log.
///
/// Implementations back onto the same storage as `StateStore` — one crate,
/// two traits, keeping the protocol-per-concern shape even though both
/// traits often share a backend.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Append an event. The implementation assigns `seq`.
    async fn append(
        &self,
        invocation: &InvocationId,
        kind: EventKind,
        timestamp_ms: u64,
    ) -> Result<Event, StateError>;

    /// Read events for an invocation with `seq > since_seq`, in order.
    async fn read(
        &self,
        invocation: &InvocationId,
        since_seq: u64,
    ) -> Result<Vec<Event>, StateError>;
}
