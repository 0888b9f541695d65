//! Error types for each protocol, plus the closed taxonomy an invocation
//! ultimately reports through.

use thiserror::Error;

/// Turn execution errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TurnError {
    /// An error from the model/LLM provider.
    #[error("model error: {0}")]
    Model(String),

    /// An error during tool execution.
    #[error("tool error in {tool}: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Error message.
        message: String,
    },

    /// Context assembly failed before the model call.
    #[error("context assembly failed: {0}")]
    ContextAssembly(String),

    /// The turn failed but retrying might succeed.
    /// The scheduler's retry policy decides.
    #[error("retryable: {0}")]
    Retryable(String),

    /// The turn failed and retrying won't help.
    /// Budget exceeded, invalid input, safety refusal.
    #[error("non-retryable: {0}")]
    NonRetryable(String),

    /// A checkpointed step hit a conflicting recorded value.
    #[error("checkpoint conflict at {step_id}")]
    CheckpointConflict {
        /// The step_id whose recorded value didn't match the callsite.
        step_id: String,
    },

    /// The invocation was cancelled before this turn completed.
    #[error("cancelled")]
    Cancelled,

    /// Wall-clock or turn-count budget exceeded.
    #[error("timeout")]
    Timeout,

    /// Catch-all. Include context.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Orchestration errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum OrchError {
    /// The requested agent was not found.
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    /// The requested workflow was not found.
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    /// Dispatching a turn failed.
    #[error("dispatch failed: {0}")]
    DispatchFailed(String),

    /// Signal delivery failed.
    #[error("signal delivery failed: {0}")]
    SignalFailed(String),

    /// A turn error propagated through orchestration.
    #[error("turn error: {0}")]
    TurnError(#[from] TurnError),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// State errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StateError {
    /// Key not found in the given scope.
    #[error("not found: {scope}/{key}")]
    NotFound {
        /// The scope that was searched.
        scope: String,
        /// The key that was not found.
        key: String,
    },

    /// A write operation failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Checkpoint journal errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum JournalError {
    /// A value is recorded at this step_id but doesn't deserialize to the
    /// shape the callsite expects — distinct from a plain miss, which the
    /// caller should treat as "perform the effect and record the result".
    #[error("checkpoint conflict at {step_id}: {reason}")]
    Conflict {
        /// The step_id that conflicted.
        step_id: String,
        /// Why the recorded value didn't match.
        reason: String,
    },

    /// Underlying storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StateError),
}

/// Environment errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EnvError {
    /// Failed to provision the execution environment.
    #[error("provisioning failed: {0}")]
    ProvisionFailed(String),

    /// The isolation boundary was violated.
    #[error("isolation violation: {0}")]
    IsolationViolation(String),

    /// Credential injection failed.
    #[error("credential injection failed: {0}")]
    CredentialFailed(String),

    /// A resource limit was exceeded.
    #[error("resource limit exceeded: {0}")]
    ResourceExceeded(String),

    /// A turn error propagated through the environment.
    #[error("turn error: {0}")]
    TurnError(#[from] TurnError),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Hook errors. These are logged but do NOT halt the turn
/// (use HookAction::Halt to halt).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook execution failed.
    #[error("hook failed: {0}")]
    Failed(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// HITL gateway errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HitlError {
    /// The handler itself failed (transport error, malformed response).
    #[error("hitl handler failed: {0}")]
    HandlerFailed(String),

    /// The wait for a human response exceeded its configured timeout and
    /// the request carried no default to fall back on.
    #[error("hitl request timed out with no default")]
    TimedOutNoDefault,

    /// The invocation was cancelled while waiting on a human response.
    #[error("cancelled while awaiting human response")]
    Cancelled,

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// The closed error taxonomy an invocation ultimately reports through.
/// Every crate's local error converts into this via `#[from]`; callers
/// that only care about "what went wrong, broadly" can match on this
/// instead of threading every crate's error type through their code.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TactusError {
    /// A tool input failed schema or precondition validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// A tool call failed.
    #[error("tool error: {0}")]
    Tool(String),

    /// The model provider failed in a way that might succeed on retry.
    #[error("provider retryable: {0}")]
    ProviderRetryable(String),

    /// The model provider failed in a way retrying won't fix.
    #[error("provider fatal: {0}")]
    ProviderFatal(String),

    /// Wall-clock or iteration budget exceeded.
    #[error("timeout")]
    Timeout,

    /// The invocation was cancelled.
    #[error("cancelled")]
    Cancelled,

    /// A checkpointed step's recorded value conflicts with its callsite.
    #[error("checkpoint conflict at {0}")]
    CheckpointConflict(String),

    /// Anything else — storage, orchestration, internal invariant violations.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TurnError> for TactusError {
    fn from(e: TurnError) -> Self {
        match e {
            TurnError::Retryable(m) => TactusError::ProviderRetryable(m),
            TurnError::NonRetryable(m) | TurnError::Model(m) => TactusError::ProviderFatal(m),
            TurnError::Tool { tool, message } => {
                TactusError::Tool(format!("{tool}: {message}"))
            }
            TurnError::ContextAssembly(m) => TactusError::Internal(m),
            TurnError::CheckpointConflict { step_id } => TactusError::CheckpointConflict(step_id),
            TurnError::Cancelled => TactusError::Cancelled,
            TurnError::Timeout => TactusError::Timeout,
            TurnError::Other(e) => TactusError::Internal(e.to_string()),
        }
    }
}

impl From<StateError> for TactusError {
    fn from(e: StateError) -> Self {
        TactusError::Internal(e.to_string())
    }
}

impl From<JournalError> for TactusError {
    fn from(e: JournalError) -> Self {
        match e {
            JournalError::Conflict { step_id, .. } => TactusError::CheckpointConflict(step_id),
            JournalError::Storage(e) => TactusError::Internal(e.to_string()),
        }
    }
}

impl From<OrchError> for TactusError {
    fn from(e: OrchError) -> Self {
        match e {
            OrchError::TurnError(e) => e.into(),
            other => TactusError::Internal(other.to_string()),
        }
    }
}

impl From<EnvError> for TactusError {
    fn from(e: EnvError) -> Self {
        match e {
            EnvError::TurnError(e) => e.into(),
            other => TactusError::Internal(other.to_string()),
        }
    }
}

impl From<HookError> for TactusError {
    fn from(e: HookError) -> Self {
        TactusError::Internal(e.to_string())
    }
}

impl From<HitlError> for TactusError {
    fn from(e: HitlError) -> Self {
        match e {
            HitlError::TimedOutNoDefault => TactusError::Timeout,
            HitlError::Cancelled => TactusError::Cancelled,
            HitlError::HandlerFailed(m) => TactusError::Internal(m),
            HitlError::Other(e) => TactusError::Internal(e.to_string()),
        }
    }
}
