#![deny(missing_docs)]
//! G. HITL gateway — suspend an invocation on `approve`/`input`/`review`
//! and resume it with whatever a human (or a [`MockHitlHandler`] standing
//! in for one) decides.
//!
//! Mirrors the tagged-union shape of [`tactus_core::hook::HookAction`]:
//! a single request crosses into exactly one of three terminal outcomes
//! ([`HitlOutcome`]). Unlike a hook, a HITL request is durable — it
//! appends `hitl_request`/`hitl_resolved` events, flips the invocation to
//! `Suspended { AwaitingHuman }` for the wait, and journals the outcome
//! by request id so a replayed invocation returns it verbatim without
//! asking twice.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tactus_core::duration::DurationMs;
use tactus_core::error::HitlError;
use tactus_core::event::EventKind;
use tactus_core::id::{HitlRequestId, InvocationId};
use tactus_core::invocation::{InvocationStatus, SuspendReason};
use tactus_core::storage::StorageBackend;

/// The three things a procedure can ask a human for.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitlKind {
    /// Approve or reject a proposed action.
    Approve,
    /// Free-form input.
    Input,
    /// Review (and possibly edit) a value.
    Review,
}

impl HitlKind {
    fn label(&self) -> &'static str {
        match self {
            HitlKind::Approve => "approve",
            HitlKind::Input => "input",
            HitlKind::Review => "review",
        }
    }
}

/// A single outstanding request for a human response.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitlRequest {
    /// Unique id for this request, assigned by the gateway.
    pub id: HitlRequestId,
    /// Which of the three HITL operations this is.
    pub kind: HitlKind,
    /// Human-facing prompt.
    pub message: String,
    /// Arbitrary structured context shown alongside the message.
    pub context: Value,
    /// How long to wait before falling back to `default`. `None` waits
    /// indefinitely.
    pub timeout: Option<DurationMs>,
    /// Value substituted if the timeout elapses.
    pub default: Option<Value>,
}

/// Terminal outcome of a HITL request, as reported by a [`HitlHandler`].
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HitlOutcome {
    /// A human (or mock) resolved the request with a value.
    Resolved {
        /// The value the human supplied.
        value: Value,
    },
    /// The timeout elapsed with no response.
    TimedOut,
    /// The request was cancelled before a human responded.
    Cancelled,
}

/// Consumed external interface: whatever answers HITL requests — a real
/// UI, a chat integration, or in tests a [`MockHitlHandler`].
#[async_trait]
pub trait HitlHandler: Send + Sync {
    /// Resolve `request`, returning its outcome. Implementations that
    /// never time out or cancel on their own may ignore `request.timeout`
    /// entirely — the gateway enforces it independently.
    async fn request(&self, request: &HitlRequest) -> HitlOutcome;
}

/// What an unscripted request resolves to under a [`MockHitlHandler`].
#[derive(Clone)]
enum DefaultOutcome {
    AutoApprove,
    AutoReject,
    Value(Value),
    /// Never resolves on its own. Exercises the gateway's own
    /// `tokio::time::timeout` enforcement — a request with no `timeout`
    /// against this handler waits forever, exactly as a real human who
    /// never looks at their phone would.
    Hang,
}

/// Deterministic stand-in for a human, for tests and `evaluate` runs.
///
/// Resolution order: an exact match on the request message in `scripted`,
/// then the handler's configured default.
pub struct MockHitlHandler {
    scripted: HashMap<String, Value>,
    default: DefaultOutcome,
}

impl MockHitlHandler {
    /// Resolve every request with `{"approved": true}`.
    pub fn auto_approve() -> Self {
        Self {
            scripted: HashMap::new(),
            default: DefaultOutcome::AutoApprove,
        }
    }

    /// Resolve every request with `{"approved": false}`.
    pub fn auto_reject() -> Self {
        Self {
            scripted: HashMap::new(),
            default: DefaultOutcome::AutoReject,
        }
    }

    /// Resolve every unscripted request with `value`.
    pub fn with_default(value: Value) -> Self {
        Self {
            scripted: HashMap::new(),
            default: DefaultOutcome::Value(value),
        }
    }

    /// Never respond. Only useful paired with a request `timeout` —
    /// otherwise the gateway call hangs forever, same as a real human
    /// would. Used to exercise the "resolved via default on timeout"
    /// path deterministically.
    pub fn hang() -> Self {
        Self {
            scripted: HashMap::new(),
            default: DefaultOutcome::Hang,
        }
    }

    /// Script a response keyed by the request's message text (exact match).
    /// Takes priority over the configured default.
    pub fn script(mut self, message: impl Into<String>, value: Value) -> Self {
        self.scripted.insert(message.into(), value);
        self
    }
}

impl Default for MockHitlHandler {
    fn default() -> Self {
        Self::auto_approve()
    }
}

#[async_trait]
impl HitlHandler for MockHitlHandler {
    async fn request(&self, request: &HitlRequest) -> HitlOutcome {
        if let Some(value) = self.scripted.get(&request.message) {
            return HitlOutcome::Resolved {
                value: value.clone(),
            };
        }
        if matches!(self.default, DefaultOutcome::Hang) {
            std::future::pending::<()>().await;
            unreachable!("pending future never resolves");
        }
        let value = match &self.default {
            DefaultOutcome::AutoApprove => serde_json::json!({"approved": true}),
            DefaultOutcome::AutoReject => serde_json::json!({"approved": false}),
            DefaultOutcome::Value(v) => v.clone(),
            DefaultOutcome::Hang => unreachable!("handled above"),
        };
        HitlOutcome::Resolved { value }
    }
}

/// The HITL gateway: turns `approve`/`input`/`review` calls into a
/// suspend-and-wait cycle against an invocation's storage backend.
///
/// Every call appends a `hitl_request` event, transitions the invocation
/// to `Suspended { AwaitingHuman }`, awaits the configured handler (with
/// an enforced wall-clock timeout when one is given), journals the
/// outcome under the request id, appends `hitl_resolved`, and returns
/// the invocation to `Running` if it isn't already terminal.
pub struct HitlGateway<H: HitlHandler> {
    handler: H,
    storage: Arc<dyn StorageBackend>,
    next_id: AtomicU64,
}

impl<H: HitlHandler> HitlGateway<H> {
    /// Build a gateway over a handler and the invocation's storage backend.
    pub fn new(handler: H, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            handler,
            storage,
            next_id: AtomicU64::new(0),
        }
    }

    /// Ask a human to approve or reject a proposed action.
    pub async fn approve(
        &self,
        invocation: &InvocationId,
        message: impl Into<String>,
        context: Value,
        timeout: Option<DurationMs>,
        default: Option<Value>,
    ) -> Result<Value, HitlError> {
        self.request(invocation, HitlKind::Approve, message, context, timeout, default)
            .await
    }

    /// Ask a human for free-form input.
    pub async fn input(
        &self,
        invocation: &InvocationId,
        message: impl Into<String>,
        context: Value,
        timeout: Option<DurationMs>,
        default: Option<Value>,
    ) -> Result<Value, HitlError> {
        self.request(invocation, HitlKind::Input, message, context, timeout, default)
            .await
    }

    /// Ask a human to review, and possibly edit, a value.
    pub async fn review(
        &self,
        invocation: &InvocationId,
        message: impl Into<String>,
        context: Value,
        timeout: Option<DurationMs>,
        default: Option<Value>,
    ) -> Result<Value, HitlError> {
        self.request(invocation, HitlKind::Review, message, context, timeout, default)
            .await
    }

    fn next_request_id(&self, invocation: &InvocationId) -> HitlRequestId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        HitlRequestId::new(format!("{invocation}:hitl:{n}"))
    }

    async fn request(
        &self,
        invocation: &InvocationId,
        kind: HitlKind,
        message: impl Into<String>,
        context: Value,
        timeout: Option<DurationMs>,
        default: Option<Value>,
    ) -> Result<Value, HitlError> {
        let message = message.into();
        let request_id = self.next_request_id(invocation);
        let journal_key = format!("hitl:{request_id}");

        // Read-through: a replayed invocation must return the journalled
        // outcome verbatim, never ask again.
        if let Some(recorded) = self
            .storage
            .read_checkpoint(invocation, &journal_key)
            .await
            .map_err(|e| HitlError::HandlerFailed(e.to_string()))?
        {
            return Self::outcome_from_record(&recorded);
        }

        let req = HitlRequest {
            id: request_id.clone(),
            kind,
            message,
            context,
            timeout,
            default: default.clone(),
        };

        self.storage
            .append_event(
                invocation,
                EventKind::HitlRequested {
                    request_id: request_id.to_string(),
                    kind: kind.label().to_string(),
                },
                now_ms(),
            )
            .await
            .map_err(|e| HitlError::HandlerFailed(e.to_string()))?;

        self.suspend(invocation, &request_id).await?;

        tracing::debug!(request_id = %request_id, kind = kind.label(), "hitl: awaiting human");

        let outcome = match req.timeout {
            Some(d) => match tokio::time::timeout(d.to_std(), self.handler.request(&req)).await {
                Ok(outcome) => outcome,
                Err(_) => HitlOutcome::TimedOut,
            },
            None => self.handler.request(&req).await,
        };

        let (label, record, result) = match &outcome {
            HitlOutcome::Resolved { value } => (
                "resolved",
                serde_json::json!({"resolved": value}),
                Ok(value.clone()),
            ),
            HitlOutcome::TimedOut => match &req.default {
                Some(d) => (
                    "timed_out",
                    serde_json::json!({"timed_out": true, "default": d}),
                    Ok(d.clone()),
                ),
                None => (
                    "timed_out",
                    serde_json::json!({"timed_out": true}),
                    Err(HitlError::TimedOutNoDefault),
                ),
            },
            HitlOutcome::Cancelled => (
                "cancelled",
                serde_json::json!({"cancelled": true}),
                Err(HitlError::Cancelled),
            ),
        };

        self.storage
            .write_checkpoint(invocation, &journal_key, record)
            .await
            .map_err(|e| HitlError::HandlerFailed(e.to_string()))?;

        self.storage
            .append_event(
                invocation,
                EventKind::HitlResolved {
                    request_id: request_id.to_string(),
                    outcome: label.to_string(),
                },
                now_ms(),
            )
            .await
            .map_err(|e| HitlError::HandlerFailed(e.to_string()))?;

        self.resume(invocation).await?;

        result
    }

    async fn suspend(
        &self,
        invocation: &InvocationId,
        request_id: &HitlRequestId,
    ) -> Result<(), HitlError> {
        if let Some(mut inv) = self
            .storage
            .load_invocation(invocation)
            .await
            .map_err(|e| HitlError::HandlerFailed(e.to_string()))?
        {
            inv.status = InvocationStatus::Suspended {
                reason: SuspendReason::AwaitingHuman {
                    request_id: request_id.to_string(),
                },
            };
            inv.updated_at_ms = now_ms();
            self.storage
                .save_invocation(&inv)
                .await
                .map_err(|e| HitlError::HandlerFailed(e.to_string()))?;
        }
        Ok(())
    }

    async fn resume(&self, invocation: &InvocationId) -> Result<(), HitlError> {
        if let Some(mut inv) = self
            .storage
            .load_invocation(invocation)
            .await
            .map_err(|e| HitlError::HandlerFailed(e.to_string()))?
        {
            if !inv.status.is_terminal() {
                inv.status = InvocationStatus::Running;
                inv.updated_at_ms = now_ms();
                self.storage
                    .save_invocation(&inv)
                    .await
                    .map_err(|e| HitlError::HandlerFailed(e.to_string()))?;
            }
        }
        Ok(())
    }

    fn outcome_from_record(record: &Value) -> Result<Value, HitlError> {
        if let Some(v) = record.get("resolved") {
            return Ok(v.clone());
        }
        if record.get("timed_out").and_then(Value::as_bool) == Some(true) {
            return match record.get("default") {
                Some(d) => Ok(d.clone()),
                None => Err(HitlError::TimedOutNoDefault),
            };
        }
        if record.get("cancelled").and_then(Value::as_bool) == Some(true) {
            return Err(HitlError::Cancelled);
        }
        Err(HitlError::HandlerFailed(
            "malformed hitl journal record".to_string(),
        ))
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
