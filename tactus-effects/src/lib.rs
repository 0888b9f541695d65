#![deny(missing_docs)]
//! Effect interpretation for tactus.
//!
//! A turn declares side-effects ([`tactus_core::Effect`]) but never performs
//! them — that's the separation [`tactus_core::turn::Turn`] is built around.
//! Something downstream has to turn `WriteMemory`/`DeleteMemory`/`Signal`/
//! `Log` into an actual state write or recorded event. [`EffectInterpreter`]
//! is that seam, kept separate from `tactus-scheduler`'s follow-up queue so
//! "what does this effect mean against my state backend" and "what do I
//! dispatch next" can vary independently.
//!
//! `Delegate`/`Handoff` are not interpreted here — turning those into the
//! next agent to run is inherently a scheduling decision, not a state
//! mutation, so `tactus-scheduler` owns them directly.

use async_trait::async_trait;
use tactus_core::effect::{Effect, LogLevel, Scope};
use tactus_core::error::StateError;
use tactus_core::state::StateStore;
use thiserror::Error;

/// Errors from interpreting an effect.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EffectError {
    /// The underlying state backend rejected the write/delete.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// The effect variant isn't one this interpreter knows how to apply
    /// (e.g. `Delegate`/`Handoff`, which belong to the scheduler).
    #[error("effect not handled by this interpreter: {0:?}")]
    Unhandled(EffectKindLabel),
}

/// A label identifying an effect's kind, for error reporting without
/// cloning the (possibly large) effect payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum EffectKindLabel {
    WriteMemory,
    DeleteMemory,
    Signal,
    Delegate,
    Handoff,
    Log,
    Custom,
}

impl EffectKindLabel {
    fn of(effect: &Effect) -> Self {
        match effect {
            Effect::WriteMemory { .. } => Self::WriteMemory,
            Effect::DeleteMemory { .. } => Self::DeleteMemory,
            Effect::Signal { .. } => Self::Signal,
            Effect::Delegate { .. } => Self::Delegate,
            Effect::Handoff { .. } => Self::Handoff,
            Effect::Log { .. } => Self::Log,
            _ => Self::Custom,
        }
    }
}

/// What happened when an effect was interpreted. Callers fold these into
/// their own event log / trace.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum EffectOutcome {
    /// A memory write was applied.
    MemoryWritten {
        /// Scope the value was written into.
        scope: Scope,
        /// Key written.
        key: String,
    },
    /// A memory delete was applied.
    MemoryDeleted {
        /// Scope the key was deleted from.
        scope: Scope,
        /// Key deleted.
        key: String,
    },
    /// A log-level effect was recorded (emitted to `tracing`, not stored).
    Logged {
        /// Severity of the logged effect.
        level: LogLevel,
    },
    /// A signal effect was observed but not delivered — the interpreter
    /// only records intent; delivery is the orchestrator's job.
    SignalObserved {
        /// The signal's declared type.
        signal_type: String,
    },
    /// The effect carries no state-layer meaning (e.g. `Custom`) and was
    /// ignored by design, not by error.
    Ignored,
}

/// Interprets a single [`Effect`] against a state backend.
///
/// Implementations are expected to be cheap and synchronous-feeling;
/// anything that needs to dispatch another turn belongs in
/// `tactus-scheduler`, not here.
#[async_trait]
pub trait EffectInterpreter: Send + Sync {
    /// Apply one effect, returning what happened.
    async fn interpret(&self, effect: &Effect) -> Result<EffectOutcome, EffectError>;

    /// Apply a batch of effects in order, stopping at the first error.
    async fn interpret_all(&self, effects: &[Effect]) -> Result<Vec<EffectOutcome>, EffectError> {
        let mut outcomes = Vec::with_capacity(effects.len());
        for effect in effects {
            outcomes.push(self.interpret(effect).await?);
        }
        Ok(outcomes)
    }
}

/// Default interpreter: applies `WriteMemory`/`DeleteMemory` to a
/// `StateStore`, logs `Log` effects through `tracing`, and records
/// `Signal` effects without delivering them (delivery needs an
/// `Orchestrator`, which the scheduler already owns).
///
/// `Delegate`, `Handoff`, and forward-compatible `Custom` effects are
/// reported as [`EffectOutcome::Ignored`] rather than erroring — a
/// procedure that never delegates shouldn't have to special-case this
/// interpreter just because its effect vocabulary is a superset of what's
/// used.
pub struct LocalEffectInterpreter<S: StateStore + ?Sized> {
    state: std::sync::Arc<S>,
}

impl<S: StateStore + ?Sized> LocalEffectInterpreter<S> {
    /// Create an interpreter backed by the given state store.
    pub fn new(state: std::sync::Arc<S>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl<S: StateStore + ?Sized + 'static> EffectInterpreter for LocalEffectInterpreter<S> {
    async fn interpret(&self, effect: &Effect) -> Result<EffectOutcome, EffectError> {
        match effect {
            Effect::WriteMemory { scope, key, value } => {
                self.state.write(scope, key, value.clone()).await?;
                tracing::debug!(key = %key, "effect: memory written");
                Ok(EffectOutcome::MemoryWritten {
                    scope: scope.clone(),
                    key: key.clone(),
                })
            }
            Effect::DeleteMemory { scope, key } => {
                self.state.delete(scope, key).await?;
                tracing::debug!(key = %key, "effect: memory deleted");
                Ok(EffectOutcome::MemoryDeleted {
                    scope: scope.clone(),
                    key: key.clone(),
                })
            }
            Effect::Log { level, message, data } => {
                match level {
                    LogLevel::Trace => tracing::trace!(data = ?data, "{message}"),
                    LogLevel::Debug => tracing::debug!(data = ?data, "{message}"),
                    LogLevel::Info => tracing::info!(data = ?data, "{message}"),
                    LogLevel::Warn => tracing::warn!(data = ?data, "{message}"),
                    LogLevel::Error => tracing::error!(data = ?data, "{message}"),
                }
                Ok(EffectOutcome::Logged { level: level.clone() })
            }
            Effect::Signal { payload, .. } => Ok(EffectOutcome::SignalObserved {
                signal_type: payload.signal_type.clone(),
            }),
            Effect::Delegate { .. } | Effect::Handoff { .. } => Ok(EffectOutcome::Ignored),
            _ => {
                let _ = EffectKindLabel::of(effect);
                Ok(EffectOutcome::Ignored)
            }
        }
    }
}
