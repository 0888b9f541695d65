//! # tactus-core — protocol traits for the Tactus agentic-workflow runtime
//!
//! This crate defines the four protocol boundaries and two cross-cutting
//! interfaces that compose to form an invocation, plus the data model an
//! invocation is built from: events, checkpoints, and the storage backend
//! that durably holds both.
//!
//! ## The Protocols
//!
//! | Protocol | Trait | What it does |
//! |----------|-------|-------------|
//! | ① Turn | [`Turn`] | What one agent does per cycle |
//! | ② Orchestration | [`Orchestrator`] | How agents compose + durability |
//! | ③ State | [`StateStore`] | How data persists across turns |
//! | ④ Environment | [`Environment`] | Credentials, resources an invocation needs |
//!
//! ## The Interfaces
//!
//! | Interface | Types | What it does |
//! |-----------|-------|-------------|
//! | ⑤ Hooks | [`Hook`], [`HookPoint`], [`HookAction`] | Observation + intervention |
//! | ⑥ Lifecycle | [`BudgetEvent`], [`CompactionEvent`] | Cross-layer coordination |
//!
//! ## The Data Model
//!
//! | Module | What it holds |
//! |--------|----------------|
//! | [`invocation`] | `InvocationId`, `Invocation`, `InvocationStatus` |
//! | [`event`] | `Event`, `EventKind`, the append-only `EventLog` trait |
//! | [`checkpoint`] | `CheckpointJournal` — deterministic step_id replay |
//! | [`storage`] | `StorageBackend` — one trait tying invocations, events,
//!   checkpoints together for a durable backend |
//!
//! ## Design Principle
//!
//! Every protocol trait is operation-defined, not mechanism-defined.
//! [`Turn::execute`] means "cause this agent to process one cycle" —
//! not "make an API call" or "run a subprocess." This is what makes
//! implementations swappable: an in-process call, a durable workflow,
//! and a future system that doesn't exist yet all implement the same trait.
//!
//! ## Dependency Notes
//!
//! This crate depends on `serde_json::Value` for extension data fields
//! (metadata, tool inputs, custom payloads). This is an intentional choice:
//! JSON is the universal interchange format for agentic systems, and
//! `serde_json::Value` is the de facto standard in the Rust ecosystem.
//! The alternative (generic `T: Serialize`) would complicate trait object
//! safety without practical benefit.
//!
//! ## Future: Native Async Traits
//!
//! Protocol traits currently use `async-trait` (heap-allocated futures).
//! When Rust stabilizes `async fn in dyn Trait` with `Send` bounds,
//! these traits will migrate to native async. This will be a breaking
//! change in a minor version bump before v1.0.

#![deny(missing_docs)]

pub mod checkpoint;
pub mod content;
pub mod definition;
pub mod duration;
pub mod effect;
pub mod environment;
pub mod error;
pub mod event;
pub mod hook;
pub mod id;
pub mod invocation;
pub mod lifecycle;
pub mod orchestrator;
pub mod state;
pub mod storage;
pub mod turn;

#[cfg(feature = "test-utils")]
pub mod test_utils;

// Re-exports for convenience
pub use checkpoint::CheckpointJournal;
pub use content::{Content, ContentBlock};
pub use definition::{
    AgentDeclaration, EvaluationConfig, ParamSchema, ProcedureDefinition, ResourceDependency,
    StageDeclaration,
};
pub use duration::DurationMs;
pub use effect::{Effect, Scope, SignalPayload};
pub use environment::{Environment, EnvironmentSpec};
pub use error::{
    EnvError, HitlError, HookError, JournalError, OrchError, StateError, TactusError, TurnError,
};
pub use event::{AgentTurnStage, Event, EventKind, EventLog};
pub use hook::{Hook, HookAction, HookContext, HookPoint};
pub use id::{AgentId, HitlRequestId, ScopeId, SessionId, WorkflowId};
pub use invocation::{Invocation, InvocationId, InvocationStatus};
pub use lifecycle::{BudgetEvent, CompactionEvent, ObservableEvent};
pub use orchestrator::{Orchestrator, QueryPayload};
pub use state::{SearchResult, StateReader, StateStore};
pub use storage::StorageBackend;
pub use turn::{
    ExitReason, ToolCallRecord, Turn, TurnConfig, TurnInput, TurnMetadata, TurnOutput,
};
