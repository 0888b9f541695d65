#![deny(missing_docs)]
//! # tactus — umbrella crate
//!
//! Single import surface for the Tactus agentic workflow runtime.
//! Re-exports protocol and implementation crates behind feature flags, plus a
//! `prelude` for the happy path.

#[cfg(feature = "core")]
pub use tactus_core;
#[cfg(feature = "core")]
pub use tactus_context;
#[cfg(feature = "env-local")]
pub use tactus_env_local;
#[cfg(feature = "hooks")]
pub use tactus_hooks;
#[cfg(feature = "op-react")]
pub use tactus_agent_react;
#[cfg(feature = "op-single-shot")]
pub use tactus_agent_step;
#[cfg(feature = "orch-kit")]
pub use tactus_scheduler;
#[cfg(feature = "orch-local")]
pub use tactus_orchestrator_local;
#[cfg(feature = "state-fs")]
pub use tactus_state_fs;
#[cfg(feature = "state-memory")]
pub use tactus_state_memory;
#[cfg(feature = "core")]
pub use tactus_tool;
#[cfg(feature = "core")]
pub use tactus_agent_turn;
#[cfg(feature = "hitl")]
pub use tactus_hitl;
#[cfg(feature = "effects")]
pub use tactus_effects;
#[cfg(feature = "script")]
pub use tactus_script;
#[cfg(feature = "bdd")]
pub use tactus_bdd;

/// Happy-path imports for composing Tactus procedures.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use tactus_core::{
        AgentId, Content, ContentBlock, Effect, Environment, ExitReason, Hook, HookAction,
        HookContext, HookPoint, Scope, SessionId, StateReader, StateStore, Turn, TurnConfig,
        TurnInput, TurnOutput, WorkflowId,
    };

    #[cfg(feature = "hooks")]
    pub use tactus_hooks::HookRegistry;

    #[cfg(feature = "core")]
    pub use tactus_tool::{ToolDyn, ToolError, ToolRegistry};

    #[cfg(feature = "core")]
    pub use tactus_agent_turn::provider::{Provider, ProviderError};

    #[cfg(feature = "op-react")]
    pub use tactus_agent_react::{ReactConfig, ReactOperator};

    #[cfg(feature = "op-single-shot")]
    pub use tactus_agent_step::SingleShotOperator;

    #[cfg(feature = "orch-kit")]
    pub use tactus_scheduler::{Kit, OrchestratedRunner};

    #[cfg(feature = "orch-local")]
    pub use tactus_orchestrator_local::LocalOrch;

    #[cfg(feature = "env-local")]
    pub use tactus_env_local::LocalEnv;

    #[cfg(feature = "state-memory")]
    pub use tactus_state_memory::MemoryStore;

    #[cfg(feature = "state-fs")]
    pub use tactus_state_fs::FsStore;

    #[cfg(feature = "hitl")]
    pub use tactus_hitl::{HitlGateway, HitlHandler, HitlRequest, MockHitlHandler};

    #[cfg(feature = "effects")]
    pub use tactus_effects::EffectInterpreter;

    #[cfg(feature = "script")]
    pub use tactus_script::ScriptEngine;

    #[cfg(feature = "bdd")]
    pub use tactus_bdd::BddHarness;
}
