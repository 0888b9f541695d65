//! `run <file> [--param k=v]…` — execute a procedure definition to
//! completion (or suspension/failure) and hand back its full event log.
//!
//! Everything a live run needs beyond the definition itself — the LLM
//! provider, the HITL handler, tool implementations, durable storage — is
//! an out-of-scope external collaborator per §1. This module takes them
//! as [`RuntimeDeps`] rather than constructing any of them, the same way
//! `tactus-bdd::run` takes mocks through a [`World`](tactus_bdd::World)
//! instead of hard-coding one.

use std::collections::HashMap;
use std::sync::Arc;

use tactus_core::definition::ProcedureDefinition;
use tactus_core::error::TactusError;
use tactus_core::event::Event;
use tactus_core::id::InvocationId;
use tactus_core::state::StateStore;
use tactus_core::storage::StorageBackend;
use tactus_scheduler::procedure::Scheduler;
use tactus_script::{AgentDecl, DynHitl, ScriptEngine, ScriptProvider};
use tactus_tool::ToolDyn;

use crate::error::CliError;

/// The collaborators a live run needs that this workspace only defines
/// the interface for: a durable backend, a model provider, a human
/// gateway, and the tool implementations an embedder's agents call.
pub struct RuntimeDeps {
    /// Event log / state / checkpoint / invocation-record backend.
    pub storage: Arc<dyn StorageBackend>,
    /// The LLM provider every declared agent's `turn()` calls through.
    pub provider: Arc<dyn ScriptProvider>,
    /// The human gateway every `Human.*` call suspends through.
    pub hitl: Arc<dyn DynHitl>,
    /// Tool implementations, keyed by the name an agent declaration
    /// refers to it by. `done`/`todo` never need an entry here — the
    /// script bridge always supplies those builtins.
    pub tools: HashMap<String, Arc<dyn ToolDyn>>,
}

/// What `run` hands back: the invocation's id, its terminal result (or
/// the error it failed with), and its full event log — exactly what a
/// real CLI binary streams to stdout and checks the exit code against.
pub struct RunOutcome {
    /// The id the scheduler assigned this invocation.
    pub invocation_id: InvocationId,
    /// The script's return value, or the error that ended the invocation.
    pub result: Result<serde_json::Value, TactusError>,
    /// Every event recorded against this invocation, in sequence order.
    pub events: Vec<Event>,
}

impl RunOutcome {
    /// The exit code a CLI binary should report: 0 on completion, 1 on
    /// failure — §6's "exit 0 on completion, non-zero on failure".
    pub fn exit_code(&self) -> i32 {
        if self.result.is_ok() {
            0
        } else {
            1
        }
    }
}

/// Run `definition` once against live collaborators, resolving `params`
/// against its schema first.
pub async fn run(
    definition: &ProcedureDefinition,
    params: serde_json::Value,
    deps: RuntimeDeps,
) -> Result<RunOutcome, CliError> {
    let resolved = definition
        .resolve_params(&params)
        .map_err(|missing| CliError::MissingParams(missing.join(", ")))?;

    let agents = build_agents(definition, &deps.tools)?;

    let engine = ScriptEngine::new();
    let body = engine.procedure(
        &definition.script,
        agents,
        Arc::clone(&deps.provider),
        Arc::clone(&deps.hitl),
        Arc::clone(&deps.storage) as Arc<dyn StateStore>,
    )?;

    let scheduler = Scheduler::new(Arc::clone(&deps.storage));
    scheduler
        .register(definition.name.clone(), Arc::new(body))
        .await;

    let invocation_id = scheduler.spawn(&definition.name, resolved).await?;
    let result = scheduler.result(&invocation_id).await;
    let events = deps
        .storage
        .read_events(&invocation_id, 0)
        .await
        .map_err(TactusError::from)?;

    Ok(RunOutcome {
        invocation_id,
        result,
        events,
    })
}

/// Read new events since `since_seq` without re-running anything — the
/// polling half of §6's `subscribe(invocation_id, since_seq) → stream<Event>`.
/// A real subscriber (the IDE, a long-poll HTTP handler) calls this in a
/// loop; pushing events to a socket as they're appended is the binary's
/// transport to build, not this crate's.
pub async fn subscribe(
    storage: &Arc<dyn StorageBackend>,
    invocation_id: &InvocationId,
    since_seq: u64,
) -> Result<Vec<Event>, CliError> {
    storage
        .read_events(invocation_id, since_seq)
        .await
        .map_err(|e| CliError::Host(TactusError::from(e)))
}

fn build_agents(
    definition: &ProcedureDefinition,
    tools: &HashMap<String, Arc<dyn ToolDyn>>,
) -> Result<Vec<AgentDecl>, CliError> {
    definition
        .agents
        .iter()
        .map(|decl| {
            let mut agent = AgentDecl::new(decl.name.clone(), decl.system_prompt.clone());
            if let Some(model) = &decl.model {
                agent = agent.with_model(model.clone());
            }
            if let Some(max_tokens) = decl.max_tokens {
                agent.default_max_tokens = max_tokens;
            }
            if let Some(max_turns) = decl.max_turns {
                agent.default_max_turns = max_turns;
            }
            for name in &decl.tools {
                let tool = tools.get(name).cloned().ok_or_else(|| CliError::UnknownTool {
                    agent: decl.name.clone(),
                    tool: name.clone(),
                })?;
                agent = agent.with_tool(tool);
            }
            Ok(agent)
        })
        .collect()
}
