//! Runs one scenario's procedure definition under full mock conditions and
//! assembles the [`ScenarioOutcome`] the `Then` steps assert against.
//!
//! Builds a fresh, single-use [`MemoryStore`]/[`Scheduler`]/[`ScriptEngine`]
//! for every scenario — mock runs never share state across scenarios, the
//! same isolation a real deployment gets from one invocation never sharing
//! mutable state with another.

use std::sync::Arc;

use tactus_core::definition::ProcedureDefinition;
use tactus_core::effect::Scope;
use tactus_core::error::TactusError;
use tactus_core::state::StateStore;
use tactus_core::storage::StorageBackend;
use tactus_hitl::HitlGateway;
use tactus_scheduler::procedure::Scheduler;
use tactus_script::{AgentDecl, DynHitl, ScriptEngine, ScriptProvider};
use tactus_state_memory::MemoryStore;
use tactus_tool::{MockToolRegistry, ToolDyn};

use crate::error::BddError;
use crate::mock_provider::MockProvider;
use crate::mock_tool::MockTool;
use crate::outcome::ScenarioOutcome;
use crate::scenario::World;

/// Storage key `Stage.set`/`Stage.get` read and write against, mirroring
/// the private constant the script bridge's `Stage` capability uses —
/// duplicated here rather than exposed across the crate boundary, since
/// it's an implementation detail of how `Stage` happens to be stored, not
/// part of its public contract.
const STAGE_KEY: &str = "__stage__";

/// Run `definition` against whatever `world`'s `Given` steps configured,
/// then record the result as `world.outcome`.
///
/// Every declared tool name, plus the `done`/`todo` builtins, is backed by
/// a single shared [`MockToolRegistry`] — registering a `MockTool` under
/// those names overwrites the real builtins the same way any other
/// same-name tool registration would, so a scenario's tool behavior (and
/// its control-flow tools) are fully scripted with no real side effects.
pub async fn run(definition: &ProcedureDefinition, world: &mut World) -> Result<(), BddError> {
    let params = definition
        .resolve_params(&world.params)
        .map_err(|missing| {
            BddError::AssertionFailed(format!(
                "missing required parameter(s): {}",
                missing.join(", ")
            ))
        })?;

    let storage = Arc::new(MemoryStore::new());

    let mut mock_tools = MockToolRegistry::new();
    for (name, args, response) in world.tool_responses.drain(..) {
        mock_tools = mock_tools.on(name, args, response);
    }
    let mock_tools = Arc::new(mock_tools);

    let provider: Arc<dyn ScriptProvider> =
        Arc::new(MockProvider::new(std::mem::take(&mut world.provider_script)));

    let hitl_handler = std::mem::take(&mut world.hitl);
    let gateway: Arc<dyn DynHitl> = Arc::new(HitlGateway::new(
        hitl_handler,
        Arc::clone(&storage) as Arc<dyn StorageBackend>,
    ));

    let agents: Vec<AgentDecl> = definition
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
            // `done`/`todo` are registered last so a mock-backed version
            // always wins over the real builtins, regardless of whether
            // the definition also lists them explicitly.
            let mut tool_names = decl.tools.clone();
            tool_names.push("done".to_string());
            tool_names.push("todo".to_string());
            for name in &tool_names {
                agent = agent.with_tool(mock_tool(name, &mock_tools));
            }
            agent
        })
        .collect();

    let engine = ScriptEngine::new();
    let body = engine
        .procedure(
            &definition.script,
            agents,
            provider,
            gateway,
            Arc::clone(&storage) as Arc<dyn StateStore>,
        )
        .map_err(BddError::from)?;

    let scheduler = Scheduler::new(Arc::clone(&storage) as Arc<dyn StorageBackend>);
    scheduler.register(definition.name.clone(), Arc::new(body)).await;

    // A freshly constructed `Scheduler`'s id counter starts at 1, so the
    // first invocation it ever spawns is deterministically named
    // "{procedure}-1" — seed state at that predicted scope before spawning
    // so it's visible from the script's very first `State`/`Stage` call,
    // not racing the invocation's own task.
    for (scope, key, value) in world.state_seed.drain(..) {
        storage
            .write(&scope, &key, value)
            .await
            .map_err(|e| BddError::Host(TactusError::from(e)))?;
    }

    let invocation_id = scheduler
        .spawn(&definition.name, params)
        .await
        .map_err(|e| BddError::Host(TactusError::from(e)))?;

    let result = scheduler
        .result(&invocation_id)
        .await
        .map_err(|e| e.to_string());

    let iterations = scheduler
        .status(&invocation_id)
        .await
        .map(|s| s.iterations)
        .unwrap_or(0);

    let events = storage
        .read_events(&invocation_id, 0)
        .await
        .unwrap_or_default();

    let invocation_scope = Scope::Custom(format!("invocation:{invocation_id}"));
    let final_state_keys = storage
        .list(&invocation_scope, "")
        .await
        .unwrap_or_default();
    let stage = storage
        .read(&invocation_scope, STAGE_KEY)
        .await
        .ok()
        .flatten()
        .and_then(|v| v.as_str().map(str::to_string));

    world.outcome = Some(ScenarioOutcome {
        result,
        tool_calls: mock_tools.all_calls(),
        events,
        final_state_keys,
        stage,
        iterations,
    });

    Ok(())
}

fn mock_tool(name: &str, registry: &Arc<MockToolRegistry>) -> Arc<dyn ToolDyn> {
    Arc::new(MockTool::new(name.to_string(), Arc::clone(registry)))
}
