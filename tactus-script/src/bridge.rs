//! Ties a compiled script to one invocation: builds the per-invocation
//! capability objects, binds them into a Rhai `Scope`, and runs the script
//! as a [`ProcedureBody`].
//!
//! Each declared agent becomes its own [`ReactOperator`] wrapped as
//! `Arc<dyn Turn>` — the same Agent Primitive every other part of the
//! workspace runs, just assembled here from a script's agent declarations
//! instead of from Rust code directly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rhai::{Engine, Scope as RhaiScope, AST};

use tactus_agent_react::{ReactConfig, ReactOperator};
use tactus_context::SlidingWindow;
use tactus_core::effect::Scope as TactusScope;
use tactus_core::error::{StateError, TactusError};
use tactus_core::id::SessionId;
use tactus_core::state::{SearchResult, StateReader, StateStore};
use tactus_core::turn::Turn;
use tactus_hooks::HookRegistry;
use tactus_scheduler::procedure::{InvocationHandle, ProcedureBody};
use tactus_tool::{ToolDyn, ToolRegistry};

use crate::capabilities::{
    AgentCap, HumanCap, IterationsCap, LogCap, ParamsCap, ProcedureCap, SessionCap, StageCap,
    StateCap, StepCap, ToolCap,
};
use crate::error::ScriptError;
use crate::hitl_dyn::DynHitl;
use crate::provider::{DynProvider, ScriptProvider};
use crate::tool_log::{RecordingTool, ToolLedger};

/// One agent a script procedure can call by name.
///
/// Built by the caller (CLI, demo, BDD harness) from a procedure's
/// declaration and handed to [`ScriptEngine::procedure`] — the bridge
/// itself never parses agent declarations out of script source, since the
/// script language's syntax for that is outside this crate's concern.
#[derive(Clone)]
pub struct AgentDecl {
    /// The name a script binds to this agent (`Greeter.turn(...)`).
    pub name: String,
    /// Base system prompt.
    pub system_prompt: String,
    /// Default model identifier, if the provider needs one.
    pub default_model: Option<String>,
    /// Tools this agent may call, beyond the built-in `done`/`todo`.
    pub tools: Vec<Arc<dyn ToolDyn>>,
    /// Default max tokens per response.
    pub default_max_tokens: u32,
    /// Default max ReAct iterations per `turn()` call.
    pub default_max_turns: u32,
}

impl AgentDecl {
    /// A bare agent with no tools and workspace defaults.
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            default_model: None,
            tools: Vec::new(),
            default_max_tokens: 4096,
            default_max_turns: 10,
        }
    }

    /// Attach a tool.
    pub fn with_tool(mut self, tool: Arc<dyn ToolDyn>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Override the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }
}

/// Adapts a `StateStore` trait object into the read-only `StateReader`
/// a `ReactOperator` expects. `tactus_core::StateReader`'s blanket impl
/// is over `T: StateStore` (sized), which doesn't cover `dyn StateStore` —
/// this is the thin wrapper that closes that gap for a boxed store.
struct StateReaderAdapter(Arc<dyn StateStore>);

#[async_trait]
impl StateReader for StateReaderAdapter {
    async fn read(
        &self,
        scope: &TactusScope,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StateError> {
        self.0.read(scope, key).await
    }

    async fn list(&self, scope: &TactusScope, prefix: &str) -> Result<Vec<String>, StateError> {
        self.0.list(scope, prefix).await
    }

    async fn search(
        &self,
        scope: &TactusScope,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, StateError> {
        self.0.search(scope, query, limit).await
    }
}

/// Compiles Rhai source and builds runnable [`ScriptProcedureBody`]
/// instances from it. One `ScriptEngine` holds one Rhai `Engine` with every
/// capability type registered, and is cheap to share across many compiled
/// procedures.
#[derive(Clone)]
pub struct ScriptEngine {
    engine: Arc<Engine>,
}

impl ScriptEngine {
    /// Build a fresh engine with every capability type registered.
    pub fn new() -> Self {
        let mut engine = Engine::new();
        crate::capabilities::register_all(&mut engine);
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Compile `source`, surfacing syntax errors without running anything —
    /// the CLI's `validate` operation.
    pub fn validate(&self, source: &str) -> Result<(), ScriptError> {
        self.engine
            .compile(source)
            .map(|_| ())
            .map_err(|e| ScriptError::Compile(e.to_string()))
    }

    /// Compile `source` and bind it to the agents/provider/HITL/state it
    /// will run against, producing a [`ScriptProcedureBody`] ready to
    /// register with a `Scheduler`.
    pub fn procedure(
        &self,
        source: &str,
        agents: Vec<AgentDecl>,
        provider: Arc<dyn ScriptProvider>,
        hitl: Arc<dyn DynHitl>,
        state: Arc<dyn StateStore>,
    ) -> Result<ScriptProcedureBody, ScriptError> {
        let ast = self
            .engine
            .compile(source)
            .map_err(|e| ScriptError::Compile(e.to_string()))?;
        Ok(ScriptProcedureBody {
            engine: Arc::clone(&self.engine),
            ast: Arc::new(ast),
            agents: Arc::new(agents),
            provider,
            hitl,
            state,
        })
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// A compiled script bound to its agents, provider, HITL gateway, and state
/// store — runnable as a [`ProcedureBody`].
#[derive(Clone)]
pub struct ScriptProcedureBody {
    engine: Arc<Engine>,
    ast: Arc<AST>,
    agents: Arc<Vec<AgentDecl>>,
    provider: Arc<dyn ScriptProvider>,
    hitl: Arc<dyn DynHitl>,
    state: Arc<dyn StateStore>,
}

#[async_trait]
impl ProcedureBody for ScriptProcedureBody {
    async fn run(&self, ctx: InvocationHandle) -> Result<serde_json::Value, TactusError> {
        ctx.check_cancelled()?;

        let engine = Arc::clone(&self.engine);
        let ast = Arc::clone(&self.ast);
        let agents = Arc::clone(&self.agents);
        let provider = Arc::clone(&self.provider);
        let hitl = Arc::clone(&self.hitl);
        let state = Arc::clone(&self.state);
        let rt = tokio::runtime::Handle::current();

        let outcome = tokio::task::block_in_place(move || {
            let invocation_scope = TactusScope::Custom(format!("invocation:{}", ctx.id));
            let ledger = ToolLedger::new();
            let mut agent_sessions = HashMap::new();
            let mut scope = RhaiScope::new();

            for decl in agents.iter() {
                let session = SessionId::new(format!("{}:{}", ctx.id, decl.name));
                agent_sessions.insert(decl.name.clone(), session.clone());

                let mut base = ToolRegistry::with_builtins();
                for tool in &decl.tools {
                    base.register(Arc::clone(tool));
                }
                let mut registry = ToolRegistry::new();
                for tool in base.iter() {
                    registry.register(Arc::new(
                        RecordingTool::new(Arc::clone(tool), ledger.clone(), decl.name.clone())
                            .with_invocation(ctx.clone()),
                    ));
                }

                let state_reader: Arc<dyn StateReader> =
                    Arc::new(StateReaderAdapter(Arc::clone(&state)));
                let op = ReactOperator::new(
                    DynProvider(Arc::clone(&provider)),
                    registry,
                    Box::new(SlidingWindow::new()),
                    HookRegistry::new(),
                    state_reader,
                    ReactConfig {
                        system_prompt: decl.system_prompt.clone(),
                        default_model: decl.default_model.clone().unwrap_or_default(),
                        default_max_tokens: decl.default_max_tokens,
                        default_max_turns: decl.default_max_turns,
                    },
                );
                let turn: Arc<dyn Turn> = Arc::new(op);

                scope.push_constant(
                    decl.name.as_str(),
                    AgentCap {
                        name: decl.name.clone(),
                        turn,
                        session,
                        state: Arc::clone(&state),
                        ctx: ctx.clone(),
                        rt: rt.clone(),
                        ordinal: Arc::new(Mutex::new(0)),
                    },
                );
            }

            scope.push_constant("Tool", ToolCap { ledger: ledger.clone() });
            scope.push_constant(
                "State",
                StateCap {
                    store: Arc::clone(&state),
                    scope: invocation_scope.clone(),
                    rt: rt.clone(),
                },
            );
            scope.push_constant(
                "Stage",
                StageCap {
                    store: Arc::clone(&state),
                    scope: invocation_scope.clone(),
                    ctx: ctx.clone(),
                    rt: rt.clone(),
                },
            );
            scope.push_constant("Log", LogCap { ctx: ctx.clone(), rt: rt.clone() });
            scope.push_constant(
                "Human",
                HumanCap {
                    hitl: Arc::clone(&hitl),
                    invocation: ctx.id.clone(),
                    rt: rt.clone(),
                },
            );
            scope.push_constant("Procedure", ProcedureCap { ctx: ctx.clone(), rt: rt.clone() });
            scope.push_constant("Iterations", IterationsCap { ctx: ctx.clone() });
            scope.push_constant(
                "Step",
                StepCap {
                    ctx: ctx.clone(),
                    rt: rt.clone(),
                },
            );
            scope.push_constant(
                "Session",
                SessionCap {
                    state: Arc::clone(&state),
                    sessions: agent_sessions,
                    rt: rt.clone(),
                },
            );
            scope.push_constant("Params", ParamsCap { params: ctx.params.clone() });

            engine.eval_ast_with_scope::<rhai::Dynamic>(&mut scope, &ast)
        });

        let dynamic = outcome
            .map_err(|e| TactusError::from(ScriptError::Runtime(e.to_string())))?;
        crate::convert::dynamic_to_json(dynamic).map_err(TactusError::from)
    }
}
