//! The capability objects a script sees: `Agent`, `Tool`, `State`, `Stage`,
//! `Log`, `Human`, `Procedure`, `Step`, `Iterations`, `Session`, `Params`.
//!
//! Every instance here is bound to exactly one invocation — built fresh by
//! [`crate::bridge::ScriptBridge`] each time a procedure runs, never shared
//! as a process-wide singleton, so the BDD harness can run many `evaluate`
//! invocations of the same script concurrently without their `State`/`Tool`
//! ledgers bleeding into each other.
//!
//! Rhai is synchronous. Every method here that needs to call an async host
//! primitive (a turn, a state read, a HITL request, a checkpoint) blocks on
//! it with `self.rt.block_on(..)` — sound because the caller
//! (`ScriptProcedureBody::run`) always reaches this code from inside
//! `tokio::task::block_in_place`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rhai::{Dynamic, EvalAltResult, FnPtr, NativeCallContext};
use serde_json::{json, Value};

use tactus_core::content::Content;
use tactus_core::duration::DurationMs;
use tactus_core::effect::Scope as TactusScope;
use tactus_core::event::{AgentTurnStage, EventKind};
use tactus_core::id::{InvocationId, SessionId};
use tactus_core::state::StateStore;
use tactus_core::turn::{ExitReason, Turn, TriggerType, TurnConfig, TurnInput};
use tactus_agent_turn::convert::{content_to_user_message, content_to_parts};
use tactus_agent_turn::types::ProviderMessage;
use tactus_scheduler::procedure::InvocationHandle;

use crate::convert::json_to_dynamic;
use crate::hitl_dyn::DynHitl;
use crate::tool_log::ToolLedger;

fn rerr(msg: impl std::fmt::Display) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(msg.to_string().into(), rhai::Position::NONE))
}

fn to_dyn(value: Value) -> Result<Dynamic, Box<EvalAltResult>> {
    json_to_dynamic(&value).map_err(rerr)
}

fn tool_call_json(call: &tactus_tool::ToolCall) -> Value {
    json!({
        "tool": call.tool_name,
        "arguments": call.arguments,
        "ok": call.succeeded(),
        "result": match &call.result {
            Ok(v) => v.clone(),
            Err(e) => json!(e),
        },
        "agent": call.agent_name,
        "timestamp_ms": call.timestamp_ms,
    })
}

/// `Agent` — one declared agent, wrapping the Turn primitive it was built
/// from plus the session key its history lives under.
#[derive(Clone)]
pub struct AgentCap {
    pub(crate) name: String,
    pub(crate) turn: Arc<dyn Turn>,
    pub(crate) session: SessionId,
    pub(crate) state: Arc<dyn StateStore>,
    pub(crate) ctx: InvocationHandle,
    pub(crate) rt: tokio::runtime::Handle,
    pub(crate) ordinal: Arc<Mutex<u64>>,
}

/// `TurnResult` as journalled per §4.E step 5 — the checkpointed value a
/// replayed `Agent.turn()` call returns without re-invoking the provider.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct JournalledTurn {
    text: String,
    exit_reason: String,
    complete: bool,
    turns_used: u32,
    tokens_in: u64,
    tokens_out: u64,
    cost: String,
}

impl AgentCap {
    fn run_turn(&mut self, message: String, config: Option<TurnConfig>) -> Result<Dynamic, Box<EvalAltResult>> {
        self.ctx.check_cancelled().map_err(rerr)?;

        let step_id = {
            let mut ordinal = self.ordinal.lock().unwrap();
            let id = format!("agent_turn:{}#{}", self.name, *ordinal);
            *ordinal += 1;
            id
        };
        let storage = Arc::clone(self.ctx.storage());
        let invocation = self.ctx.id.clone();

        let recorded: Option<JournalledTurn> = {
            let storage = Arc::clone(&storage);
            let invocation = invocation.clone();
            let step_id = step_id.clone();
            self.rt
                .block_on(async move { storage.read_checkpoint(&invocation, &step_id).await })
                .map_err(rerr)?
                .and_then(|v| serde_json::from_value(v).ok())
        };

        if let Some(journalled) = recorded {
            self.ctx.record_turn();
            let ctx_handle = self.ctx.clone();
            let agent = self.name.clone();
            self.rt.block_on(async move {
                let _ = ctx_handle
                    .emit(EventKind::AgentTurn { agent: agent.clone(), stage: AgentTurnStage::Started })
                    .await;
                let _ = ctx_handle
                    .emit(EventKind::AgentTurn { agent, stage: AgentTurnStage::Responded })
                    .await;
            });
            return to_dyn(serde_json::to_value(&journalled).unwrap_or(Value::Null));
        }

        let ctx_handle = self.ctx.clone();
        let agent = self.name.clone();
        self.rt.block_on(
            ctx_handle.emit(EventKind::AgentTurn { agent, stage: AgentTurnStage::Started }),
        ).map_err(rerr)?;

        let message_content = Content::text(message);
        let user_msg = content_to_user_message(&message_content);
        let input = TurnInput {
            message: message_content,
            trigger: TriggerType::User,
            session: Some(self.session.clone()),
            config,
            metadata: Value::Null,
        };
        let turn = Arc::clone(&self.turn);
        let output = self
            .rt
            .block_on(turn.execute(input))
            .map_err(|e| rerr(tactus_core::error::TactusError::from(e)))?;

        self.ctx.record_turn();

        // `ReactOperator::assemble_context` reads history but never writes it
        // back — the bridge owns session persistence so repeated `turn()`
        // calls against the same agent see a growing conversation.
        let assistant = ProviderMessage {
            role: tactus_agent_turn::types::Role::Assistant,
            content: content_to_parts(&output.message),
        };
        let scope = TactusScope::Session(self.session.clone());
        let state = Arc::clone(&self.state);
        let append = async move {
            let mut history: Vec<ProviderMessage> = match state.read(&scope, "messages").await {
                Ok(Some(v)) => serde_json::from_value(v).unwrap_or_default(),
                _ => Vec::new(),
            };
            history.push(user_msg);
            history.push(assistant);
            let _ = state
                .write(&scope, "messages", serde_json::to_value(&history).unwrap_or(Value::Null))
                .await;
        };
        self.rt.block_on(append);

        let complete = matches!(output.exit_reason, ExitReason::Complete);
        let journalled = JournalledTurn {
            text: output.message.as_text().unwrap_or_default().to_string(),
            exit_reason: format!("{:?}", output.exit_reason),
            complete,
            turns_used: output.metadata.turns_used,
            tokens_in: output.metadata.tokens_in,
            tokens_out: output.metadata.tokens_out,
            cost: output.metadata.cost.to_string(),
        };
        let value = serde_json::to_value(&journalled).unwrap_or(Value::Null);

        let ctx_handle = self.ctx.clone();
        let agent = self.name.clone();
        let write_value = value.clone();
        self.rt.block_on(async move {
            storage.write_checkpoint(&invocation, &step_id, write_value).await.map_err(rerr)?;
            ctx_handle
                .emit(EventKind::AgentTurn { agent, stage: AgentTurnStage::Responded })
                .await
                .map_err(rerr)
        })?;

        to_dyn(value)
    }

    fn history_json(&self) -> Value {
        let scope = TactusScope::Session(self.session.clone());
        let state = Arc::clone(&self.state);
        let fut = async move { state.read(&scope, "messages").await };
        match self.rt.block_on(fut) {
            Ok(Some(v)) => v,
            _ => Value::Array(vec![]),
        }
    }
}

/// `Tool` — read-only view over the shared cross-agent call ledger.
#[derive(Clone)]
pub struct ToolCap {
    pub(crate) ledger: ToolLedger,
}

/// `State` — scoped key/value memory a script reads and writes directly.
#[derive(Clone)]
pub struct StateCap {
    pub(crate) store: Arc<dyn StateStore>,
    pub(crate) scope: TactusScope,
    pub(crate) rt: tokio::runtime::Handle,
}

impl StateCap {
    fn get_inner(&self, key: &str) -> Result<Dynamic, Box<EvalAltResult>> {
        let store = Arc::clone(&self.store);
        let scope = self.scope.clone();
        let key = key.to_string();
        let value = self
            .rt
            .block_on(async move { store.read(&scope, &key).await })
            .map_err(|e| rerr(e))?;
        to_dyn(value.unwrap_or(Value::Null))
    }

    fn set_inner(&self, key: &str, value: Dynamic) -> Result<(), Box<EvalAltResult>> {
        let json = crate::convert::dynamic_to_json(value).map_err(rerr)?;
        let store = Arc::clone(&self.store);
        let scope = self.scope.clone();
        let key = key.to_string();
        self.rt
            .block_on(async move { store.write(&scope, &key, json).await })
            .map_err(rerr)
    }
}

/// `Stage` — the current named stage of a multi-stage procedure, tracked as
/// a well-known key plus an event so the invocation's audit trail records
/// every transition.
#[derive(Clone)]
pub struct StageCap {
    pub(crate) store: Arc<dyn StateStore>,
    pub(crate) scope: TactusScope,
    pub(crate) ctx: InvocationHandle,
    pub(crate) rt: tokio::runtime::Handle,
}

const STAGE_KEY: &str = "__stage__";

/// `Log` — emits an event against the invocation's audit trail plus a
/// `tracing` record, for scripts that want checkpoints visible in the
/// event log without going through `State`.
#[derive(Clone)]
pub struct LogCap {
    pub(crate) ctx: InvocationHandle,
    pub(crate) rt: tokio::runtime::Handle,
}

/// `Human` — HITL requests: `approve`, `input`, `review`.
#[derive(Clone)]
pub struct HumanCap {
    pub(crate) hitl: Arc<dyn DynHitl>,
    pub(crate) invocation: InvocationId,
    pub(crate) rt: tokio::runtime::Handle,
}

impl HumanCap {
    fn ask(
        &self,
        kind: &str,
        message: String,
        context: Value,
        timeout: Option<DurationMs>,
        default: Option<Value>,
    ) -> Result<Dynamic, Box<EvalAltResult>> {
        let hitl = Arc::clone(&self.hitl);
        let invocation = self.invocation.clone();
        let kind = kind.to_string();
        let fut = async move {
            match kind.as_str() {
                "approve" => hitl.approve(&invocation, message, context, timeout, default).await,
                "input" => hitl.input(&invocation, message, context, timeout, default).await,
                _ => hitl.review(&invocation, message, context, timeout, default).await,
            }
        };
        let value = self
            .rt
            .block_on(fut)
            .map_err(|e| rerr(tactus_core::error::TactusError::from(e)))?;
        to_dyn(value)
    }
}

/// Parses the `{message, context, timeout, default}` map form `Human.approve`/
/// `input`/`review` accept — `timeout` is wall-clock seconds per §5, not
/// milliseconds, matching every other timeout surfaced to a script.
fn parse_human_options(
    map: &rhai::Map,
) -> Result<(String, Value, Option<DurationMs>, Option<Value>), Box<EvalAltResult>> {
    let message = map
        .get("message")
        .cloned()
        .and_then(|v| v.try_cast::<String>())
        .ok_or_else(|| rerr("Human.*: options map requires a string 'message'"))?;
    let context = match map.get("context").cloned() {
        Some(v) => crate::convert::dynamic_to_json(v).map_err(rerr)?,
        None => Value::Null,
    };
    let timeout = map
        .get("timeout")
        .cloned()
        .and_then(|v| v.try_cast::<i64>())
        .map(|secs| DurationMs::from_secs(secs.max(0) as u64));
    let default = match map.get("default").cloned() {
        Some(v) => Some(crate::convert::dynamic_to_json(v).map_err(rerr)?),
        None => None,
    };
    Ok((message, context, timeout, default))
}

/// `Procedure` — `run`/`spawn`/`status`/`wait`/`wait_all`/`result` over
/// sub-procedures, delegating straight to the scheduler's
/// [`InvocationHandle`].
#[derive(Clone)]
pub struct ProcedureCap {
    pub(crate) ctx: InvocationHandle,
    pub(crate) rt: tokio::runtime::Handle,
}

/// `Iterations` — the running invocation's own turn counter.
#[derive(Clone)]
pub struct IterationsCap {
    pub(crate) ctx: InvocationHandle,
}

/// `Step` — checkpointed, idempotent side-effecting work. The step_id is
/// `name` alone, so calling `Step.run(name, fn)` more than once in the same
/// invocation — whether from a loop or from two different callsites —
/// replays the first recorded value instead of re-running `fn`, per the
/// checkpoint read-through pattern `tactus-hitl` already uses for HITL
/// requests.
#[derive(Clone)]
pub struct StepCap {
    pub(crate) ctx: InvocationHandle,
    pub(crate) rt: tokio::runtime::Handle,
}

impl StepCap {
    fn step_id(&self, name: &str) -> String {
        step_id_for_name(name)
    }
}

fn step_id_for_name(name: &str) -> String {
    format!("step:{name}")
}

/// `Session` — the same conversation history `Agent.turn` appends to,
/// addressable by agent name for scripts that want to inspect or seed it
/// directly rather than only through `Agent.history`.
#[derive(Clone)]
pub struct SessionCap {
    pub(crate) state: Arc<dyn StateStore>,
    pub(crate) sessions: HashMap<String, SessionId>,
    pub(crate) rt: tokio::runtime::Handle,
}

/// `Params` — the invocation's resolved input parameters, read-only.
#[derive(Clone)]
pub struct ParamsCap {
    pub(crate) params: Value,
}

/// Register every capability type's methods on a fresh Rhai engine. Called
/// once per [`crate::ScriptEngine`]; the capability *instances* are pushed
/// into a per-invocation `Scope` by [`crate::bridge::ScriptBridge`].
pub fn register_all(engine: &mut rhai::Engine) {
    engine
        .register_type_with_name::<AgentCap>("Agent")
        .register_fn("turn", |this: &mut AgentCap, message: String| {
            this.run_turn(message, None)
        })
        .register_fn("turn", |this: &mut AgentCap, message: String, config: rhai::Map| {
            let config = parse_turn_config(config);
            this.run_turn(message, Some(config))
        })
        .register_fn("history", |this: &mut AgentCap| -> Result<Dynamic, Box<EvalAltResult>> {
            to_dyn(this.history_json())
        })
        .register_fn("clear_session", |this: &mut AgentCap| -> Result<(), Box<EvalAltResult>> {
            let scope = TactusScope::Session(this.session.clone());
            let state = Arc::clone(&this.state);
            this.rt
                .block_on(async move { state.delete(&scope, "messages").await })
                .map_err(rerr)
        })
        .register_get("name", |this: &mut AgentCap| this.name.clone());

    engine
        .register_type_with_name::<ToolCap>("Tool")
        .register_fn("called", |this: &mut ToolCap, name: &str| this.ledger.called(name))
        .register_fn("last_call", |this: &mut ToolCap, name: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            match this.ledger.last_call(name) {
                Some(call) => to_dyn(tool_call_json(&call)),
                None => Ok(Dynamic::UNIT),
            }
        })
        .register_fn("calls_of", |this: &mut ToolCap, name: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            let calls: Vec<Value> = this.ledger.calls_of(name).iter().map(tool_call_json).collect();
            to_dyn(Value::Array(calls))
        });

    engine
        .register_type_with_name::<StateCap>("State")
        .register_fn("get", |this: &mut StateCap, key: &str| this.get_inner(key))
        .register_fn("set", |this: &mut StateCap, key: &str, value: Dynamic| this.set_inner(key, value))
        .register_fn("has", |this: &mut StateCap, key: &str| -> Result<bool, Box<EvalAltResult>> {
            Ok(!this.get_inner(key)?.is_unit())
        })
        .register_fn("delete", |this: &mut StateCap, key: &str| -> Result<(), Box<EvalAltResult>> {
            let store = Arc::clone(&this.store);
            let scope = this.scope.clone();
            let key = key.to_string();
            this.rt
                .block_on(async move { store.delete(&scope, &key).await })
                .map_err(rerr)
        })
        .register_fn("incr", |this: &mut StateCap, key: &str| this.incr(key, 1))
        .register_fn("incr", |this: &mut StateCap, key: &str, delta: i64| this.incr(key, delta));

    engine
        .register_type_with_name::<StageCap>("Stage")
        .register_fn("set", |this: &mut StageCap, name: &str| -> Result<(), Box<EvalAltResult>> {
            let store = Arc::clone(&this.store);
            let scope = this.scope.clone();
            let stage = name.to_string();
            let ctx = this.ctx.clone();
            this.rt.block_on(async move {
                store.write(&scope, STAGE_KEY, json!(stage)).await.map_err(rerr)?;
                ctx.emit(tactus_core::event::EventKind::StageAdvanced { stage: stage.clone() })
                    .await
                    .map_err(rerr)
            })
        })
        .register_fn("get", |this: &mut StageCap| -> Result<String, Box<EvalAltResult>> {
            let store = Arc::clone(&this.store);
            let scope = this.scope.clone();
            let value = this
                .rt
                .block_on(async move { store.read(&scope, STAGE_KEY).await })
                .map_err(rerr)?;
            Ok(value.and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default())
        });

    engine
        .register_type_with_name::<LogCap>("Log")
        .register_fn("info", |this: &mut LogCap, message: &str| this.log("info", message))
        .register_fn("warn", |this: &mut LogCap, message: &str| this.log("warn", message))
        .register_fn("error", |this: &mut LogCap, message: &str| this.log("error", message))
        .register_fn("debug", |this: &mut LogCap, message: &str| this.log("debug", message));

    engine
        .register_type_with_name::<HumanCap>("Human")
        .register_fn("approve", |this: &mut HumanCap, message: &str| {
            this.ask("approve", message.to_string(), Value::Null, None, None)
        })
        .register_fn(
            "approve",
            |this: &mut HumanCap, message: &str, context: Dynamic| -> Result<Dynamic, Box<EvalAltResult>> {
                let context = crate::convert::dynamic_to_json(context).map_err(rerr)?;
                this.ask("approve", message.to_string(), context, None, None)
            },
        )
        .register_fn("input", |this: &mut HumanCap, message: &str| {
            this.ask("input", message.to_string(), Value::Null, None, None)
        })
        .register_fn(
            "input",
            |this: &mut HumanCap, message: &str, context: Dynamic| -> Result<Dynamic, Box<EvalAltResult>> {
                let context = crate::convert::dynamic_to_json(context).map_err(rerr)?;
                this.ask("input", message.to_string(), context, None, None)
            },
        )
        .register_fn(
            "review",
            |this: &mut HumanCap, message: &str, value: Dynamic| -> Result<Dynamic, Box<EvalAltResult>> {
                let value = crate::convert::dynamic_to_json(value).map_err(rerr)?;
                this.ask("review", message.to_string(), Value::Null, None, Some(value))
            },
        )
        .register_fn(
            "approve",
            |this: &mut HumanCap, options: rhai::Map| -> Result<Dynamic, Box<EvalAltResult>> {
                let (message, context, timeout, default) = parse_human_options(&options)?;
                this.ask("approve", message, context, timeout, default)
            },
        )
        .register_fn(
            "input",
            |this: &mut HumanCap, options: rhai::Map| -> Result<Dynamic, Box<EvalAltResult>> {
                let (message, context, timeout, default) = parse_human_options(&options)?;
                this.ask("input", message, context, timeout, default)
            },
        )
        .register_fn(
            "review",
            |this: &mut HumanCap, options: rhai::Map| -> Result<Dynamic, Box<EvalAltResult>> {
                let (message, context, timeout, mut default) = parse_human_options(&options)?;
                if default.is_none() {
                    default = match options.get("value").cloned() {
                        Some(v) => Some(crate::convert::dynamic_to_json(v).map_err(rerr)?),
                        None => None,
                    };
                }
                this.ask("review", message, context, timeout, default)
            },
        );

    engine
        .register_type_with_name::<ProcedureCap>("Procedure")
        .register_fn("run", |this: &mut ProcedureCap, name: &str, params: Dynamic| -> Result<Dynamic, Box<EvalAltResult>> {
            let params = crate::convert::dynamic_to_json(params).map_err(rerr)?;
            let ctx = this.ctx.clone();
            let name = name.to_string();
            let result = this
                .rt
                .block_on(async move { ctx.run_child(&name, params).await })
                .map_err(rerr)?;
            to_dyn(result)
        })
        .register_fn("spawn", |this: &mut ProcedureCap, name: &str, params: Dynamic| -> Result<String, Box<EvalAltResult>> {
            let params = crate::convert::dynamic_to_json(params).map_err(rerr)?;
            let ctx = this.ctx.clone();
            let name = name.to_string();
            let id = this
                .rt
                .block_on(async move { ctx.spawn(&name, params).await })
                .map_err(rerr)?;
            Ok(id.to_string())
        })
        .register_fn("wait", |this: &mut ProcedureCap, id: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            let ctx = this.ctx.clone();
            let id = tactus_core::id::InvocationId::new(id);
            let outcome = this
                .rt
                .block_on(async move { ctx.wait(&id, None).await })
                .map_err(rerr)?;
            match outcome {
                None => Ok(Dynamic::UNIT),
                Some(Ok(value)) => to_dyn(value),
                Some(Err(e)) => Err(rerr(e)),
            }
        })
        .register_fn("wait_all", |this: &mut ProcedureCap, ids: rhai::Array| -> Result<(), Box<EvalAltResult>> {
            let ctx = this.ctx.clone();
            let ids: Vec<_> = ids
                .into_iter()
                .map(|d| tactus_core::id::InvocationId::new(d.to_string()))
                .collect();
            this.rt
                .block_on(async move { ctx.wait_all(&ids).await })
                .map_err(rerr)
        })
        .register_fn("result", |this: &mut ProcedureCap, id: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            let ctx = this.ctx.clone();
            let id = tactus_core::id::InvocationId::new(id);
            let value = this
                .rt
                .block_on(async move { ctx.result(&id).await })
                .map_err(rerr)?;
            to_dyn(value)
        })
        .register_fn("status", |this: &mut ProcedureCap, id: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            let ctx = this.ctx.clone();
            let id = tactus_core::id::InvocationId::new(id);
            let status = this
                .rt
                .block_on(async move { ctx.status(&id).await })
                .map_err(rerr)?;
            to_dyn(json!({
                "status": format!("{:?}", status.status),
                "iterations": status.iterations,
                "children": status.children.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
            }))
        });

    engine
        .register_type_with_name::<IterationsCap>("Iterations")
        .register_fn("current", |this: &mut IterationsCap| this.ctx.iterations() as i64)
        .register_fn("exceeded", |this: &mut IterationsCap, n: i64| {
            this.ctx.iterations_exceeded(n.max(0) as u32)
        });

    engine
        .register_type_with_name::<StepCap>("Step")
        .register_fn(
            "run",
            |ctx: NativeCallContext, this: &mut StepCap, name: &str, callback: FnPtr| -> Result<Dynamic, Box<EvalAltResult>> {
                this.ctx.check_cancelled().map_err(rerr)?;
                let step_id = this.step_id(name);
                let storage = Arc::clone(this.ctx.storage());
                let invocation = this.ctx.id.clone();
                let recorded = {
                    let storage = Arc::clone(&storage);
                    let invocation = invocation.clone();
                    let step_id = step_id.clone();
                    this.rt
                        .block_on(async move { storage.read_checkpoint(&invocation, &step_id).await })
                        .map_err(rerr)?
                };
                if let Some(value) = recorded {
                    let ctx_handle = this.ctx.clone();
                    let step_id = step_id.clone();
                    this.rt.block_on(async move {
                        let _ = ctx_handle
                            .emit(tactus_core::event::EventKind::CheckpointHit { step_id })
                            .await;
                    });
                    return to_dyn(value);
                }

                let result: Dynamic = callback.call_within_context(&ctx, ())?;
                let value = crate::convert::dynamic_to_json(result.clone()).map_err(rerr)?;
                let ctx_handle = this.ctx.clone();
                let write_step_id = step_id.clone();
                let write_value = value.clone();
                this.rt.block_on(async move {
                    storage
                        .write_checkpoint(&invocation, &write_step_id, write_value)
                        .await
                        .map_err(rerr)?;
                    ctx_handle
                        .emit(tactus_core::event::EventKind::CheckpointMiss { step_id: write_step_id })
                        .await
                        .map_err(rerr)
                })?;
                Ok(result)
            },
        );

    engine
        .register_type_with_name::<SessionCap>("Session")
        .register_fn("history", |this: &mut SessionCap, agent: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            let session = this
                .sessions
                .get(agent)
                .cloned()
                .ok_or_else(|| rerr(format!("no such agent: {agent}")))?;
            let scope = TactusScope::Session(session);
            let state = Arc::clone(&this.state);
            let value = this
                .rt
                .block_on(async move { state.read(&scope, "messages").await })
                .map_err(rerr)?;
            to_dyn(value.unwrap_or(Value::Array(vec![])))
        })
        .register_fn("clear", |this: &mut SessionCap, agent: &str| -> Result<(), Box<EvalAltResult>> {
            let session = this
                .sessions
                .get(agent)
                .cloned()
                .ok_or_else(|| rerr(format!("no such agent: {agent}")))?;
            let scope = TactusScope::Session(session);
            let state = Arc::clone(&this.state);
            this.rt
                .block_on(async move { state.delete(&scope, "messages").await })
                .map_err(rerr)
        });

    engine
        .register_type_with_name::<ParamsCap>("Params")
        .register_fn("get", |this: &mut ParamsCap, key: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            to_dyn(this.params.get(key).cloned().unwrap_or(Value::Null))
        })
        .register_fn("get_or", |this: &mut ParamsCap, key: &str, default: Dynamic| -> Result<Dynamic, Box<EvalAltResult>> {
            match this.params.get(key) {
                Some(v) if !v.is_null() => to_dyn(v.clone()),
                _ => Ok(default),
            }
        })
        .register_fn("all", |this: &mut ParamsCap| -> Result<Dynamic, Box<EvalAltResult>> {
            to_dyn(this.params.clone())
        });
}

impl StateCap {
    fn incr(&self, key: &str, delta: i64) -> Result<i64, Box<EvalAltResult>> {
        let store = Arc::clone(&self.store);
        let scope = self.scope.clone();
        let key = key.to_string();
        self.rt
            .block_on(async move {
                let current = store
                    .read(&scope, &key)
                    .await?
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0);
                let next = current + delta;
                store.write(&scope, &key, json!(next)).await?;
                Ok::<_, tactus_core::error::StateError>(next)
            })
            .map_err(rerr)
    }
}

impl LogCap {
    fn log(&self, level: &str, message: &str) -> Result<(), Box<EvalAltResult>> {
        match level {
            "info" => tracing::info!("{message}"),
            "warn" => tracing::warn!("{message}"),
            "error" => tracing::error!("{message}"),
            _ => tracing::debug!("{message}"),
        }
        let data = json!({"level": level, "message": message});
        let ctx = self.ctx.clone();
        self.rt.block_on(async move {
            ctx.emit(tactus_core::event::EventKind::Custom {
                event_type: "script_log".to_string(),
                data,
            })
            .await
            .map_err(rerr)
        })
    }
}

fn parse_turn_config(map: rhai::Map) -> TurnConfig {
    let mut config = TurnConfig::default();
    if let Some(v) = map.get("max_turns") {
        config.max_turns = v.clone().try_cast::<i64>().map(|n| n.max(0) as u32);
    }
    if let Some(v) = map.get("model") {
        config.model = v.clone().try_cast::<String>();
    }
    if let Some(v) = map.get("system_addendum") {
        config.system_addendum = v.clone().try_cast::<String>();
    }
    if let Some(v) = map.get("allowed_tools") {
        if let Some(arr) = v.clone().try_cast::<rhai::Array>() {
            config.allowed_tools = Some(arr.into_iter().map(|d| d.to_string()).collect());
        }
    }
    config
}
