#![deny(missing_docs)]
//! I. Script Bridge — binds a Rhai script to the Agent/Tool/State/
//! Procedure/HITL primitives the rest of the workspace already implements.
//!
//! A script never talks to `tactus-agent-react`, `tactus-hitl`, or
//! `tactus-scheduler` directly. It sees eleven capability objects —
//! `Agent`, `Tool`, `State`, `Stage`, `Log`, `Human`, `Procedure`, `Step`,
//! `Iterations`, `Session`, `Params` — bound fresh into a Rhai `Scope` for
//! every invocation by [`ScriptEngine`] and [`bridge::ScriptProcedureBody`].
//! Everything a capability method does is a thin, synchronous-looking call
//! into the real async primitive, bridged with
//! `tokio::task::block_in_place`.
//!
//! ```text
//! script source ─▶ ScriptEngine::procedure ─▶ ScriptProcedureBody
//!                                                   │
//!                                          Scheduler::register/run
//!                                                   │
//!                                    InvocationHandle ──▶ capability objects
//! ```

pub mod bridge;
pub mod capabilities;
pub mod convert;
pub mod error;
pub mod hitl_dyn;
pub mod provider;
pub mod tool_log;

pub use bridge::{AgentDecl, ScriptEngine, ScriptProcedureBody};
pub use error::ScriptError;
pub use hitl_dyn::DynHitl;
pub use provider::{DynProvider, ScriptProvider};
pub use tool_log::{RecordingTool, ToolLedger};
