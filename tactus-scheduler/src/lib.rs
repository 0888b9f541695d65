#![deny(missing_docs)]
//! Unopinionated wiring kit for composing runnable Tactus procedures.
//!
//! This crate is intentionally "boring glue": it helps assemble and run
//! systems built from the `tactus_core` protocols without forcing a workflow DSL.
//!
//! Design goals (see `specs/06-composition-factory-and-glue.md`):
//! - register arbitrary agents/operators
//! - swap implementations via explicit selectors
//! - pluggable effect execution policy (WriteMemory/Delegate/Handoff/Signal)
//! - zero lock-in: callers can bypass defaults

mod kit;
mod procedure;
mod runner;

pub use kit::Kit;
pub use procedure::{
    InvocationHandle, ProcedureBody, ProcedureStatus, Scheduler, SchedulerError,
};
pub use runner::{
    EffectExecutor, ExecutionEvent, ExecutionTrace, KitError, LocalEffectExecutor,
    OrchestratedRunner,
};
