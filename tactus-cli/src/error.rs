//! The error type every verb in this crate returns.

use thiserror::Error;

/// Errors a CLI verb can return. A binary built on this crate maps these
/// to the exit codes and messages §7 of the runtime's error taxonomy
/// describes ("CLI prints a one-line summary plus the full error").
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CliError {
    /// The definition file's text wasn't valid JSON, or didn't match
    /// `ProcedureDefinition`'s shape.
    #[error("malformed procedure definition: {0}")]
    MalformedDefinition(String),

    /// A structural problem `validate` can catch without running
    /// anything: duplicate names, an agent referencing an undeclared
    /// tool, and the like.
    #[error("validation error: {0}")]
    Validation(String),

    /// The procedure's script failed to compile.
    #[error("script error: {0}")]
    Script(#[from] tactus_script::ScriptError),

    /// Scheduling or storage failed before or during the run.
    #[error("scheduler error: {0}")]
    Scheduler(#[from] tactus_scheduler::procedure::SchedulerError),

    /// The invocation itself raised an error (the runtime's own taxonomy).
    #[error("{0}")]
    Host(#[from] tactus_core::error::TactusError),

    /// A required caller-supplied parameter was missing and had no default.
    #[error("missing required parameter(s): {0}")]
    MissingParams(String),

    /// An agent declared a tool name this deployment didn't supply an
    /// implementation for.
    #[error("agent {agent:?} references undeclared tool {tool:?}")]
    UnknownTool {
        /// The agent that declared the tool.
        agent: String,
        /// The tool name that had no registered implementation.
        tool: String,
    },

    /// The BDD harness (`test`/`evaluate`) failed before it could produce
    /// a report — a malformed `.feature` document, typically.
    #[error("bdd harness error: {0}")]
    Bdd(#[from] tactus_bdd::BddError),
}
