//! Errors raised while compiling or running a script.

use thiserror::Error;

/// Errors from the script bridge.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The Rhai source failed to parse/compile.
    #[error("script compile error: {0}")]
    Compile(String),

    /// The script raised an error, or a native call it made returned one
    /// that propagated up through `eval_ast_with_scope`.
    #[error("script runtime error: {0}")]
    Runtime(String),

    /// A value crossing the script/host boundary didn't convert cleanly
    /// (JSON <-> `rhai::Dynamic`).
    #[error("value conversion error: {0}")]
    Conversion(String),

    /// The script referenced an agent name that wasn't declared.
    #[error("no such agent: {0}")]
    UnknownAgent(String),

    /// Something below the bridge (scheduler, HITL, state) failed.
    #[error("{0}")]
    Host(#[from] tactus_core::error::TactusError),
}

impl From<ScriptError> for tactus_core::error::TactusError {
    fn from(e: ScriptError) -> Self {
        match e {
            ScriptError::Host(inner) => inner,
            other => tactus_core::error::TactusError::Internal(other.to_string()),
        }
    }
}
