//! Errors raised while parsing, matching, or running scenarios.

use thiserror::Error;

/// Errors from the BDD harness.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BddError {
    /// The `.feature` text failed to parse.
    #[error("feature parse error: {0}")]
    Parse(String),

    /// A step's text matched no built-in pattern and no registered
    /// custom step.
    #[error("no step definition matches: {0}")]
    UnmatchedStep(String),

    /// A step matched but its captured arguments didn't coerce to what
    /// the step implementation expected.
    #[error("step argument error in {step}: {message}")]
    StepArgument {
        /// The step text that failed.
        step: String,
        /// Why the arguments were rejected.
        message: String,
    },

    /// An assertion a `Then`/`And` step made did not hold.
    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    /// Running the procedure under test failed.
    #[error("{0}")]
    Host(#[from] tactus_core::error::TactusError),

    /// Compiling the procedure's script failed.
    #[error("{0}")]
    Script(#[from] tactus_script::ScriptError),
}
