//! The scenario's mutable context — built up by `Given` steps, consumed
//! by the `When` step, read back by `Then` steps. Mirrors the "World"
//! every Rust Cucumber implementation threads through a scenario's
//! steps, scoped down to what mock-mode execution needs here.

use std::collections::HashMap;

use serde_json::Value;
use tactus_core::effect::Scope;
use tactus_hitl::MockHitlHandler;
use tactus_tool::MockToolRegistry;

use crate::mock_provider::ScriptedTurn;
use crate::outcome::ScenarioOutcome;

/// Everything a scenario's `Given` steps configure before the `When`
/// step runs the procedure, plus the outcome the `Then` steps assert
/// against once it has.
pub struct World {
    /// Name of the procedure definition under test.
    pub procedure: String,
    /// Parameters to run with, seeded from the definition's param
    /// defaults and overridden by `When` or explicit `Given` steps.
    pub params: Value,
    /// Scripted agent responses, consumed in order by the `MockProvider`.
    pub provider_script: Vec<ScriptedTurn>,
    /// Tool responses scripted for mock-mode tool calls.
    pub tool_responses: Vec<(String, Value, Value)>,
    /// The HITL handler mock-mode runs against.
    pub hitl: MockHitlHandler,
    /// State entries to seed before the procedure starts, keyed by
    /// scope and key.
    pub state_seed: Vec<(Scope, String, Value)>,
    /// Free-form values captured by `Given`/`When` steps for later
    /// `Then` assertions that don't fit the outcome shape directly
    /// (e.g. an expected result value parsed ahead of the run).
    pub notes: HashMap<String, Value>,
    /// Set once the `When` step has run the procedure.
    pub outcome: Option<ScenarioOutcome>,
}

impl World {
    /// A fresh scenario context for `procedure`, with no mocks configured
    /// yet and auto-approving HITL (the least surprising default, same
    /// as [`MockHitlHandler::default`]).
    pub fn new(procedure: impl Into<String>) -> Self {
        Self {
            procedure: procedure.into(),
            params: Value::Object(Default::default()),
            provider_script: Vec::new(),
            tool_responses: Vec::new(),
            hitl: MockHitlHandler::default(),
            state_seed: Vec::new(),
            notes: HashMap::new(),
            outcome: None,
        }
    }

    /// The outcome of the `When` step, or an assertion error if `Then`
    /// ran before `When` did (a malformed scenario).
    pub fn outcome(&self) -> Result<&ScenarioOutcome, crate::error::BddError> {
        self.outcome
            .as_ref()
            .ok_or_else(|| crate::error::BddError::AssertionFailed(
                "no procedure has run yet in this scenario".to_string(),
            ))
    }
}
