//! What a single scenario run produced, and the consistency fingerprint
//! `evaluate` compares across repeated runs of the same scenario.

use std::collections::BTreeSet;

use serde_json::Value;
use tactus_core::event::Event;
use tactus_tool::ToolCall;

/// Full record of one `test`/`evaluate` run of a procedure under mock
/// conditions: the final result, every tool call made, the invocation's
/// event trail, and the state keys left behind.
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    /// The procedure's return value, or its error message.
    pub result: Result<Value, String>,
    /// Every tool call made during the run, in call order.
    pub tool_calls: Vec<ToolCall>,
    /// The invocation's full event trail.
    pub events: Vec<Event>,
    /// Keys left in the invocation's state scope once the run finished.
    pub final_state_keys: Vec<String>,
    /// The last value `Stage.set` recorded, if any.
    pub stage: Option<String>,
    /// Number of ReAct turns recorded against the invocation.
    pub iterations: u32,
}

impl ScenarioOutcome {
    /// Whether the procedure completed successfully.
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    /// Whether `tool_name` was called at least once.
    pub fn tool_called(&self, tool_name: &str) -> bool {
        self.tool_calls.iter().any(|c| c.tool_name == tool_name)
    }

    /// The deterministic fingerprint `evaluate`'s consistency score
    /// groups runs by: the distinct set of tool names called, the
    /// finish status, and the set of state keys left behind. Argument
    /// values and call order are deliberately excluded — two runs that
    /// call the same tools in the same order but with different phrasing
    /// from a nondeterministic model are still "the same shape" outcome.
    pub fn fingerprint(&self) -> OutcomeFingerprint {
        OutcomeFingerprint {
            tool_names: self.tool_calls.iter().map(|c| c.tool_name.clone()).collect(),
            finish_status: match &self.result {
                Ok(_) => "completed".to_string(),
                Err(_) => "failed".to_string(),
            },
            final_state_keys: self.final_state_keys.iter().cloned().collect(),
        }
    }
}

/// The `(tool_call_names, finish_status, final_state_keys)` triple two
/// runs are compared on for consistency scoring.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct OutcomeFingerprint {
    tool_names: BTreeSet<String>,
    finish_status: String,
    final_state_keys: BTreeSet<String>,
}

/// Fraction of `outcomes` whose fingerprint matches the most common one.
/// `1.0` means every run produced the same shape of outcome; lower
/// values flag nondeterminism in the mocked agent/tool/state behavior.
pub fn consistency_score(outcomes: &[ScenarioOutcome]) -> f64 {
    if outcomes.is_empty() {
        return 1.0;
    }
    let mut counts: std::collections::HashMap<OutcomeFingerprint, usize> =
        std::collections::HashMap::new();
    for outcome in outcomes {
        *counts.entry(outcome.fingerprint()).or_insert(0) += 1;
    }
    let best = counts.values().copied().max().unwrap_or(0);
    best as f64 / outcomes.len() as f64
}
