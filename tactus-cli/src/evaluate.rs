//! `evaluate <file> [--runs N] [--workers W] [--scenario S] [--mock]` —
//! run a procedure's scenarios repeatedly and score how consistent the
//! outcomes are, per §8's S6 seed scenario.

use tactus_bdd::{BddHarness, ScenarioConsistency};
use tactus_core::definition::ProcedureDefinition;

use crate::error::CliError;

/// Evaluate every scenario in `feature_source`, or — if `scenario` is
/// given — just the one with that name. `runs`/`workers` override the
/// definition's own `evaluation` defaults when set; `None` falls back to
/// whatever the definition declares (10 runs / 4 workers if it declares
/// nothing at all).
pub async fn evaluate(
    definition: &ProcedureDefinition,
    feature_source: &str,
    runs: Option<u32>,
    workers: Option<u32>,
    scenario: Option<&str>,
) -> Result<Vec<ScenarioConsistency>, CliError> {
    let definition = if runs.is_some() || workers.is_some() {
        let mut evaluation = definition.evaluation.clone();
        if let Some(runs) = runs {
            evaluation.runs = runs;
        }
        if let Some(workers) = workers {
            evaluation.workers = workers;
        }
        let mut overridden = definition.clone();
        overridden.evaluation = evaluation;
        overridden
    } else {
        definition.clone()
    };

    let harness = BddHarness::new()?;
    let report = harness.evaluate(&definition, feature_source).await?;
    let mut scenarios = report.scenarios;
    if let Some(name) = scenario {
        scenarios.retain(|s| s.name == name);
    }
    Ok(scenarios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn demo_definition() -> ProcedureDefinition {
        serde_json::from_value(json!({"name": "demo", "script": "42"})).unwrap()
    }

    const FEATURE: &str = r#"
Feature: demo

  Scenario: deterministic
    When the procedure runs
    Then it should succeed
"#;

    #[tokio::test]
    async fn scores_a_deterministic_script_as_fully_consistent() {
        let scenarios = evaluate(&demo_definition(), FEATURE, Some(5), Some(2), None)
            .await
            .unwrap();
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].runs, 5);
        assert_eq!(scenarios[0].score, 1.0);
    }
}
