//! `test <file> [--scenario S] [--mock] [--mock-config F] [--parallel|--no-parallel]`
//! — run a procedure's Gherkin specifications under mock conditions and
//! report pass/fail per scenario.
//!
//! The harness `tactus-bdd` builds is mock-mode end to end (§3's Tool
//! Call / HITL / provider primitives are all stood in for), so this verb
//! doesn't take a `--mock` toggle of its own to thread through — every
//! `test` run is a mock run by construction. `--mock-config F` (seeding a
//! definition's scenarios from an external fixture file) and
//! `--parallel`/`--no-parallel` (the harness already runs scenarios
//! concurrently via `futures::future::join_all`; serializing them is a
//! config knob a binary can add by calling [`test`] once per scenario
//! instead) are left to the binary that owns argument parsing.

use tactus_bdd::{BddHarness, ScenarioReport};
use tactus_core::definition::ProcedureDefinition;

use crate::error::CliError;

/// Run every scenario in `feature_source` against `definition` once, or —
/// if `scenario` is given — just the scenario with that exact name.
pub async fn test(
    definition: &ProcedureDefinition,
    feature_source: &str,
    scenario: Option<&str>,
) -> Result<Vec<ScenarioReport>, CliError> {
    let harness = BddHarness::new()?;
    let mut reports = harness.test(definition, feature_source).await?;
    if let Some(name) = scenario {
        reports.retain(|r| r.name == name);
    }
    Ok(reports)
}
