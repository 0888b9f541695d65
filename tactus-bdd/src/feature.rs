//! Parses a procedure's `specifications` block into scenarios this crate
//! can run, using the `gherkin` crate for the actual Gherkin grammar.
//!
//! Everything past this module works against [`Feature`]/[`Scenario`]/
//! [`Step`] — our own, minimal shape — rather than `gherkin`'s types
//! directly, so a future parser swap only touches [`parse`].

use crate::error::BddError;

/// One `Given`/`When`/`Then`/`And`/`But` line. `And`/`But` are folded
/// into whichever of `Given`/`When`/`Then` precedes them, matching how a
/// human reads a scenario aloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKeyword {
    /// Establishes scenario preconditions (mock configuration).
    Given,
    /// Triggers the behavior under test (runs the procedure).
    When,
    /// Asserts an outcome.
    Then,
}

/// A single step line, already normalized to one of the three keywords.
#[derive(Debug, Clone)]
pub struct Step {
    /// Which of `Given`/`When`/`Then` this step behaves as.
    pub keyword: StepKeyword,
    /// The step's text, with the leading keyword removed.
    pub text: String,
}

/// One scenario: a name plus its ordered steps.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Scenario name, as written after `Scenario:`.
    pub name: String,
    /// Steps in source order.
    pub steps: Vec<Step>,
}

/// A parsed `.feature` document: a name plus its scenarios.
#[derive(Debug, Clone)]
pub struct Feature {
    /// Feature name, as written after `Feature:`.
    pub name: String,
    /// Scenarios declared in the feature.
    pub scenarios: Vec<Scenario>,
}

/// Parse Gherkin `.feature` text into our scenario model.
pub fn parse(source: &str) -> Result<Feature, BddError> {
    let env = gherkin::GherkinEnv::default();
    let parsed = gherkin::Feature::parse(source, env).map_err(|e| BddError::Parse(e.to_string()))?;

    let scenarios = parsed
        .scenarios
        .iter()
        .map(|s| Scenario {
            name: s.name.clone(),
            steps: normalize_steps(&s.steps),
        })
        .collect();

    Ok(Feature {
        name: parsed.name,
        scenarios,
    })
}

fn normalize_steps(steps: &[gherkin::Step]) -> Vec<Step> {
    let mut last_keyword = StepKeyword::Given;
    steps
        .iter()
        .map(|s| {
            let keyword = match s.ty {
                gherkin::StepType::Given => StepKeyword::Given,
                gherkin::StepType::When => StepKeyword::When,
                gherkin::StepType::Then => StepKeyword::Then,
            };
            last_keyword = keyword;
            Step {
                keyword: last_keyword,
                text: s.value.clone(),
            }
        })
        .collect()
}
