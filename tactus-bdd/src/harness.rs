//! The public entry point: parse a `.feature` document, run its scenarios
//! against a procedure definition under mock conditions, and report either
//! pass/fail (`test`) or a consistency score per scenario (`evaluate`).

use std::sync::Arc;

use tactus_core::definition::ProcedureDefinition;

use crate::error::BddError;
use crate::feature::{self, Scenario, StepKeyword};
use crate::matcher::StepRegistry;
use crate::outcome::{consistency_score, ScenarioOutcome};
use crate::scenario::World;

/// Outcome of running one scenario under `test`.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    /// The scenario's name, as written in the `.feature` file.
    pub name: String,
    /// `None` if every step ran and every assertion held.
    pub error: Option<String>,
    /// The run's outcome, if the procedure got to run at all (a step
    /// argument error or an unmatched step never reaches it).
    pub outcome: Option<ScenarioOutcome>,
}

impl ScenarioReport {
    /// Whether the scenario passed.
    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-scenario consistency result from `evaluate`.
#[derive(Debug, Clone)]
pub struct ScenarioConsistency {
    /// The scenario's name.
    pub name: String,
    /// How many runs actually completed (may be less than the
    /// configured run count if a step itself errored on some run).
    pub runs: u32,
    /// Fraction of `runs` whose outcome fingerprint matched the most
    /// common one.
    pub score: f64,
    /// The threshold `score` was checked against, if the procedure
    /// configured one.
    pub min_consistency: Option<f64>,
}

impl ScenarioConsistency {
    /// Whether `score` meets the configured threshold (any score passes
    /// when the procedure didn't configure one).
    pub fn passed(&self) -> bool {
        self.score >= self.min_consistency.unwrap_or(0.0)
    }
}

/// Full result of an `evaluate` run.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    /// Per-scenario consistency results.
    pub scenarios: Vec<ScenarioConsistency>,
}

impl EvaluationReport {
    /// Whether every scenario met its consistency threshold.
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(ScenarioConsistency::passed)
    }
}

/// Runs `.feature` scenarios against a [`ProcedureDefinition`] under mock
/// conditions. Built with the built-in step library already registered;
/// [`BddHarness::register`] adds caller-specific steps on top.
#[derive(Clone)]
pub struct BddHarness {
    steps: Arc<StepRegistry>,
}

impl BddHarness {
    /// A harness with only the built-in step library registered.
    pub fn new() -> Result<Self, BddError> {
        let mut steps = StepRegistry::new();
        crate::steps::register_builtins(&mut steps)?;
        Ok(Self {
            steps: Arc::new(steps),
        })
    }

    /// Build a harness with caller-supplied steps registered alongside the
    /// built-ins (built-ins first, so a caller step with the same pattern
    /// text shadows it).
    pub fn with_steps(
        extra: impl FnOnce(&mut StepRegistry) -> Result<(), BddError>,
    ) -> Result<Self, BddError> {
        let mut steps = StepRegistry::new();
        crate::steps::register_builtins(&mut steps)?;
        extra(&mut steps)?;
        Ok(Self {
            steps: Arc::new(steps),
        })
    }

    /// Run every scenario in `feature_source` once against `definition`,
    /// mock-backed end to end, and report pass/fail per scenario. A
    /// scenario whose steps error does not stop the rest from running.
    pub async fn test(
        &self,
        definition: &ProcedureDefinition,
        feature_source: &str,
    ) -> Result<Vec<ScenarioReport>, BddError> {
        let parsed = feature::parse(feature_source)?;
        let mut reports = Vec::with_capacity(parsed.scenarios.len());

        let runs = parsed.scenarios.iter().map(|scenario| {
            let steps = Arc::clone(&self.steps);
            let definition = definition.clone();
            let scenario = scenario.clone();
            async move { run_one(&steps, &definition, &scenario).await }
        });

        for (scenario, result) in parsed.scenarios.iter().zip(futures::future::join_all(runs).await) {
            reports.push(match result {
                Ok(outcome) => ScenarioReport {
                    name: scenario.name.clone(),
                    error: None,
                    outcome: Some(outcome),
                },
                Err(e) => ScenarioReport {
                    name: scenario.name.clone(),
                    error: Some(e.to_string()),
                    outcome: None,
                },
            });
        }

        Ok(reports)
    }

    /// Run every scenario `definition.evaluation.runs` times (in batches
    /// of `definition.evaluation.workers` concurrent invocations) and
    /// compute each scenario's consistency score across those runs.
    pub async fn evaluate(
        &self,
        definition: &ProcedureDefinition,
        feature_source: &str,
    ) -> Result<EvaluationReport, BddError> {
        let parsed = feature::parse(feature_source)?;
        let total_runs = definition.evaluation.runs.max(1);
        let batch_size = definition.evaluation.workers.max(1) as usize;

        let mut scenarios = Vec::with_capacity(parsed.scenarios.len());
        for scenario in &parsed.scenarios {
            let mut outcomes = Vec::new();
            let mut remaining = total_runs;

            while remaining > 0 {
                let batch = remaining.min(batch_size as u32);
                let mut handles = Vec::with_capacity(batch as usize);
                for _ in 0..batch {
                    let steps = Arc::clone(&self.steps);
                    let definition = definition.clone();
                    let scenario = scenario.clone();
                    handles.push(tokio::spawn(async move {
                        run_one(&steps, &definition, &scenario).await
                    }));
                }
                for handle in handles {
                    match handle.await {
                        Ok(Ok(outcome)) => outcomes.push(outcome),
                        Ok(Err(e)) => {
                            tracing::warn!(scenario = %scenario.name, error = %e, "evaluate run failed");
                        }
                        Err(join_err) => {
                            tracing::warn!(scenario = %scenario.name, error = %join_err, "evaluate run panicked");
                        }
                    }
                }
                remaining -= batch;
            }

            let score = consistency_score(&outcomes);
            scenarios.push(ScenarioConsistency {
                name: scenario.name.clone(),
                runs: outcomes.len() as u32,
                score,
                min_consistency: definition.evaluation.min_consistency,
            });
        }

        Ok(EvaluationReport { scenarios })
    }
}

async fn run_one(
    steps: &StepRegistry,
    definition: &ProcedureDefinition,
    scenario: &Scenario,
) -> Result<ScenarioOutcome, BddError> {
    let mut world = World::new(definition.name.clone());

    for step in &scenario.steps {
        if step.keyword == StepKeyword::Then {
            continue;
        }
        steps.run(step.keyword, &step.text, &mut world)?;
    }

    if world.outcome.is_none() {
        crate::run::run(definition, &mut world).await?;
    }

    for step in &scenario.steps {
        if step.keyword == StepKeyword::Then {
            steps.run(step.keyword, &step.text, &mut world)?;
        }
    }

    world.outcome().map(|o| o.clone())
}
