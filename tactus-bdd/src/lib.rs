#![deny(missing_docs)]
//! J. BDD Test Harness — runs a procedure definition's Gherkin
//! `specifications` against fully mocked agents, tools, and HITL, for two
//! purposes: `test` (pass/fail per scenario) and `evaluate` (a consistency
//! score across repeated runs, since a real model is nondeterministic even
//! when every scenario passes).
//!
//! Nothing here talks to a real [`tactus_agent_turn::provider::Provider`],
//! a real tool, or a real human. [`MockProvider`] plays back a scripted
//! sequence of ReAct turns, [`tactus_tool::MockToolRegistry`]-backed
//! [`MockTool`]s stand in for every declared tool (including overwriting
//! the `done`/`todo` builtins so even control flow is deterministic), and
//! [`tactus_hitl::MockHitlHandler`] stands in for the human. A scenario's
//! `Given`/`When`/`Then` steps configure and assert against exactly those
//! mocks through a [`World`].

pub mod error;
pub mod feature;
pub mod harness;
pub mod matcher;
pub mod mock_provider;
pub mod mock_tool;
pub mod outcome;
pub mod run;
pub mod scenario;
pub mod steps;

pub use error::BddError;
pub use feature::{Feature, Scenario, Step, StepKeyword};
pub use harness::{BddHarness, EvaluationReport, ScenarioConsistency, ScenarioReport};
pub use matcher::{Expression, StepRegistry};
pub use mock_provider::{MockProvider, ScriptedTurn};
pub use mock_tool::MockTool;
pub use outcome::{consistency_score, OutcomeFingerprint, ScenarioOutcome};
pub use scenario::World;
