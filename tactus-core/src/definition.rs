//! The Procedure Definition — a named, versioned, immutable description of
//! a procedure, per §3. This is the shape an out-of-tree YAML/TOML loader
//! (out of scope per §1) deserializes into; `tactus-cli`'s `validate` verb
//! is the only place in this workspace that actually parses one from text.
//!
//! Nothing here executes anything. [`tactus_scheduler::ProcedureBody`] and
//! [`crate::turn::Turn`] are the execution-side traits; a `ProcedureDefinition`
//! is just data a caller uses to build those.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A typed parameter declaration within a procedure's parameter schema.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSchema {
    /// Parameter name.
    pub name: String,
    /// JSON type name (`string`, `number`, `boolean`, `array`, `object`).
    #[serde(rename = "type")]
    pub ty: String,
    /// Whether the caller must supply this parameter.
    #[serde(default)]
    pub required: bool,
    /// Value substituted when the caller omits this parameter.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    /// Human-readable description, surfaced by `validate` and docs generators.
    #[serde(default)]
    pub description: Option<String>,
}

/// One agent this procedure declares and binds to a name the script calls
/// by (`Greeter.turn(...)`). Mirrors [`crate::id::AgentId`] plus the model
/// configuration `tactus-agent-turn`'s `ProviderRequest` needs.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDeclaration {
    /// Name the script binds this agent to.
    pub name: String,
    /// Provider identifier (`anthropic`, `bedrock`, ...) — resolved by an
    /// out-of-tree provider adapter registry, not by this crate.
    #[serde(default)]
    pub provider: Option<String>,
    /// Model identifier passed through to the provider.
    #[serde(default)]
    pub model: Option<String>,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Max output tokens per turn.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Max ReAct iterations within one `turn()` call.
    #[serde(default)]
    pub max_turns: Option<u32>,
    /// System prompt template (rendered against parameters and state by
    /// the caller before being handed to `tactus-script`'s `AgentDecl`).
    pub system_prompt: String,
    /// Names of tools this agent may call, resolved against the
    /// procedure's tool registry at construction time.
    #[serde(default)]
    pub tools: Vec<String>,
    /// Provider-specific passthrough config (thinking budgets, caching
    /// hints, ...), opaque to this crate.
    #[serde(default)]
    pub extra: serde_json::Value,
}

/// A resource dependency an invocation needs provisioned before it starts
/// (an HTTP client, a database pool, a cache) — see §5 "Shared resources".
/// Resolved by an `Environment` implementation (`tactus-env-local` or a
/// durable equivalent); this struct only names what's needed.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDependency {
    /// Name the script/tool layer refers to this resource by.
    pub name: String,
    /// Resource kind (`http_client`, `db_pool`, `cache`, ...); an open
    /// vocabulary interpreted by the `Environment` implementation.
    pub kind: String,
    /// Kind-specific configuration.
    #[serde(default)]
    pub config: serde_json::Value,
}

/// One named stage of a multi-stage procedure. Purely descriptive —
/// `Stage.set`/`Stage.get` in the script don't validate against this list,
/// but `tactus-cli validate` and the BDD harness's `the stage should be X`
/// step can cross-check a script's stage names against it.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDeclaration {
    /// Stage name, as passed to `Stage.set(name)`.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Configuration for `evaluate` runs declared alongside a procedure.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Default number of runs per scenario when `--runs` is omitted.
    #[serde(default = "EvaluationConfig::default_runs")]
    pub runs: u32,
    /// Default worker cap when `--workers` is omitted.
    #[serde(default = "EvaluationConfig::default_workers")]
    pub workers: u32,
    /// Minimum consistency score considered a pass, for CI gating.
    #[serde(default)]
    pub min_consistency: Option<f64>,
}

impl EvaluationConfig {
    fn default_runs() -> u32 {
        10
    }
    fn default_workers() -> u32 {
        4
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            runs: Self::default_runs(),
            workers: Self::default_workers(),
            min_consistency: None,
        }
    }
}

/// A named, versioned description of a procedure: parameters, declared
/// agents, resource dependencies, stages, the orchestration script, and
/// optional Gherkin specifications/evaluation config. Immutable once
/// loaded — §3's "Procedure Definition".
///
/// This struct is what an out-of-tree YAML/TOML loader deserializes into
/// (config loading itself is out of scope per §1); `tactus-cli`'s
/// `validate` verb is this workspace's only consumer of that shape.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureDefinition {
    /// Procedure name, unique within a loaded set — what
    /// `Procedure.run`/`spawn` address by.
    pub name: String,
    /// Semver-ish definition version, bumped on any breaking script change.
    #[serde(default)]
    pub version: String,
    /// Parameter schema, keyed by parameter name for fast lookup at
    /// resolution time.
    #[serde(default)]
    pub params: Vec<ParamSchema>,
    /// Declared agents.
    #[serde(default)]
    pub agents: Vec<AgentDeclaration>,
    /// Declared resource dependencies.
    #[serde(default)]
    pub resources: Vec<ResourceDependency>,
    /// Declared stages, in the order a well-behaved script should enter
    /// them. Empty for single-stage or stageless procedures.
    #[serde(default)]
    pub stages: Vec<StageDeclaration>,
    /// The orchestration script source (Rhai, consumed by
    /// `tactus-script::ScriptEngine`).
    pub script: String,
    /// Gherkin `.feature` text — the `specifications` block `tactus-bdd`
    /// parses into scenarios.
    #[serde(default)]
    pub specifications: Option<String>,
    /// Evaluation defaults for this procedure's `evaluate` runs.
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

impl ProcedureDefinition {
    /// A minimal definition with no params, agents, resources, or stages —
    /// `#[non_exhaustive]` blocks struct-literal construction outside this
    /// crate, so callers (loaders, tests, `tactus-cli`) build one of these
    /// and extend it with the `with_*` builders below.
    pub fn new(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: String::new(),
            params: Vec::new(),
            agents: Vec::new(),
            resources: Vec::new(),
            stages: Vec::new(),
            script: script.into(),
            specifications: None,
            evaluation: EvaluationConfig::default(),
        }
    }

    /// Set the definition version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Append a parameter declaration.
    pub fn with_param(mut self, param: ParamSchema) -> Self {
        self.params.push(param);
        self
    }

    /// Append an agent declaration.
    pub fn with_agent(mut self, agent: AgentDeclaration) -> Self {
        self.agents.push(agent);
        self
    }

    /// Append a resource dependency.
    pub fn with_resource(mut self, resource: ResourceDependency) -> Self {
        self.resources.push(resource);
        self
    }

    /// Append a stage declaration.
    pub fn with_stage(mut self, stage: StageDeclaration) -> Self {
        self.stages.push(stage);
        self
    }

    /// Attach a `specifications` Gherkin block.
    pub fn with_specifications(mut self, specifications: impl Into<String>) -> Self {
        self.specifications = Some(specifications.into());
        self
    }

    /// Override the evaluation defaults.
    pub fn with_evaluation(mut self, evaluation: EvaluationConfig) -> Self {
        self.evaluation = evaluation;
        self
    }

    /// Resolve a caller-supplied parameter map against this definition's
    /// schema: fill in defaults, and report every required parameter that
    /// is still missing. Mirrors the read-through-then-validate shape
    /// `tactus-tool::MockToolRegistry` uses for its own lookup.
    pub fn resolve_params(
        &self,
        supplied: &serde_json::Value,
    ) -> Result<serde_json::Value, Vec<String>> {
        let mut resolved = serde_json::Map::new();
        let mut missing = Vec::new();

        let supplied_map = supplied.as_object();

        for schema in &self.params {
            let value = supplied_map
                .and_then(|m| m.get(&schema.name))
                .cloned()
                .or_else(|| schema.default.clone());

            match value {
                Some(v) => {
                    resolved.insert(schema.name.clone(), v);
                }
                None if schema.required => missing.push(schema.name.clone()),
                None => {}
            }
        }

        // Pass through anything the caller supplied that isn't in the
        // declared schema — procedures may accept ad-hoc extra fields.
        if let Some(supplied_map) = supplied_map {
            for (k, v) in supplied_map {
                resolved.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }

        if missing.is_empty() {
            Ok(serde_json::Value::Object(resolved))
        } else {
            Err(missing)
        }
    }

    /// Agent declarations keyed by name, for O(1) lookup when building
    /// `tactus-script::AgentDecl`s.
    pub fn agents_by_name(&self) -> HashMap<&str, &AgentDeclaration> {
        self.agents.iter().map(|a| (a.name.as_str(), a)).collect()
    }
}
