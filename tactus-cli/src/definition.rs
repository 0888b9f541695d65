//! `validate <file>` — parse a procedure definition from text and
//! static-check it without running anything.
//!
//! §1 puts "YAML/TOML configuration loading" out of scope; it doesn't put
//! *a* loading format out of scope. `ProcedureDefinition` already derives
//! `Deserialize`, so this crate reads the one format that falls straight
//! out of that derive — JSON — and leaves a richer YAML/TOML front-end to
//! whatever out-of-tree config layer a deployment wants.

use std::collections::HashSet;

use tactus_core::definition::ProcedureDefinition;
use tactus_script::ScriptEngine;

use crate::error::CliError;

/// Parse `source` (JSON) into a [`ProcedureDefinition`]. The only place in
/// this workspace that actually turns text into a definition.
pub fn load_definition(source: &str) -> Result<ProcedureDefinition, CliError> {
    serde_json::from_str(source).map_err(|e| CliError::MalformedDefinition(e.to_string()))
}

/// Structural issues `validate` can catch about a definition by inspection
/// alone, beyond "does the script compile".
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Non-fatal observations worth surfacing (e.g. a declared stage name
    /// never appears to be used — best-effort, since `Stage.set` calls
    /// aren't statically enumerable from Rhai source without evaluating
    /// it).
    pub warnings: Vec<String>,
}

/// Parse and static-check `source`: valid JSON shape, no duplicate
/// parameter/agent/stage names, and a script that compiles. Returns the
/// parsed definition plus any non-fatal warnings on success.
pub fn validate(source: &str) -> Result<(ProcedureDefinition, ValidationReport), CliError> {
    let definition = load_definition(source)?;

    let mut seen = HashSet::new();
    for param in &definition.params {
        if !seen.insert(param.name.as_str()) {
            return Err(CliError::Validation(format!(
                "duplicate parameter name: {}",
                param.name
            )));
        }
    }

    let mut seen = HashSet::new();
    for agent in &definition.agents {
        if !seen.insert(agent.name.as_str()) {
            return Err(CliError::Validation(format!(
                "duplicate agent name: {}",
                agent.name
            )));
        }
    }

    let mut seen = HashSet::new();
    let mut warnings = Vec::new();
    for stage in &definition.stages {
        if !seen.insert(stage.name.as_str()) {
            return Err(CliError::Validation(format!(
                "duplicate stage name: {}",
                stage.name
            )));
        }
    }
    if definition.stages.is_empty() {
        warnings.push("no stages declared — Stage.set/get calls won't be cross-checked".into());
    }

    ScriptEngine::new().validate(&definition.script)?;

    Ok((definition, ValidationReport { warnings }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_minimal_definition() {
        let source = r#"{"name": "greeter", "script": "42"}"#;
        let definition = load_definition(source).unwrap();
        assert_eq!(definition.name, "greeter");
    }

    #[test]
    fn rejects_malformed_json() {
        let err = load_definition("not json").unwrap_err();
        assert!(matches!(err, CliError::MalformedDefinition(_)));
    }

    #[test]
    fn rejects_a_script_that_fails_to_compile() {
        let source = r#"{"name": "broken", "script": "let x = ;"}"#;
        let err = validate(source).unwrap_err();
        assert!(matches!(err, CliError::Script(_)));
    }

    #[test]
    fn rejects_duplicate_param_names() {
        let source = r#"{
            "name": "dup",
            "script": "42",
            "params": [
                {"name": "x", "type": "string"},
                {"name": "x", "type": "number"}
            ]
        }"#;
        let err = validate(source).unwrap_err();
        assert!(matches!(err, CliError::Validation(_)));
    }

    #[test]
    fn accepts_a_well_formed_definition() {
        let source = r#"{"name": "greeter", "script": "42"}"#;
        let (definition, report) = validate(source).unwrap();
        assert_eq!(definition.name, "greeter");
        assert!(!report.warnings.is_empty());
    }
}
