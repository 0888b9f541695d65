//! Cucumber-expression-style step matching: a small placeholder language
//! (`{string}`, `{int}`, `{float}`, `{word}`, `{}`) compiled to a regex,
//! plus the registry of built-in and user-registered step definitions
//! matched against it.
//!
//! This stands in for the `cucumber_expressions` crate, whose matching
//! semantics for custom parameter types aren't something this exercise
//! can verify against without running the toolchain. `regex` is a direct,
//! well-understood dependency that covers the placeholder vocabulary the
//! built-in step library and any realistic custom step actually need.

use regex::Regex;

use crate::error::BddError;
use crate::feature::StepKeyword;
use crate::scenario::World;

/// A compiled step-text pattern. `{string}` captures a `"double-quoted"`
/// span without its quotes; `{int}`/`{float}` capture a signed number;
/// `{word}` captures one whitespace-free token; bare `{}` captures
/// anything.
pub struct Expression {
    regex: Regex,
}

impl Expression {
    /// Compile a cucumber-expression-style pattern.
    pub fn compile(pattern: &str) -> Result<Self, BddError> {
        let token = Regex::new(r"\{(string|int|float|word)?\}").unwrap();
        let mut translated = String::from("^");
        let mut last_end = 0;

        for m in token.find_iter(pattern) {
            translated.push_str(&regex::escape(&pattern[last_end..m.start()]));
            let inner = &pattern[m.start() + 1..m.end() - 1];
            translated.push_str(match inner {
                "string" => "\"([^\"]*)\"",
                "int" => "(-?[0-9]+)",
                "float" => "(-?[0-9]+(?:\\.[0-9]+)?)",
                "word" => "(\\S+)",
                _ => "(.*)",
            });
            last_end = m.end();
        }
        translated.push_str(&regex::escape(&pattern[last_end..]));
        translated.push('$');

        Regex::new(&translated)
            .map(|regex| Self { regex })
            .map_err(|e| BddError::Parse(format!("bad step pattern {pattern:?}: {e}")))
    }

    /// Match `text`, returning the captured placeholder values as raw
    /// strings (quotes already stripped for `{string}`), or `None`.
    pub fn captures(&self, text: &str) -> Option<Vec<String>> {
        self.regex.captures(text).map(|caps| {
            caps.iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect()
        })
    }
}

type StepFn = Box<dyn Fn(&[String], &mut World) -> Result<(), BddError> + Send + Sync>;

/// One registered step definition: a keyword, a compiled pattern, and
/// the handler to run when a scenario step matches it.
struct StepDef {
    keyword: StepKeyword,
    pattern: String,
    expr: Expression,
    handler: StepFn,
}

/// The full set of step definitions a harness matches scenario text
/// against: the built-in library plus whatever a caller registers.
#[derive(Default)]
pub struct StepRegistry {
    steps: Vec<StepDef>,
}

impl StepRegistry {
    /// An empty registry with no steps defined.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step definition.
    pub fn register(
        &mut self,
        keyword: StepKeyword,
        pattern: &str,
        handler: impl Fn(&[String], &mut World) -> Result<(), BddError> + Send + Sync + 'static,
    ) -> Result<(), BddError> {
        let expr = Expression::compile(pattern)?;
        self.steps.push(StepDef {
            keyword,
            pattern: pattern.to_string(),
            expr,
            handler: Box::new(handler),
        });
        Ok(())
    }

    /// Find the first registered step of `keyword` whose pattern matches
    /// `text` and run it against `world`.
    pub fn run(
        &self,
        keyword: StepKeyword,
        text: &str,
        world: &mut World,
    ) -> Result<(), BddError> {
        for step in &self.steps {
            if step.keyword != keyword {
                continue;
            }
            if let Some(captures) = step.expr.captures(text) {
                return (step.handler)(&captures, world);
            }
        }
        Err(BddError::UnmatchedStep(text.to_string()))
    }

    /// Every registered pattern for `keyword`, for diagnostics.
    pub fn patterns(&self, keyword: StepKeyword) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.keyword == keyword)
            .map(|s| s.pattern.as_str())
            .collect()
    }
}
