#![deny(missing_docs)]
//! D. Tool interface and registry for tactus.
//!
//! Defines the [`ToolDyn`] trait for object-safe tool abstraction,
//! [`ToolRegistry`] for managing collections of tools, and
//! [`MockToolRegistry`] for deterministic mock-mode test execution. Any
//! tool source (local function, MCP server, HTTP endpoint, or a nested
//! procedure exposed under a name) implements [`ToolDyn`].
//!
//! Both registries record every call into an identical [`ToolCall`] log,
//! queryable via `called`/`last_call`/`calls_of` — assertions written
//! against a mock run read the same way against a real one.

use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors from tool operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found in the registry.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Tool execution failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The input provided to the tool was invalid.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Object-safe trait for tool implementations.
///
/// Any tool source (local function, MCP server, HTTP endpoint) implements
/// this trait. Tools are stored as `Arc<dyn ToolDyn>` in [`ToolRegistry`].
pub trait ToolDyn: Send + Sync {
    /// The tool's unique name.
    fn name(&self) -> &str;

    /// Human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's input parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given input.
    fn call(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>>;
}

/// One recorded tool invocation: `(tool_name, arguments, result, timestamp,
/// agent_name)`, per the tool call data model. Appended on every call
/// through [`ToolRegistry::invoke`] or [`MockToolRegistry::invoke`].
#[derive(Debug, Clone, Serialize)]
pub struct ToolCall {
    /// Name of the tool that was called.
    pub tool_name: String,
    /// Arguments the tool was called with.
    pub arguments: serde_json::Value,
    /// `Ok` with the tool's return value, or `Err` with its error message.
    pub result: Result<serde_json::Value, String>,
    /// Unix milliseconds when the call completed.
    pub timestamp_ms: u64,
    /// The agent that made the call, if known.
    pub agent_name: Option<String>,
}

impl ToolCall {
    /// Whether the call succeeded.
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Append-only call history shared by [`ToolRegistry`] and
/// [`MockToolRegistry`] so both expose the same `called`/`last_call`/
/// `calls_of` query surface regardless of which one actually ran.
#[derive(Default)]
struct CallLog(Mutex<Vec<ToolCall>>);

impl CallLog {
    fn record(&self, call: ToolCall) {
        self.0.lock().unwrap().push(call);
    }

    fn called(&self, name: &str) -> bool {
        self.0.lock().unwrap().iter().any(|c| c.tool_name == name)
    }

    fn last_call(&self, name: &str) -> Option<ToolCall> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.tool_name == name)
            .cloned()
    }

    fn calls_of(&self, name: &str) -> Vec<ToolCall> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.tool_name == name)
            .cloned()
            .collect()
    }

    fn all(&self) -> Vec<ToolCall> {
        self.0.lock().unwrap().clone()
    }
}

/// `done` — built-in tool an agent calls to signal it intends to exit
/// its turn loop. Carries no side effects of its own; the turn runtime
/// treats a `done` call as an exit condition.
struct DoneTool;

impl ToolDyn for DoneTool {
    fn name(&self) -> &str {
        "done"
    }

    fn description(&self) -> &str {
        "Signal that you are finished and the turn should end."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "reason": {"type": "string", "description": "Why you're done."}
            }
        })
    }

    fn call(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>> {
        Box::pin(async move {
            let reason = input
                .get("reason")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);
            Ok(serde_json::json!({"done": true, "reason": reason}))
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct TodoItem {
    id: u64,
    text: String,
    done: bool,
}

/// `todo` — built-in, open-ended queue manipulation tool. An agent can
/// add, list, complete, and remove items across the turns of an
/// invocation without a dedicated state scope.
struct TodoTool {
    items: Mutex<Vec<TodoItem>>,
    next_id: AtomicU64,
}

impl TodoTool {
    fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl ToolDyn for TodoTool {
    fn name(&self) -> &str {
        "todo"
    }

    fn description(&self) -> &str {
        "Manage an open-ended todo queue: add, list, complete, or remove items."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": {"type": "string", "enum": ["add", "list", "complete", "remove"]},
                "text": {"type": "string"},
                "id": {"type": "integer"}
            },
            "required": ["action"]
        })
    }

    fn call(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>> {
        Box::pin(async move {
            let action = input
                .get("action")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| ToolError::InvalidInput("missing `action`".to_string()))?;

            match action {
                "add" => {
                    let text = input
                        .get("text")
                        .and_then(serde_json::Value::as_str)
                        .ok_or_else(|| {
                            ToolError::InvalidInput("`add` requires `text`".to_string())
                        })?
                        .to_string();
                    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                    let item = TodoItem {
                        id,
                        text,
                        done: false,
                    };
                    self.items.lock().unwrap().push(item.clone());
                    Ok(serde_json::to_value(item).unwrap())
                }
                "list" => {
                    let items = self.items.lock().unwrap().clone();
                    Ok(serde_json::to_value(items).unwrap())
                }
                "complete" => {
                    let id = input
                        .get("id")
                        .and_then(serde_json::Value::as_u64)
                        .ok_or_else(|| {
                            ToolError::InvalidInput("`complete` requires `id`".to_string())
                        })?;
                    let mut items = self.items.lock().unwrap();
                    match items.iter_mut().find(|i| i.id == id) {
                        Some(item) => {
                            item.done = true;
                            Ok(serde_json::to_value(item.clone()).unwrap())
                        }
                        None => Err(ToolError::InvalidInput(format!("no todo with id {id}"))),
                    }
                }
                "remove" => {
                    let id = input
                        .get("id")
                        .and_then(serde_json::Value::as_u64)
                        .ok_or_else(|| {
                            ToolError::InvalidInput("`remove` requires `id`".to_string())
                        })?;
                    let mut items = self.items.lock().unwrap();
                    let before = items.len();
                    items.retain(|i| i.id != id);
                    Ok(serde_json::json!({"removed": before != items.len()}))
                }
                other => Err(ToolError::InvalidInput(format!(
                    "unknown todo action: {other}"
                ))),
            }
        })
    }
}

/// Registry of tools available to a turn.
///
/// Holds tools as `Arc<dyn ToolDyn>` keyed by name. The turn's ReAct loop
/// uses this to look up and execute tools requested by the model.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolDyn>>,
    calls: CallLog,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            calls: CallLog::default(),
        }
    }

    /// Create a registry pre-populated with the built-in `done` and
    /// `todo` tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DoneTool));
        registry.register(Arc::new(TodoTool::new()));
        registry
    }

    /// Register a tool. Overwrites any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn ToolDyn>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolDyn>> {
        self.tools.get(name)
    }

    /// Iterate over all registered tools.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ToolDyn>> {
        self.tools.values()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up and call a tool by name, recording the call regardless of
    /// outcome. This is the entry point turn runtimes should use instead
    /// of `get` + `call` directly, so `called`/`last_call`/`calls_of`
    /// reflect every dispatch.
    pub async fn invoke(
        &self,
        name: &str,
        input: serde_json::Value,
        agent_name: Option<&str>,
    ) -> Result<serde_json::Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?
            .clone();
        let result = tool.call(input.clone()).await;
        let recorded = match &result {
            Ok(v) => Ok(v.clone()),
            Err(e) => Err(e.to_string()),
        };
        self.calls.record(ToolCall {
            tool_name: name.to_string(),
            arguments: input,
            result: recorded,
            timestamp_ms: now_ms(),
            agent_name: agent_name.map(str::to_string),
        });
        result
    }

    /// Whether `name` has been called at least once.
    pub fn called(&self, name: &str) -> bool {
        self.calls.called(name)
    }

    /// The most recent call to `name`, if any.
    pub fn last_call(&self, name: &str) -> Option<ToolCall> {
        self.calls.last_call(name)
    }

    /// Every recorded call to `name`, in call order.
    pub fn calls_of(&self, name: &str) -> Vec<ToolCall> {
        self.calls.calls_of(name)
    }

    /// Every recorded call, across all tool names, in call order.
    pub fn all_calls(&self) -> Vec<ToolCall> {
        self.calls.all()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn fingerprint(value: &serde_json::Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Deterministic stand-in for [`ToolRegistry`], used by the BDD test
/// harness's mock mode and by `evaluate` runs.
///
/// `invoke` never actually executes a tool: it looks up a response keyed
/// by `(tool_name, argument fingerprint)` — an exact JSON match — and
/// falls back to a configurable default when unmatched. Records the
/// same [`ToolCall`] shape as the real registry, so assertions written
/// against a mock run read identically against a real one.
pub struct MockToolRegistry {
    responses: HashMap<(String, String), serde_json::Value>,
    default_response: serde_json::Value,
    calls: CallLog,
}

impl MockToolRegistry {
    /// Create a mock registry whose unmatched calls return `{"ok": true}`.
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            default_response: serde_json::json!({"ok": true}),
            calls: CallLog::default(),
        }
    }

    /// Create a mock registry with a custom fallback response for
    /// unmatched calls.
    pub fn with_default(default_response: serde_json::Value) -> Self {
        Self {
            responses: HashMap::new(),
            default_response,
            calls: CallLog::default(),
        }
    }

    /// Script a response for an exact `(tool_name, arguments)` match.
    pub fn on(
        mut self,
        tool_name: impl Into<String>,
        arguments: serde_json::Value,
        response: serde_json::Value,
    ) -> Self {
        self.responses
            .insert((tool_name.into(), fingerprint(&arguments)), response);
        self
    }

    /// Look up the scripted or default response for `name`/`input` and
    /// record the call. Never fails — mock calls always "succeed"
    /// (the event log cannot distinguish the two registries).
    pub async fn invoke(
        &self,
        name: &str,
        input: serde_json::Value,
        agent_name: Option<&str>,
    ) -> Result<serde_json::Value, ToolError> {
        let key = (name.to_string(), fingerprint(&input));
        let response = self
            .responses
            .get(&key)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone());

        self.calls.record(ToolCall {
            tool_name: name.to_string(),
            arguments: input,
            result: Ok(response.clone()),
            timestamp_ms: now_ms(),
            agent_name: agent_name.map(str::to_string),
        });

        Ok(response)
    }

    /// Whether `name` has been called at least once.
    pub fn called(&self, name: &str) -> bool {
        self.calls.called(name)
    }

    /// The most recent call to `name`, if any.
    pub fn last_call(&self, name: &str) -> Option<ToolCall> {
        self.calls.last_call(name)
    }

    /// Every recorded call to `name`, in call order.
    pub fn calls_of(&self, name: &str) -> Vec<ToolCall> {
        self.calls.calls_of(name)
    }

    /// Every recorded call, across all tool names, in call order.
    pub fn all_calls(&self) -> Vec<ToolCall> {
        self.calls.all()
    }
}

impl Default for MockToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn _assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn tool_dyn_is_object_safe() {
        _assert_send_sync::<Arc<dyn ToolDyn>>();
    }

    #[test]
    fn tool_error_display() {
        assert_eq!(
            ToolError::NotFound("bash".into()).to_string(),
            "tool not found: bash"
        );
        assert_eq!(
            ToolError::ExecutionFailed("timeout".into()).to_string(),
            "execution failed: timeout"
        );
        assert_eq!(
            ToolError::InvalidInput("missing field".into()).to_string(),
            "invalid input: missing field"
        );
    }

    struct EchoTool;

    impl ToolDyn for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes input back"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        fn call(
            &self,
            input: serde_json::Value,
        ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>>
        {
            Box::pin(async move { Ok(json!({"echoed": input})) })
        }
    }

    struct FailTool;

    impl ToolDyn for FailTool {
        fn name(&self) -> &str {
            "fail"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        fn call(
            &self,
            _input: serde_json::Value,
        ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>>
        {
            Box::pin(async { Err(ToolError::ExecutionFailed("always fails".into())) })
        }
    }

    #[test]
    fn registry_add_and_get() {
        let mut reg = ToolRegistry::new();
        assert!(reg.is_empty());

        reg.register(Arc::new(EchoTool));
        assert_eq!(reg.len(), 1);
        assert!(reg.get("echo").is_some());
        assert!(reg.get("nonexistent").is_none());
    }

    #[test]
    fn registry_iter() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        reg.register(Arc::new(FailTool));

        let names: Vec<&str> = reg.iter().map(|t| t.name()).collect();
        assert!(names.contains(&"echo"));
        assert!(names.contains(&"fail"));
    }

    #[tokio::test]
    async fn registry_call_tool() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));

        let tool = reg.get("echo").unwrap();
        let result = tool.call(json!({"msg": "hello"})).await.unwrap();
        assert_eq!(result, json!({"echoed": {"msg": "hello"}}));
    }

    #[tokio::test]
    async fn registry_call_failing_tool() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(FailTool));

        let tool = reg.get("fail").unwrap();
        let result = tool.call(json!({})).await;
        assert!(result.is_err());
    }

    #[test]
    fn registry_overwrite() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        assert_eq!(reg.len(), 1);

        // Register another tool with the same name
        reg.register(Arc::new(EchoTool));
        assert_eq!(reg.len(), 1);
    }

    #[tokio::test]
    async fn invoke_records_successful_call() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));

        assert!(!reg.called("echo"));
        let result = reg
            .invoke("echo", json!({"msg": "hi"}), Some("agent-a"))
            .await
            .unwrap();
        assert_eq!(result, json!({"echoed": {"msg": "hi"}}));

        assert!(reg.called("echo"));
        let last = reg.last_call("echo").unwrap();
        assert!(last.succeeded());
        assert_eq!(last.agent_name.as_deref(), Some("agent-a"));
        assert_eq!(reg.calls_of("echo").len(), 1);
    }

    #[tokio::test]
    async fn invoke_records_failed_call() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(FailTool));

        let result = reg.invoke("fail", json!({}), None).await;
        assert!(result.is_err());

        let last = reg.last_call("fail").unwrap();
        assert!(!last.succeeded());
    }

    #[tokio::test]
    async fn invoke_unknown_tool_errors_without_recording() {
        let reg = ToolRegistry::new();
        let result = reg.invoke("missing", json!({}), None).await;
        assert!(matches!(result, Err(ToolError::NotFound(_))));
        assert!(!reg.called("missing"));
    }

    #[tokio::test]
    async fn builtin_done_tool_reports_done() {
        let reg = ToolRegistry::with_builtins();
        let result = reg
            .invoke("done", json!({"reason": "finished"}), None)
            .await
            .unwrap();
        assert_eq!(result["done"], json!(true));
        assert_eq!(result["reason"], json!("finished"));
    }

    #[tokio::test]
    async fn builtin_todo_tool_add_list_complete() {
        let reg = ToolRegistry::with_builtins();

        let added = reg
            .invoke("todo", json!({"action": "add", "text": "write tests"}), None)
            .await
            .unwrap();
        let id = added["id"].as_u64().unwrap();

        let listed = reg
            .invoke("todo", json!({"action": "list"}), None)
            .await
            .unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let completed = reg
            .invoke("todo", json!({"action": "complete", "id": id}), None)
            .await
            .unwrap();
        assert_eq!(completed["done"], json!(true));
    }

    #[tokio::test]
    async fn mock_registry_exact_match_wins_over_default() {
        let mock = MockToolRegistry::with_default(json!({"ok": true})).on(
            "search",
            json!({"q": "rust"}),
            json!({"results": ["tokio", "serde"]}),
        );

        let matched = mock
            .invoke("search", json!({"q": "rust"}), None)
            .await
            .unwrap();
        assert_eq!(matched["results"], json!(["tokio", "serde"]));

        let unmatched = mock
            .invoke("search", json!({"q": "other"}), None)
            .await
            .unwrap();
        assert_eq!(unmatched, json!({"ok": true}));

        assert_eq!(mock.calls_of("search").len(), 2);
    }

    #[tokio::test]
    async fn mock_registry_all_calls_spans_every_tool() {
        let mock = MockToolRegistry::new();
        mock.invoke("search", json!({"q": "a"}), None).await.unwrap();
        mock.invoke("done", json!({}), None).await.unwrap();

        let all = mock.all_calls();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].tool_name, "search");
        assert_eq!(all[1].tool_name, "done");
    }

    #[tokio::test]
    async fn mock_registry_never_errors() {
        let mock = MockToolRegistry::new();
        let result = mock.invoke("anything", json!({}), None).await;
        assert!(result.is_ok());
    }
}
