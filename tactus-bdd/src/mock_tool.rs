//! Adapts a shared [`MockToolRegistry`] into one [`ToolDyn`] per declared
//! tool name, so a mock-mode agent's real `ToolRegistry` (the concrete
//! type `ReactOperator` takes) can hold mock-backed tools side by side
//! with the real `done`/`todo` builtins.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tactus_tool::{MockToolRegistry, ToolDyn, ToolError};

/// One tool name backed by a shared [`MockToolRegistry`]. `call` never
/// executes real logic — it looks the call up in the registry's scripted
/// responses (or its default), exactly like any other `MockToolRegistry`
/// consumer.
pub struct MockTool {
    name: String,
    registry: Arc<MockToolRegistry>,
}

impl MockTool {
    /// Wrap `name` as a `ToolDyn` backed by `registry`.
    pub fn new(name: impl Into<String>, registry: Arc<MockToolRegistry>) -> Self {
        Self {
            name: name.into(),
            registry,
        }
    }
}

impl ToolDyn for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Mock tool; behavior is scripted by the scenario under test."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }

    fn call(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>> {
        Box::pin(async move {
            self.registry
                .invoke(&self.name, input, None)
                .await
        })
    }
}
