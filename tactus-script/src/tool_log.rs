//! A shared tool-call ledger visible to the `Tool` capability across every
//! agent in one invocation.
//!
//! `tactus_tool::ToolRegistry` keeps its own `CallLog`, but it's private to
//! the registry instance and `ReactOperator` owns its registry by value —
//! so a script with three agents, each wrapping its own `ReactOperator`,
//! would have three unconnected logs. [`RecordingTool`] wraps any
//! [`ToolDyn`] and mirrors every call (name, arguments, result, agent) into
//! one [`tactus_tool::ToolCall`] ledger shared by the whole bridge, so
//! `Tool.called`/`last_call`/`calls_of` read the same regardless of which
//! agent made the call.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use tactus_core::event::EventKind;
use tactus_scheduler::procedure::InvocationHandle;
use tactus_tool::{ToolCall, ToolDyn, ToolError};

/// Append-only, cross-agent record of every tool call made during one
/// invocation. Cheap to clone (`Arc` underneath); shared by every
/// [`RecordingTool`] and read by the `Tool` capability.
#[derive(Clone, Default)]
pub struct ToolLedger(Arc<Mutex<Vec<ToolCall>>>);

impl ToolLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: ToolCall) {
        self.0.lock().unwrap().push(call);
    }

    /// Whether `name` has been called at least once.
    pub fn called(&self, name: &str) -> bool {
        self.0.lock().unwrap().iter().any(|c| c.tool_name == name)
    }

    /// The most recent call to `name`, if any.
    pub fn last_call(&self, name: &str) -> Option<ToolCall> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.tool_name == name)
            .cloned()
    }

    /// Every recorded call to `name`, in call order.
    pub fn calls_of(&self, name: &str) -> Vec<ToolCall> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.tool_name == name)
            .cloned()
            .collect()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Decorates a tool so every call it serves also lands in a shared
/// [`ToolLedger`] tagged with the agent that made it.
pub struct RecordingTool {
    inner: Arc<dyn ToolDyn>,
    ledger: ToolLedger,
    agent_name: String,
    ctx: Option<InvocationHandle>,
}

impl RecordingTool {
    /// Wrap `inner` so its calls are recorded under `agent_name` into
    /// `ledger`.
    pub fn new(inner: Arc<dyn ToolDyn>, ledger: ToolLedger, agent_name: impl Into<String>) -> Self {
        Self {
            inner,
            ledger,
            agent_name: agent_name.into(),
            ctx: None,
        }
    }

    /// Attach the invocation this tool is running under, so each call also
    /// emits a durable `ToolCalled` event (§4.D) alongside the in-memory
    /// ledger entry.
    pub fn with_invocation(mut self, ctx: InvocationHandle) -> Self {
        self.ctx = Some(ctx);
        self
    }
}

impl ToolDyn for RecordingTool {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn input_schema(&self) -> serde_json::Value {
        self.inner.input_schema()
    }

    fn call(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>> {
        Box::pin(async move {
            let result = self.inner.call(input.clone()).await;
            let recorded = match &result {
                Ok(v) => Ok(v.clone()),
                Err(e) => Err(e.to_string()),
            };
            let success = recorded.is_ok();
            self.ledger.record(ToolCall {
                tool_name: self.inner.name().to_string(),
                arguments: input,
                result: recorded,
                timestamp_ms: now_ms(),
                agent_name: Some(self.agent_name.clone()),
            });
            if let Some(ctx) = &self.ctx {
                let _ = ctx
                    .emit(EventKind::ToolCalled { tool: self.inner.name().to_string(), success })
                    .await;
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct EchoTool(AtomicBool);

    impl ToolDyn for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        fn call(
            &self,
            input: serde_json::Value,
        ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>>
        {
            self.0.store(true, Ordering::SeqCst);
            Box::pin(async move { Ok(json!({"echoed": input})) })
        }
    }

    #[tokio::test]
    async fn records_into_shared_ledger() {
        let ledger = ToolLedger::new();
        let tool = RecordingTool::new(Arc::new(EchoTool(AtomicBool::new(false))), ledger.clone(), "greeter");

        assert!(!ledger.called("echo"));
        let result = tool.call(json!({"msg": "hi"})).await.unwrap();
        assert_eq!(result, json!({"echoed": {"msg": "hi"}}));

        assert!(ledger.called("echo"));
        let last = ledger.last_call("echo").unwrap();
        assert_eq!(last.agent_name.as_deref(), Some("greeter"));
        assert_eq!(ledger.calls_of("echo").len(), 1);
    }
}
