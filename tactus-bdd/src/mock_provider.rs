//! A scripted [`Provider`] for deterministic scenario runs.
//!
//! Unlike a single canned response (the shape the workspace's other
//! provider mocks use, e.g. `tests/poc.rs`'s `MockProvider::text`), a
//! scenario's agent often needs to call a tool and only then finish —
//! `ReactOperator::execute` loops until it sees `StopReason::EndTurn`, so
//! one canned response can only ever produce a single-turn agent. This
//! `MockProvider` instead holds an ordered queue of turns and consumes
//! one per `complete` call, shared across however many agents a script
//! declares (the bridge hands every declared agent the same
//! `Arc<dyn ScriptProvider>`).

use std::collections::VecDeque;
use std::sync::Mutex;

use rust_decimal::Decimal;
use tactus_agent_turn::provider::{Provider, ProviderError};
use tactus_agent_turn::types::{ContentPart, ProviderRequest, ProviderResponse, StopReason, TokenUsage};

/// One scripted provider turn.
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    /// Respond with a tool-use request.
    ToolCall {
        /// Tool name the model "decides" to call.
        name: String,
        /// Arguments for the call.
        input: serde_json::Value,
    },
    /// Respond with a final text answer, ending the turn.
    Text(String),
}

/// A provider that plays back a fixed sequence of [`ScriptedTurn`]s,
/// one per `complete` call, regardless of the request it's given.
///
/// Exhausting the queue is treated as a scenario authoring error rather
/// than silently looping forever, since that's exactly the kind of bug
/// a BDD scenario is meant to catch.
pub struct MockProvider {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    next_tool_use_id: Mutex<u64>,
}

impl MockProvider {
    /// Build a provider from an ordered turn script.
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into_iter().collect()),
            next_tool_use_id: Mutex::new(0),
        }
    }

    /// A provider that immediately ends the turn with `text`.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self::new(vec![ScriptedTurn::Text(text.into())])
    }

    fn tool_use_id(&self) -> String {
        let mut n = self.next_tool_use_id.lock().unwrap();
        *n += 1;
        format!("mock-tool-use-{n}")
    }
}

impl Provider for MockProvider {
    async fn complete(
        &self,
        _request: ProviderRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        let turn = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| {
                ProviderError::Other(
                    "mock provider's scripted turn queue is exhausted \
                     (the scenario's agent called the model more times \
                     than it was scripted for)"
                        .into(),
                )
            })?;

        let (content, stop_reason) = match turn {
            ScriptedTurn::ToolCall { name, input } => (
                vec![ContentPart::ToolUse {
                    id: self.tool_use_id(),
                    name,
                    input,
                }],
                StopReason::ToolUse,
            ),
            ScriptedTurn::Text(text) => (vec![ContentPart::Text { text }], StopReason::EndTurn),
        };

        Ok(ProviderResponse {
            content,
            stop_reason,
            usage: TokenUsage::default(),
            model: "mock-model".to_string(),
            cost: Some(Decimal::ZERO),
            truncated: Some(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactus_agent_turn::types::{ProviderMessage, Role};

    fn empty_request() -> ProviderRequest {
        ProviderRequest {
            model: None,
            messages: vec![ProviderMessage {
                role: Role::User,
                content: vec![ContentPart::Text { text: "hi".into() }],
            }],
            tools: vec![],
            max_tokens: None,
            temperature: None,
            system: None,
            extra: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn plays_back_scripted_turns_in_order() {
        let provider = MockProvider::new(vec![
            ScriptedTurn::ToolCall {
                name: "done".into(),
                input: serde_json::json!({}),
            },
            ScriptedTurn::Text("all set".into()),
        ]);

        let first = provider.complete(empty_request()).await.unwrap();
        assert_eq!(first.stop_reason, StopReason::ToolUse);

        let second = provider.complete(empty_request()).await.unwrap();
        assert_eq!(second.stop_reason, StopReason::EndTurn);
    }

    #[tokio::test]
    async fn exhausted_queue_errors_instead_of_hanging() {
        let provider = MockProvider::new(vec![]);
        let err = provider.complete(empty_request()).await.unwrap_err();
        assert!(!err.is_retryable());
    }
}
