//! Cross-crate seams: the `Tool` authoring trait, its object-safe
//! `ToolDyn` counterpart, the `Provider` completion trait, and the
//! canonical `ContextStrategy` compaction trait.

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ContextError, ProviderError, ToolError};
use crate::types::{
    CompletionRequest, CompletionResponse, ContentItem, Message, ToolContext, ToolDefinition,
    ToolOutput,
};
use crate::wasm::WasmCompatSend;

/// Strongly-typed tool authoring trait.
///
/// Implement this once per tool with concrete `Args`/`Output`/`Error`
/// types; `ToolDyn` (implemented automatically via the blanket impl
/// below) is what registries actually store, since generic types
/// aren't object-safe.
pub trait Tool: Send + Sync {
    /// The tool's unique name.
    const NAME: &'static str;
    /// Deserialized, schema-validated input type.
    type Args: DeserializeOwned + schemars::JsonSchema + Send;
    /// Serializable success output type.
    type Output: Serialize + Send;
    /// Error type, convertible to a tool-result error message.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Static definition (name, description, schema) advertised to the model.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with validated arguments.
    fn call(
        &self,
        args: Self::Args,
        ctx: &ToolContext,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

/// Object-safe tool trait. Registries store `Arc<dyn ToolDyn>`; the
/// blanket impl below derives it from any `Tool` implementation,
/// handling JSON (de)serialization and error-to-result mapping.
pub trait ToolDyn: Send + Sync {
    /// The tool's unique name.
    fn name(&self) -> &str;

    /// The tool's definition, for advertising to the model.
    fn definition_dyn(&self) -> ToolDefinition;

    /// Deserialize `input`, execute, and serialize the result (or error)
    /// into a `ToolOutput`. Schema/deserialization failures surface as
    /// `Err(ToolError::InvalidInput)` rather than a panic.
    fn call_dyn<'a>(
        &'a self,
        input: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + 'a>>;
}

impl<T: Tool> ToolDyn for T {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn definition_dyn(&self) -> ToolDefinition {
        self.definition()
    }

    fn call_dyn<'a>(
        &'a self,
        input: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + 'a>> {
        Box::pin(async move {
            let args: T::Args = serde_json::from_value(input)
                .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
            match self.call(args, ctx).await {
                Ok(output) => {
                    let structured_content = serde_json::to_value(&output).ok();
                    let text = structured_content
                        .as_ref()
                        .map(|v| v.to_string())
                        .unwrap_or_default();
                    Ok(ToolOutput {
                        content: vec![ContentItem::Text(text)],
                        structured_content,
                        is_error: false,
                    })
                }
                Err(e) => Err(ToolError::ExecutionFailed(Box::new(e))),
            }
        })
    }
}

/// LLM provider completion interface.
///
/// Uses RPITIT and is intentionally NOT object-safe — context
/// strategies that need summarization (e.g. `SummarizationStrategy`)
/// are generic over `P: Provider` rather than storing a trait object.
pub trait Provider: Send + Sync {
    /// Send a completion request to the provider.
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, ProviderError>> + Send;
}

/// Canonical context compaction strategy, operating on wire-level
/// `Message`s. Implementations: `SlidingWindowStrategy`,
/// `ToolResultClearingStrategy`, `SummarizationStrategy`,
/// `CompositeStrategy` (all in `tactus-context`).
pub trait ContextStrategy: Send + Sync {
    /// Whether compaction should run given the current messages and
    /// an externally-computed token count (from `token_estimate`).
    fn should_compact(&self, messages: &[Message], token_count: usize) -> bool;

    /// Compact the message list. Returns a (possibly) shorter list.
    fn compact(
        &self,
        messages: Vec<Message>,
    ) -> impl Future<Output = Result<Vec<Message>, ContextError>> + WasmCompatSend;

    /// Estimate the token count of a message list.
    fn token_estimate(&self, messages: &[Message]) -> usize;
}
