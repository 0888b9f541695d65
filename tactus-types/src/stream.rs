//! Streaming completion events.
//!
//! Providers that support token-by-token streaming yield a
//! [`StreamHandle`] wrapping a stream of [`StreamEvent`]s rather than
//! a single [`crate::types::CompletionResponse`].

use std::fmt;
use std::pin::Pin;

use futures::Stream;

use crate::types::{Message, TokenUsage};

/// One increment of a streaming completion.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Incremental assistant text.
    TextDelta(String),
    /// Incremental extended-thinking text.
    ThinkingDelta(String),
    /// Incremental thinking-block signature (arrives after the thinking text).
    SignatureDelta(String),
    /// A tool call has started streaming its input.
    ToolUseStart {
        /// The tool call's id, shared by subsequent deltas and the end event.
        id: String,
        /// The tool's name.
        name: String,
    },
    /// Incremental JSON input for a tool call in progress.
    ///
    /// Deltas for different `id`s may interleave when the provider streams
    /// multiple tool calls in parallel; concatenate by `id` to reassemble.
    ToolUseInputDelta {
        /// The tool call this delta belongs to.
        id: String,
        /// The next fragment of the JSON input, in order.
        delta: String,
    },
    /// A tool call's input has finished streaming.
    ToolUseEnd {
        /// The tool call that finished.
        id: String,
    },
    /// Token usage, typically emitted once near the end of the stream.
    Usage(TokenUsage),
    /// The fully assembled message, emitted once the stream completes.
    MessageComplete(Message),
    /// The stream terminated with an error.
    Error(StreamError),
}

/// An error encountered while consuming a provider stream.
#[derive(Debug, Clone)]
pub struct StreamError {
    /// Human-readable error message.
    pub message: String,
    /// Whether the caller should retry the request.
    pub is_retryable: bool,
}

impl StreamError {
    /// Construct a non-retryable stream error.
    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_retryable: false,
        }
    }

    /// Construct a retryable stream error.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_retryable: true,
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StreamError {}

/// A handle to an in-flight streaming completion.
///
/// Wraps a boxed, pinned stream of [`StreamEvent`]s. `Debug` is
/// implemented by hand since the underlying stream has no useful
/// debug representation of its own.
pub struct StreamHandle {
    /// The underlying event stream.
    pub receiver: Pin<Box<dyn Stream<Item = StreamEvent> + Send>>,
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StreamHandle")
    }
}
