//! F. Session — per-(invocation, agent) ordered message history, tagged
//! with a visibility class, plus the filter chain that derives what a
//! particular consumer (the model, a chat transcript, a notification
//! feed) actually gets to see.
//!
//! A [`Session`] is durably reconstructible from the event log: every
//! push corresponds to a `message_appended`-shaped event recorded by
//! whatever owns the session (normally the agent turn loop), and replay
//! rebuilds the same history by replaying those events in order. This
//! module only holds the in-memory shape and the filters; durability is
//! the caller's job, the same split `tactus-context`'s turn-level
//! [`crate::SlidingWindow`] already makes between "what to keep" and
//! "how it got here."
//!
//! Filters are grounded on the compaction strategies in
//! [`crate::strategies`] (itself generalized from the teacher's
//! `neuron-context::strategies`), but operate on [`SessionMessage`]
//! rather than bare [`tactus_types::Message`] so that visibility can
//! participate in the decision — [`HideClass`] has no equivalent
//! upstream because the teacher's messages carry no visibility class.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tactus_types::{ContentBlock, Message, Role};

use crate::counter::TokenCounter;

/// Who (or what) a session message is meant for.
///
/// Mirrors the data model's visibility classes: a message always lives
/// in history, but a given consumer may only ever see a subset of it.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    /// Bookkeeping only — never rendered to the model or to a human.
    Internal,
    /// An ordinary conversational turn.
    Chat,
    /// Informational; does not expect a response.
    Notification,
    /// Waiting on a human approval decision.
    PendingApproval,
    /// Waiting on human free-form input.
    PendingInput,
    /// Waiting on a human review.
    PendingReview,
}

/// One entry in a [`Session`]'s history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    /// The message's role.
    pub role: Role,
    /// The message's content blocks.
    pub content: Vec<ContentBlock>,
    /// Who this message is currently visible to.
    pub visibility: Visibility,
    /// Name of the tool this message is a result of, if any.
    pub tool_name: Option<String>,
}

impl SessionMessage {
    /// Creates a new session message with the given visibility class.
    #[must_use]
    pub fn new(role: Role, content: Vec<ContentBlock>, visibility: Visibility) -> Self {
        Self {
            role,
            content,
            visibility,
            tool_name: None,
        }
    }

    /// Creates a plain chat-visible text message.
    #[must_use]
    pub fn chat(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, vec![ContentBlock::Text(text.into())], Visibility::Chat)
    }

    /// Attaches a tool name, marking this as a tool-call-related entry.
    #[must_use]
    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    /// Renders this entry as a plain provider message, dropping
    /// everything a [`Message`] has no room for (visibility, tool name).
    #[must_use]
    pub fn to_message(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Derives a subset or reshaping of a session's history for one
/// consumer. Filters never mutate the session itself — `Session::history`
/// always returns the full, unfiltered record.
pub trait SessionFilter: Send + Sync {
    /// Applies this filter to a history, returning the derived view.
    fn apply(&self, messages: Vec<SessionMessage>) -> Vec<SessionMessage>;
}

/// Drops the oldest non-system messages until the remainder fits a
/// token budget estimated by [`TokenCounter`].
pub struct TokenBudget {
    limit: usize,
    counter: TokenCounter,
}

impl TokenBudget {
    /// Creates a filter that keeps history under `limit` estimated tokens.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            counter: TokenCounter::new(),
        }
    }

    fn estimate(&self, messages: &[SessionMessage]) -> usize {
        let rendered: Vec<Message> = messages.iter().map(SessionMessage::to_message).collect();
        self.counter.estimate_messages(&rendered)
    }
}

impl SessionFilter for TokenBudget {
    fn apply(&self, messages: Vec<SessionMessage>) -> Vec<SessionMessage> {
        if self.estimate(&messages) <= self.limit {
            return messages;
        }

        let (system, mut rest): (Vec<_>, Vec<_>) = messages
            .into_iter()
            .partition(|m| matches!(m.role, Role::System));

        while self.estimate(&system) + self.estimate(&rest) > self.limit && !rest.is_empty() {
            rest.remove(0);
        }

        let mut kept = system;
        kept.extend(rest);
        kept
    }
}

/// Keeps the most recent `keep` tool-result messages intact, replacing
/// the content of earlier ones with a placeholder.
pub struct LimitToolResults {
    keep: usize,
}

impl LimitToolResults {
    /// Creates a filter keeping the `keep` most recent tool results.
    #[must_use]
    pub fn new(keep: usize) -> Self {
        Self { keep }
    }
}

impl SessionFilter for LimitToolResults {
    fn apply(&self, messages: Vec<SessionMessage>) -> Vec<SessionMessage> {
        let total_results = messages
            .iter()
            .filter(|m| m.tool_name.is_some())
            .count();
        if total_results <= self.keep {
            return messages;
        }

        let mut seen = 0;
        let cutoff = total_results - self.keep;
        messages
            .into_iter()
            .map(|mut m| {
                if m.tool_name.is_some() {
                    seen += 1;
                    if seen <= cutoff {
                        m.content = vec![ContentBlock::Text("[tool result cleared]".to_string())];
                    }
                }
                m
            })
            .collect()
    }
}

/// Drops every message of a given visibility class from the derived
/// view. The class most often hidden is [`Visibility::Internal`], which
/// lets a session carry scratch bookkeeping the model never sees.
pub struct HideClass {
    class: Visibility,
}

impl HideClass {
    /// Creates a filter that hides every message of the given class.
    #[must_use]
    pub fn new(class: Visibility) -> Self {
        Self { class }
    }
}

impl SessionFilter for HideClass {
    fn apply(&self, messages: Vec<SessionMessage>) -> Vec<SessionMessage> {
        messages
            .into_iter()
            .filter(|m| m.visibility != self.class)
            .collect()
    }
}

/// Runs a chain of filters in order, each seeing the previous filter's
/// output.
pub struct Composed {
    filters: Vec<Box<dyn SessionFilter>>,
}

impl Composed {
    /// Creates an empty filter chain.
    #[must_use]
    pub fn new() -> Self {
        Self { filters: Vec::new() }
    }

    /// Appends a filter to the chain, returning `self` for chaining.
    #[must_use]
    pub fn push(mut self, filter: impl SessionFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Default for Composed {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionFilter for Composed {
    fn apply(&self, messages: Vec<SessionMessage>) -> Vec<SessionMessage> {
        self.filters
            .iter()
            .fold(messages, |acc, filter| filter.apply(acc))
    }
}

/// Per-(invocation, agent) ordered message history.
///
/// Scripts see this through five operations: `history()`, `clear()`,
/// `inject_system(text)`, `save_to(key)`, `load_from(key)` — see
/// `tactus-script`'s `Session` binding.
pub struct Session {
    messages: Vec<SessionMessage>,
    saved: HashMap<String, Vec<SessionMessage>>,
}

impl Session {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            saved: HashMap::new(),
        }
    }

    /// Appends a message to the session's history.
    pub fn push(&mut self, message: SessionMessage) {
        self.messages.push(message);
    }

    /// Returns the full, unfiltered history.
    #[must_use]
    pub fn history(&self) -> &[SessionMessage] {
        &self.messages
    }

    /// Clears the session's history. Saved snapshots are untouched.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Appends an internal-visibility system message, e.g. steering
    /// instructions injected by a script mid-run.
    pub fn inject_system(&mut self, text: impl Into<String>) {
        self.messages.push(SessionMessage::new(
            Role::System,
            vec![ContentBlock::Text(text.into())],
            Visibility::Internal,
        ));
    }

    /// Snapshots the current history under `key`, overwriting any
    /// previous snapshot with the same name.
    pub fn save_to(&mut self, key: impl Into<String>) {
        self.saved.insert(key.into(), self.messages.clone());
    }

    /// Restores the history saved under `key`. Returns `false` and
    /// leaves the session untouched if no such snapshot exists.
    pub fn load_from(&mut self, key: &str) -> bool {
        match self.saved.get(key) {
            Some(snapshot) => {
                self.messages = snapshot.clone();
                true
            }
            None => false,
        }
    }

    /// Applies a filter to the history and renders the result as plain
    /// provider messages, ready to hand to a [`tactus_types::Provider`].
    #[must_use]
    pub fn render(&self, filter: &dyn SessionFilter) -> Vec<Message> {
        filter
            .apply(self.messages.clone())
            .iter()
            .map(SessionMessage::to_message)
            .collect()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
