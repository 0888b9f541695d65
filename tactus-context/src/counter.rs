//! Token estimation shared by the [`crate::strategies`] module.

use tactus_types::{ContentBlock, ContentItem, Message};

/// Rough token estimator used by the built-in [`crate::strategies`].
///
/// Estimates by character count rather than an actual tokenizer — good
/// enough to decide whether compaction is due, not to bill usage.
pub struct TokenCounter {
    chars_per_token: usize,
}

impl TokenCounter {
    /// Creates a counter using the default 4-chars-per-token ratio.
    #[must_use]
    pub fn new() -> Self {
        Self { chars_per_token: 4 }
    }

    /// Creates a counter with a custom chars-per-token ratio.
    #[must_use]
    pub fn with_ratio(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }

    /// Estimate the total token count of a message list.
    pub fn estimate_messages(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.estimate_message(m)).sum()
    }

    fn estimate_message(&self, message: &Message) -> usize {
        message
            .content
            .iter()
            .map(|block| self.estimate_block(block))
            .sum::<usize>()
            + 4 // overhead per message (role, formatting)
    }

    fn estimate_block(&self, block: &ContentBlock) -> usize {
        match block {
            ContentBlock::Text(text) => text.len() / self.chars_per_token,
            ContentBlock::Thinking { thinking, .. } => thinking.len() / self.chars_per_token,
            ContentBlock::RedactedThinking { data } => data.len() / self.chars_per_token,
            ContentBlock::ToolUse { input, .. } => input.to_string().len() / self.chars_per_token,
            ContentBlock::ToolResult { content, .. } => content
                .iter()
                .map(|item| self.estimate_content_item(item))
                .sum(),
            ContentBlock::Image { .. } => 1000,
            ContentBlock::Document { .. } => 1000,
            ContentBlock::Compaction { content } => content.len() / self.chars_per_token,
        }
    }

    fn estimate_content_item(&self, item: &ContentItem) -> usize {
        match item {
            ContentItem::Text(text) => text.len() / self.chars_per_token,
            ContentItem::Image { .. } => 1000,
        }
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactus_types::Role;

    fn text_message(role: Role, text: &str) -> Message {
        Message {
            role,
            content: vec![ContentBlock::Text(text.to_string())],
        }
    }

    #[test]
    fn estimates_text_by_chars_per_token() {
        let counter = TokenCounter::new();
        let messages = vec![text_message(Role::User, &"a".repeat(400))];
        assert_eq!(counter.estimate_messages(&messages), 104);
    }

    #[test]
    fn custom_ratio_changes_estimate() {
        let counter = TokenCounter::with_ratio(2);
        let messages = vec![text_message(Role::User, &"a".repeat(400))];
        assert_eq!(counter.estimate_messages(&messages), 204);
    }

    #[test]
    fn image_blocks_have_fixed_cost() {
        let counter = TokenCounter::new();
        let messages = vec![Message {
            role: Role::User,
            content: vec![ContentBlock::Image {
                source: tactus_types::ImageSource::Url {
                    url: "https://example.com/x.png".to_string(),
                },
            }],
        }];
        assert_eq!(counter.estimate_messages(&messages), 1004);
    }
}
