//! History shortening under a hard token budget
//!
//! Given a system prompt, optional tools and few-shots, the new user turn,
//! and the full past-message history, [`shorten_past_messages`] decides how
//! many of the most recent past messages fit under `max_tokens` — without
//! ever calling a model. The accepted suffix is returned in chronological
//! order, ready to be spliced between the system message and the new user
//! turn.
//!
//! The walk runs newest to oldest. When a message would push the running
//! total over the budget the walk stops and the result drops both that
//! message *and* the most recently accepted one. That extra trim is the
//! contract this crate reproduces, not an accident of this implementation;
//! downstream consumers depend on the exact boundary.
//! TODO: confirm with the product owner whether the extra trimmed message is
//! intentional headroom before relaxing the cut to a plain first-overflow
//! boundary.

use crate::count::{count_tokens_for_message, count_tokens_for_system_and_tools};
use crate::error::{Error, Result};
use crate::tokenizer::{Tokenizer, TokenizerFamily};
use crate::types::{ChatMessage, MessageContent, MessageRole, ToolChoice, ToolDefinition};
use unicode_normalization::UnicodeNormalization;

/// NFC-normalize text so visually identical strings count identically
pub fn normalize_text(text: &str) -> String {
    text.nfc().collect()
}

/// NFC-normalize message content. Image parts are exempt: their payload is
/// binary, not prose.
pub fn normalize_content(content: &MessageContent) -> MessageContent {
    match content {
        MessageContent::Text(text) => MessageContent::Text(normalize_text(text)),
        MessageContent::Parts(parts) => MessageContent::Parts(
            parts
                .iter()
                .map(|part| match part {
                    crate::types::ContentPart::Text { text } => crate::types::ContentPart::Text {
                        text: normalize_text(text),
                    },
                    image @ crate::types::ContentPart::ImageUrl { .. } => image.clone(),
                })
                .collect(),
        ),
    }
}

/// Everything a single shortening call needs
///
/// Request-scoped and immutable once built. `past_messages` must not include
/// the system message; that is always passed and counted separately.
#[derive(Debug, Clone)]
pub struct ShortenRequest {
    /// Model name used for token calculation, like `gpt-3.5-turbo`
    pub model: String,
    /// Which tokenizer family resolves the model
    pub family: TokenizerFamily,
    /// The system prompt text
    pub system_message: String,
    /// Hard ceiling for the assembled prompt
    pub max_tokens: usize,
    /// Tools to include in the conversation
    pub tools: Option<Vec<ToolDefinition>>,
    /// Tool-choice directive
    pub tool_choice: Option<ToolChoice>,
    /// Content of the new user turn to append
    pub new_user_content: Option<MessageContent>,
    /// Few-shot messages inserted after the system prompt; counted, never
    /// truncated
    pub few_shots: Option<Vec<ChatMessage>>,
    /// Past conversation, oldest first, without the system message
    pub past_messages: Vec<ChatMessage>,
    /// Allow the BPE resolver to fall back to the base encoding
    pub fallback_to_default: bool,
}

impl ShortenRequest {
    /// Create a new builder for ShortenRequest
    pub fn builder() -> ShortenRequestBuilder {
        ShortenRequestBuilder::default()
    }
}

/// Builder for ShortenRequest
#[derive(Debug, Default)]
pub struct ShortenRequestBuilder {
    model: Option<String>,
    family: Option<TokenizerFamily>,
    system_message: Option<String>,
    max_tokens: Option<usize>,
    tools: Option<Vec<ToolDefinition>>,
    tool_choice: Option<ToolChoice>,
    new_user_content: Option<MessageContent>,
    few_shots: Option<Vec<ChatMessage>>,
    past_messages: Vec<ChatMessage>,
    fallback_to_default: bool,
}

impl ShortenRequestBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn family(mut self, family: TokenizerFamily) -> Self {
        self.family = Some(family);
        self
    }

    pub fn system_message(mut self, text: impl Into<String>) -> Self {
        self.system_message = Some(text.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = Some(tool_choice);
        self
    }

    pub fn new_user_content(mut self, content: impl Into<MessageContent>) -> Self {
        self.new_user_content = Some(content.into());
        self
    }

    pub fn few_shots(mut self, few_shots: Vec<ChatMessage>) -> Self {
        self.few_shots = Some(few_shots);
        self
    }

    pub fn past_messages(mut self, past_messages: Vec<ChatMessage>) -> Self {
        self.past_messages = past_messages;
        self
    }

    pub fn fallback_to_default(mut self, fallback: bool) -> Self {
        self.fallback_to_default = fallback;
        self
    }

    pub fn build(self) -> Result<ShortenRequest> {
        let model = self
            .model
            .ok_or_else(|| Error::config("model is required"))?;
        let system_message = self
            .system_message
            .ok_or_else(|| Error::config("system_message is required"))?;
        let max_tokens = self
            .max_tokens
            .ok_or_else(|| Error::config("max_tokens is required"))?;

        Ok(ShortenRequest {
            model,
            family: self.family.unwrap_or(TokenizerFamily::Bpe),
            system_message,
            max_tokens,
            tools: self.tools,
            tool_choice: self.tool_choice,
            new_user_content: self.new_user_content,
            few_shots: self.few_shots,
            past_messages: self.past_messages,
            fallback_to_default: self.fallback_to_default,
        })
    }
}

/// Truncate the past-message history to fit within the token budget.
///
/// Seeds a running total with the system/tools cost, the few-shots, and the
/// new user turn, then walks `past_messages` from most recent to oldest,
/// accepting messages while they fit. Returns either the entire history
/// unchanged (budget never exceeded) or the accepted suffix in chronological
/// order, trimmed by one extra message at the cut (see the module docs).
///
/// On the kept path each message must have content
/// ([`Error::MalformedMessage`] otherwise); a malformed message beyond the
/// cut point is never inspected and never raises.
pub fn shorten_past_messages(request: &ShortenRequest) -> Result<Vec<ChatMessage>> {
    let tokenizer = Tokenizer::resolve(
        &request.model,
        request.family,
        request.fallback_to_default,
    )?;

    let system_message = ChatMessage::system(normalize_text(&request.system_message));
    let mut total_token_count = count_tokens_for_system_and_tools(
        Some(&system_message),
        request.tools.as_deref(),
        request.tool_choice.as_ref(),
        &tokenizer,
    )?;

    if let Some(few_shots) = &request.few_shots {
        // Reverse of given order mirrors placement order in the assembled
        // prompt; the sum is the same either way
        for shot in few_shots.iter().rev() {
            if shot.content.is_none() {
                return Err(Error::malformed(
                    "few-shot messages must have both role and content",
                ));
            }
            total_token_count += count_tokens_for_message(shot, &tokenizer)?;
        }
    }

    if let Some(content) = &request.new_user_content {
        let new_user = ChatMessage {
            role: MessageRole::User,
            content: Some(content.clone()),
            name: None,
        };
        total_token_count += count_tokens_for_message(&new_user, &tokenizer)?;
    }

    for (index, message) in request.past_messages.iter().rev().enumerate() {
        let potential_message_count = count_tokens_for_message(message, &tokenizer)?;

        if total_token_count + potential_message_count > request.max_tokens {
            log::info!(
                "Reached max tokens of {}, history will be truncated",
                request.max_tokens
            );
            // Keep one message fewer than was accepted before the overflow
            let keep = index.saturating_sub(1);
            let start = request.past_messages.len() - keep;
            return Ok(request.past_messages[start..].to_vec());
        }

        if message.content.is_none() {
            return Err(Error::malformed(
                "past messages must have both role and content",
            ));
        }
        total_token_count += potential_message_count;
    }

    Ok(request.past_messages.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::count::count_tokens_for_message;

    fn bpe() -> Tokenizer {
        Tokenizer::resolve("gpt-4", TokenizerFamily::Bpe, false).unwrap()
    }

    fn short_history(len: usize) -> Vec<ChatMessage> {
        (0..len)
            .map(|i| {
                if i % 2 == 0 {
                    ChatMessage::user("What about indexing?")
                } else {
                    ChatMessage::assistant("What about indexing?")
                }
            })
            .collect()
    }

    fn base_request() -> ShortenRequestBuilder {
        ShortenRequest::builder()
            .model("gpt-4")
            .family(TokenizerFamily::Bpe)
            .system_message("You are helpful.")
    }

    #[test]
    fn test_builder_requires_model() {
        let err = ShortenRequest::builder()
            .system_message("You are helpful.")
            .max_tokens(100)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_normalize_text_nfc() {
        // e + combining acute collapses to the precomposed form
        let decomposed = "caf\u{0065}\u{0301}";
        let precomposed = "caf\u{00e9}";
        assert_eq!(normalize_text(decomposed), precomposed);

        let tokenizer = bpe();
        assert_eq!(
            tokenizer.count(&normalize_text(decomposed)).unwrap(),
            tokenizer.count(precomposed).unwrap()
        );
    }

    #[test]
    fn test_normalize_content_leaves_images_alone() {
        let content = MessageContent::Parts(vec![
            crate::types::ContentPart::text("caf\u{0065}\u{0301}"),
            crate::types::ContentPart::image("data:image/png;base64,abc", Default::default()),
        ]);
        match normalize_content(&content) {
            MessageContent::Parts(parts) => {
                assert_eq!(
                    parts[0],
                    crate::types::ContentPart::text("caf\u{00e9}")
                );
                assert_eq!(parts[1], crate::types::ContentPart::image(
                    "data:image/png;base64,abc",
                    Default::default(),
                ));
            }
            other => panic!("expected parts, got {other:?}"),
        }
    }

    #[test]
    fn test_everything_fits_returns_history_unchanged() {
        let history = short_history(5);
        let request = base_request()
            .max_tokens(10_000)
            .new_user_content("And what about sharding?")
            .past_messages(history.clone())
            .build()
            .unwrap();

        assert_eq!(shorten_past_messages(&request).unwrap(), history);
    }

    #[test]
    fn test_empty_history_stays_empty() {
        let request = base_request().max_tokens(50).build().unwrap();
        assert_eq!(shorten_past_messages(&request).unwrap(), Vec::new());
    }

    #[test]
    fn test_truncation_cut_drops_one_extra_message() {
        let tokenizer = bpe();
        let history = short_history(5);
        let system_cost = count_tokens_for_message(
            &ChatMessage::system("You are helpful."),
            &tokenizer,
        )
        .unwrap();
        let message_cost = count_tokens_for_message(&history[0], &tokenizer).unwrap();

        // Budget admits the system message plus exactly two history
        // messages; the walk overflows at reversed index 2 and the cut
        // drops one extra, leaving only the newest message.
        let request = base_request()
            .max_tokens(system_cost + 2 * message_cost)
            .past_messages(history.clone())
            .build()
            .unwrap();

        let shortened = shorten_past_messages(&request).unwrap();
        assert_eq!(shortened.len(), 1);
        assert_eq!(shortened[0], history[4]);
    }

    #[test]
    fn test_budget_respected_after_truncation() {
        let tokenizer = bpe();
        let history = short_history(8);
        let request = base_request()
            .max_tokens(100)
            .new_user_content("Tell me more.")
            .past_messages(history.clone())
            .build()
            .unwrap();

        let shortened = shorten_past_messages(&request).unwrap();
        assert!(shortened.len() < history.len(), "budget should force a cut");

        let mut total = count_tokens_for_system_and_tools(
            Some(&ChatMessage::system("You are helpful.")),
            None,
            None,
            &tokenizer,
        )
        .unwrap();
        total += count_tokens_for_message(&ChatMessage::user("Tell me more."), &tokenizer)
            .unwrap();
        for message in &shortened {
            total += count_tokens_for_message(message, &tokenizer).unwrap();
        }
        assert!(total <= 100, "assembled prompt costs {total} > 100");
    }

    #[test]
    fn test_first_message_overflowing_returns_empty() {
        let tokenizer = bpe();
        let system_cost = count_tokens_for_message(
            &ChatMessage::system("You are helpful."),
            &tokenizer,
        )
        .unwrap();
        // Nothing beyond the system message fits
        let request = base_request()
            .max_tokens(system_cost)
            .past_messages(short_history(3))
            .build()
            .unwrap();

        assert!(shorten_past_messages(&request).unwrap().is_empty());
    }

    #[test]
    fn test_chronological_order_preserved() {
        let tokenizer = bpe();
        let history: Vec<ChatMessage> = (0..6)
            .map(|i| ChatMessage::user(format!("message number {i}")))
            .collect();
        let system_cost = count_tokens_for_message(
            &ChatMessage::system("You are helpful."),
            &tokenizer,
        )
        .unwrap();
        let message_cost = count_tokens_for_message(&history[0], &tokenizer).unwrap();

        // Overflow at reversed index 4: three newest survive the extra trim
        let request = base_request()
            .max_tokens(system_cost + 4 * message_cost)
            .past_messages(history.clone())
            .build()
            .unwrap();

        let shortened = shorten_past_messages(&request).unwrap();
        assert_eq!(shortened, history[3..].to_vec());
    }

    #[test]
    fn test_malformed_message_beyond_cut_is_ignored() {
        let tokenizer = bpe();
        let mut history = short_history(4);
        // Oldest message has no content, but the budget cuts before it
        history[0].content = None;

        let system_cost = count_tokens_for_message(
            &ChatMessage::system("You are helpful."),
            &tokenizer,
        )
        .unwrap();
        let message_cost = count_tokens_for_message(&history[3], &tokenizer).unwrap();

        let request = base_request()
            .max_tokens(system_cost + 2 * message_cost)
            .past_messages(history)
            .build()
            .unwrap();

        let shortened = shorten_past_messages(&request).unwrap();
        assert_eq!(shortened.len(), 1);
    }

    #[test]
    fn test_malformed_message_on_kept_path_raises() {
        let mut history = short_history(4);
        history[0].content = None;

        let request = base_request()
            .max_tokens(10_000)
            .past_messages(history)
            .build()
            .unwrap();

        let err = shorten_past_messages(&request).unwrap_err();
        assert!(matches!(err, Error::MalformedMessage(_)));
    }

    #[test]
    fn test_malformed_few_shot_raises() {
        let few_shots = vec![ChatMessage {
            role: MessageRole::User,
            content: None,
            name: None,
        }];
        let request = base_request()
            .max_tokens(10_000)
            .few_shots(few_shots)
            .build()
            .unwrap();

        let err = shorten_past_messages(&request).unwrap_err();
        assert!(matches!(err, Error::MalformedMessage(_)));
    }

    #[test]
    fn test_few_shots_consume_budget() {
        let tokenizer = bpe();
        let history = short_history(6);
        let system_cost = count_tokens_for_message(
            &ChatMessage::system("You are helpful."),
            &tokenizer,
        )
        .unwrap();
        let message_cost = count_tokens_for_message(&history[0], &tokenizer).unwrap();

        // Without few-shots this budget keeps three messages
        let request = base_request()
            .max_tokens(system_cost + 4 * message_cost)
            .past_messages(history.clone())
            .build()
            .unwrap();
        assert_eq!(shorten_past_messages(&request).unwrap().len(), 3);

        // Two few-shots burn the same budget down to one kept message
        let request = base_request()
            .max_tokens(system_cost + 4 * message_cost)
            .few_shots(vec![
                ChatMessage::user("What about indexing?"),
                ChatMessage::assistant("What about indexing?"),
            ])
            .past_messages(history)
            .build()
            .unwrap();
        assert_eq!(shorten_past_messages(&request).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_model_fallback_flag() {
        let request = base_request()
            .model("totally-unknown-model")
            .max_tokens(200)
            .past_messages(short_history(2))
            .build()
            .unwrap();
        let err = shorten_past_messages(&request).unwrap_err();
        assert!(matches!(err, Error::UnknownModel(_)));

        let request = base_request()
            .model("totally-unknown-model")
            .fallback_to_default(true)
            .max_tokens(200)
            .past_messages(short_history(2))
            .build()
            .unwrap();
        assert!(shorten_past_messages(&request).is_ok());
    }
}
