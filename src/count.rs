//! Token accounting for individual messages and for the system/tools block
//!
//! The per-message constants are deliberately conservative: every message is
//! charged a 3-token wrapper plus a 3-token reply primer, even historical
//! messages that will never be the final turn. Over-counting by a handful of
//! tokens keeps assembled prompts safely inside the model's window;
//! under-counting fails the request.

use crate::error::{Error, Result};
use crate::functions::format_function_definitions;
use crate::image::count_tokens_for_image;
use crate::tokenizer::Tokenizer;
use crate::types::{ChatMessage, ContentPart, MessageContent, ToolChoice, ToolDefinition};

/// Fixed wrapper cost per message (role markers and separators)
const TOKENS_PER_MESSAGE: usize = 3;

/// Fixed cost of priming the assistant reply, charged per counted message
const REPLY_PRIMER_TOKENS: usize = 3;

/// Fixed overhead of the tools block when any tools are present
const TOOLS_BLOCK_TOKENS: usize = 9;

/// Empirical overlap between the system message and the tools block
const SYSTEM_AND_TOOLS_DISCOUNT: usize = 4;

/// Calculate the number of tokens required to encode one message.
///
/// Counts the role string, the content (text encoded, image parts estimated
/// by resolution), the optional `name` field, and the fixed per-message
/// overheads. A message with missing content is a fatal
/// [`Error::MalformedMessage`], never a zero-cost message.
///
/// For `{role: user, content: "Hello, how are you?"}` under a recent BPE
/// model this returns 13.
pub fn count_tokens_for_message(message: &ChatMessage, tokenizer: &Tokenizer) -> Result<usize> {
    let content = message
        .content
        .as_ref()
        .ok_or_else(|| Error::malformed("message content is missing"))?;

    let mut tokens = TOKENS_PER_MESSAGE;
    tokens += tokenizer.count(message.role.as_str())?;

    match content {
        MessageContent::Text(text) => {
            tokens += tokenizer.count(text)?;
        }
        MessageContent::Parts(parts) => {
            // The part's `type` discriminator is not counted
            for part in parts {
                match part {
                    ContentPart::Text { text } => {
                        tokens += tokenizer.count(text)?;
                    }
                    ContentPart::ImageUrl { image_url } => {
                        tokens += count_tokens_for_image(&image_url.url, image_url.detail)?;
                    }
                }
            }
        }
    }

    if let Some(name) = &message.name {
        tokens += tokenizer.count(name)? + 1;
    }

    tokens += REPLY_PRIMER_TOKENS;
    log::debug!("counted {tokens} tokens for {} message", message.role.as_str());
    Ok(tokens)
}

/// Calculate the combined token cost of the system message and tools block.
///
/// The two must be counted together: the tools block costs a fixed overhead
/// on top of its rendered function definitions, but 4 of those tokens overlap
/// with the system message when both are present. The tool-choice directive
/// adds 1 token for `"none"`, 7 plus the encoded tool name for a forced
/// selection, and nothing for `"auto"`/unset.
pub fn count_tokens_for_system_and_tools(
    system_message: Option<&ChatMessage>,
    tools: Option<&[ToolDefinition]>,
    tool_choice: Option<&ToolChoice>,
    tokenizer: &Tokenizer,
) -> Result<usize> {
    let mut tokens = 0;

    if let Some(system_message) = system_message {
        tokens += count_tokens_for_message(system_message, tokenizer)?;
    }

    let tools = tools.filter(|tools| !tools.is_empty());
    if let Some(tools) = tools {
        tokens += tokenizer.count(&format_function_definitions(tools))?;
        tokens += TOOLS_BLOCK_TOKENS;
        if system_message.is_some() {
            tokens -= SYSTEM_AND_TOOLS_DISCOUNT;
        }
    }

    match tool_choice {
        Some(ToolChoice::None) => tokens += 1,
        Some(ToolChoice::Function { name }) => tokens += 7 + tokenizer.count(name)?,
        Some(ToolChoice::Auto) | None => {}
    }

    Ok(tokens)
}
