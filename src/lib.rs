//! # prompt-budget
//!
//! Deterministic token accounting and conversation-history shortening for
//! chat-completion prompts.
//!
//! ## Overview
//!
//! A chat request is assembled from a system prompt, optional tool
//! definitions, optional few-shot examples, the past conversation, and the
//! new user turn. All of it must fit under a hard token ceiling derived from
//! the target model's context window. This crate decides — without ever
//! calling a model — exactly how many of the most recent past messages fit,
//! accounting for per-message overhead, tool-definition serialization,
//! tool-choice directives, and per-image vision costs.
//!
//! ## Key Features
//!
//! - **Two tokenizer families**: byte-pair encodings resolved by canonical
//!   model name (with deployment-alias translation and an opt-in fallback),
//!   and pretrained subword tokenizers resolved from a model registry
//! - **Exact message accounting**: role, content, and name fields counted
//!   the way a prompt template actually inlines them
//! - **Vision support**: image parts billed by the published tiling formula
//!   from their decoded resolution
//! - **Tool awareness**: function definitions rendered to the compact
//!   grammar prompt templates use, with the cross-term system/tools discount
//! - **Deterministic shortening**: a newest-to-oldest walk with an explicit,
//!   documented cut boundary
//!
//! ## Example
//!
//! ```rust,no_run
//! use prompt_budget::{ShortenRequest, TokenizerFamily, ChatMessage, shorten_past_messages};
//!
//! fn main() -> prompt_budget::Result<()> {
//!     let request = ShortenRequest::builder()
//!         .model("gpt-4")
//!         .family(TokenizerFamily::Bpe)
//!         .system_message("You answer questions about the employee handbook.")
//!         .max_tokens(3072)
//!         .new_user_content("What does the policy say about remote work?")
//!         .past_messages(vec![
//!             ChatMessage::user("What health plans are offered?"),
//!             ChatMessage::assistant("There are three plans: ..."),
//!         ])
//!         .build()?;
//!
//!     let kept_history = shorten_past_messages(&request)?;
//!     // Splice kept_history between the system message and the new user
//!     // turn when assembling the final prompt.
//!     println!("kept {} past messages", kept_history.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency
//!
//! Every operation is synchronous, CPU-bound, and free of shared mutable
//! state, so calls may run concurrently from any number of request handlers.
//! The one potentially expensive step is resolving a subword tokenizer
//! (a registry lookup that may touch disk or network); callers embedding
//! this crate in an async pipeline should resolve off the hot path or
//! pre-warm, and may cache handles by model name.
//!
//! ## Architecture
//!
//! - **types**: messages, content parts, tool descriptors, tool choice
//! - **tokenizer**: family selection, alias translation, encoder resolution
//! - **image**: per-image token estimation from decoded dimensions
//! - **functions**: tool-definition rendering for token counting
//! - **count**: per-message and system/tools accountants
//! - **shorten**: the budget walk over past messages
//! - **error**: error types and the crate `Result` alias

/// Per-message and combined system/tools token accountants.
mod count;

/// Error types and conversions used across all public APIs.
mod error;

/// Textual rendering of tool definitions in the prompt template's grammar.
mod functions;

/// Image token estimation for vision inputs (base64 data URIs only).
mod image;

/// History shortening under a hard token budget, plus NFC normalization
/// helpers for message text.
mod shorten;

/// Tokenizer family selection and encoder resolution.
mod tokenizer;

/// Core message and tool types in the chat-completions wire shape.
mod types;

// --- Accounting ---

pub use count::{count_tokens_for_message, count_tokens_for_system_and_tools};

// --- Error Handling ---

pub use error::{Error, Result};

// --- Tool Rendering ---

pub use functions::format_function_definitions;

// --- Image Costs ---

pub use image::{count_tokens_for_image, image_dimensions};

// --- History Shortening ---

pub use shorten::{
    ShortenRequest, ShortenRequestBuilder, normalize_content, normalize_text,
    shorten_past_messages,
};

// --- Tokenizers ---

pub use tokenizer::{ModelAliases, Tokenizer, TokenizerFamily};

// --- Core Types ---

pub use types::{
    ChatMessage, ContentPart, ImageDetail, ImageUrl, MessageContent, MessageRole, ToolChoice,
    ToolDefinition, ToolFunction,
};

/// Convenience module containing the most commonly used types and functions.
/// Import with `use prompt_budget::prelude::*;`.
pub mod prelude {
    pub use crate::{
        ChatMessage, ContentPart, Error, ImageDetail, MessageContent, MessageRole, Result,
        ShortenRequest, Tokenizer, TokenizerFamily, ToolChoice, ToolDefinition,
        count_tokens_for_message, count_tokens_for_system_and_tools, shorten_past_messages,
    };
}
