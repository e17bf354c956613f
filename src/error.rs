//! Error types for prompt-budget
//!
//! Every error in this crate is fatal at the point of detection: there is no
//! retry, no silent default substitution, and no local recovery. The single
//! sanctioned soft path is the opt-in base-encoding fallback in the BPE
//! tokenizer resolver, which is gated by an explicit flag at the call site.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// A message is missing its role or content where one is required
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A content field is neither a string nor a recognized part list
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// BPE family, model not found, and fallback was not allowed
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// A subword tokenizer failed to load from the registry
    #[error("could not load tokenizer for model '{model}'")]
    TokenizerLoad {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A tokenizer family string was neither "bpe" nor "subword"
    #[error("unsupported tokenizer family: {0}")]
    UnsupportedTokenizerFamily(String),

    /// Image content is not a valid base64 data URI or failed to decode
    #[error("invalid image URI: {0}")]
    InvalidImageUri(String),

    /// Invalid request configuration (builder validation)
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create a new malformed message error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedMessage(msg.into())
    }

    /// Create a new unsupported content type error
    pub fn unsupported_content(msg: impl Into<String>) -> Self {
        Error::UnsupportedContentType(msg.into())
    }

    /// Create a new unknown model error
    pub fn unknown_model(model: impl Into<String>) -> Self {
        Error::UnknownModel(model.into())
    }

    /// Create a new tokenizer load error wrapping the underlying cause
    pub fn tokenizer_load(
        model: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::TokenizerLoad {
            model: model.into(),
            source: source.into(),
        }
    }

    /// Create a new invalid image URI error
    pub fn invalid_image(msg: impl Into<String>) -> Self {
        Error::InvalidImageUri(msg.into())
    }

    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}
