//! Tokenizer resolution for the two supported encoder families
//!
//! The BPE family covers hosted GPT-style models and is resolved by canonical
//! model name through `tiktoken-rs`, after translating deployment-style
//! aliases (the hyphenated Azure names). The subword family covers
//! registry-hosted models and is resolved through the HuggingFace
//! `tokenizers` crate; loading one may read the local cache or the network,
//! so callers on a hot path should resolve once and reuse the handle.
//! Resolution is idempotent and holds no global state.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tiktoken_rs::CoreBPE;

/// Which encoder family a model belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerFamily {
    /// Byte-pair encoding keyed by canonical model name
    Bpe,
    /// Pretrained subword tokenizer keyed by a registry model identifier
    Subword,
}

impl FromStr for TokenizerFamily {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "bpe" => Ok(TokenizerFamily::Bpe),
            "subword" => Ok(TokenizerFamily::Subword),
            other => Err(Error::UnsupportedTokenizerFamily(other.to_string())),
        }
    }
}

/// Immutable table translating deployment-style model names to the canonical
/// names the BPE registry knows.
///
/// Owned by the resolver rather than living in process-wide state; construct
/// a custom table with [`ModelAliases::new`] if a deployment uses different
/// names.
#[derive(Debug, Clone)]
pub struct ModelAliases {
    entries: Vec<(String, String)>,
}

impl Default for ModelAliases {
    fn default() -> Self {
        Self::new([
            ("gpt-35-turbo", "gpt-3.5-turbo"),
            ("gpt-35-turbo-16k", "gpt-3.5-turbo-16k"),
            ("gpt-4v", "gpt-4-turbo-vision"),
        ])
    }
}

impl ModelAliases {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(alias, canonical)| (alias.into(), canonical.into()))
                .collect(),
        }
    }

    /// Translate a deployment alias, or return the name unchanged
    pub fn canonical<'a>(&'a self, model: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(alias, _)| alias == model)
            .map(|(_, canonical)| canonical.as_str())
            .unwrap_or(model)
    }
}

/// A resolved encoder for a specific model
///
/// Supports exactly one operation: turning text into a token count. Created
/// on demand per call; callers may cache by model name, and repeated
/// resolution is side-effect-free.
pub enum Tokenizer {
    Bpe(CoreBPE),
    Subword(Box<tokenizers::Tokenizer>),
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tokenizer::Bpe(_) => f.write_str("Tokenizer::Bpe"),
            Tokenizer::Subword(_) => f.write_str("Tokenizer::Subword"),
        }
    }
}

impl Tokenizer {
    /// Resolve an encoder for `model` in the given family.
    ///
    /// For the BPE family, `allow_fallback` permits falling back to the
    /// generic `cl100k_base` encoding (with a logged warning) when the model
    /// is unknown or unnamed; with the flag off this is an
    /// [`Error::UnknownModel`]. The subword family has no fallback: any load
    /// failure is fatal.
    pub fn resolve(model: &str, family: TokenizerFamily, allow_fallback: bool) -> Result<Self> {
        match family {
            TokenizerFamily::Bpe => {
                Self::resolve_bpe(model, &ModelAliases::default(), allow_fallback)
            }
            TokenizerFamily::Subword => Self::resolve_subword(model),
        }
    }

    /// Resolve a BPE encoder using a caller-supplied alias table
    pub fn resolve_bpe(model: &str, aliases: &ModelAliases, allow_fallback: bool) -> Result<Self> {
        if model.is_empty() {
            if !allow_fallback {
                return Err(Error::config("expected a valid model name"));
            }
            log::warn!("No model name given, defaulting to cl100k_base encoding");
            return Self::base_encoding();
        }

        let canonical = aliases.canonical(model);
        match tiktoken_rs::get_bpe_from_model(canonical) {
            Ok(bpe) => Ok(Tokenizer::Bpe(bpe)),
            Err(_) if allow_fallback => {
                log::warn!("Model {canonical} not found, defaulting to cl100k_base encoding");
                Self::base_encoding()
            }
            Err(_) => Err(Error::unknown_model(canonical)),
        }
    }

    /// Resolve a pretrained subword tokenizer from the model registry
    pub fn resolve_subword(model: &str) -> Result<Self> {
        if model.is_empty() {
            return Err(Error::config("expected a valid model identifier"));
        }
        let tokenizer = tokenizers::Tokenizer::from_pretrained(model, None)
            .map_err(|err| Error::tokenizer_load(model, err))?;
        Ok(Tokenizer::Subword(Box::new(tokenizer)))
    }

    fn base_encoding() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|err| Error::tokenizer_load("cl100k_base", err.to_string()))?;
        Ok(Tokenizer::Bpe(bpe))
    }

    /// Count the tokens `text` encodes to
    pub fn count(&self, text: &str) -> Result<usize> {
        match self {
            Tokenizer::Bpe(bpe) => Ok(bpe.encode_ordinary(text).len()),
            // Subword tokenizers count special tokens, matching how their
            // prompt templates consume text
            Tokenizer::Subword(tokenizer) => tokenizer
                .encode(text, true)
                .map(|encoding| encoding.len())
                .map_err(|err| {
                    Error::unsupported_content(format!("subword tokenizer could not encode: {err}"))
                }),
        }
    }
}
