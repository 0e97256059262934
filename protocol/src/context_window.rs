use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

/// Context window size used when neither the conversation nor the request
/// specifies one.
pub const DEFAULT_CONTEXT_WINDOW_SIZE: ContextWindowSize = ContextWindowSize(2048);

/// Number of tokens the model keeps in its context (`num_ctx` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct ContextWindowSize(u64);

impl ContextWindowSize {
    pub fn new(tokens: u64) -> Result<Self, ContextWindowSizeError> {
        if tokens == 0 {
            return Err(ContextWindowSizeError::Zero);
        }
        Ok(Self(tokens))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for ContextWindowSize {
    type Error = ContextWindowSizeError;

    fn try_from(tokens: u64) -> Result<Self, Self::Error> {
        Self::new(tokens)
    }
}

impl From<ContextWindowSize> for u64 {
    fn from(size: ContextWindowSize) -> Self {
        size.0
    }
}

impl Default for ContextWindowSize {
    fn default() -> Self {
        DEFAULT_CONTEXT_WINDOW_SIZE
    }
}

impl Display for ContextWindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextWindowSizeError {
    #[error("context window size is empty")]
    Empty,
    #[error("context window size must be a whole number of tokens, got {0:?}")]
    Invalid(String),
    #[error("context window size must be greater than zero")]
    Zero,
    #[error("context window size {0} is too large")]
    TooLarge(String),
}

impl FromStr for ContextWindowSize {
    type Err = ContextWindowSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ContextWindowSizeError::Empty);
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ContextWindowSizeError::Invalid(trimmed.to_string()));
        }
        // All digits, so the only way `parse` can fail is overflow.
        let tokens: u64 = trimmed
            .parse()
            .map_err(|_| ContextWindowSizeError::TooLarge(trimmed.to_string()))?;
        Self::new(tokens)
    }
}

/// Raw text reported by the context window input on every commit.
///
/// The input does not validate what it commits; owners parse the value with
/// [`CommittedValue::parse`] at the point where they store it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedValue {
    text: String,
}

impl CommittedValue {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn parse(&self) -> Result<ContextWindowSize, ContextWindowSizeError> {
        self.text.parse()
    }
}

impl Display for CommittedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// One entry of the context window preset list offered by the `/` picker.
///
/// Templates may contain `{{name}}` placeholders that are filled in by the
/// user after selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextWindowPreset {
    Size(ContextWindowSize),
    Template(String),
}

impl ContextWindowPreset {
    pub fn default_presets() -> Vec<ContextWindowPreset> {
        [2048, 4096, 8192, 16384, 32768]
            .into_iter()
            .map(|tokens| ContextWindowPreset::Size(ContextWindowSize(tokens)))
            .collect()
    }
}

impl From<ContextWindowSize> for ContextWindowPreset {
    fn from(size: ContextWindowSize) -> Self {
        ContextWindowPreset::Size(size)
    }
}

impl Display for ContextWindowPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextWindowPreset::Size(size) => write!(f, "{size}"),
            ContextWindowPreset::Template(template) => f.write_str(template),
        }
    }
}
