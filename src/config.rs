//! Hint mode configuration.
//!
//! Read once when the controller is built and copied into every session,
//! so a session never observes a configuration change mid-flight.

use std::collections::HashSet;

/// Default hint alphabet: home row first, then the easiest reaches.
pub const DEFAULT_ALPHABET: &str = "sadfjklewcmpgh";

/// Default overlay label text size, in points.
pub const DEFAULT_TEXT_SIZE: f32 = 14.0;

/// Configuration errors, reported before any session is started.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("hint alphabet is empty")]
    EmptyAlphabet,

    #[error("hint alphabet contains whitespace")]
    WhitespaceInAlphabet,

    #[error("hint alphabet repeats letter {0:?}")]
    DuplicateLetter(char),

    #[error("text size must be a positive number, got {0}")]
    InvalidTextSize(f32),
}

/// Static hint mode settings.
#[derive(Debug, Clone, PartialEq)]
pub struct HintConfig {
    /// Characters the Hint Source may use for labels. Case-insensitive.
    pub alphabet: String,
    /// Overlay label text size.
    pub text_size: f32,
}

impl Default for HintConfig {
    fn default() -> Self {
        Self {
            alphabet: DEFAULT_ALPHABET.to_string(),
            text_size: DEFAULT_TEXT_SIZE,
        }
    }
}

impl HintConfig {
    pub fn new(alphabet: impl Into<String>, text_size: f32) -> Result<Self, ConfigError> {
        let config = Self {
            alphabet: alphabet.into(),
            text_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the alphabet is usable for labels and the text size is sane.
    ///
    /// Letters are compared case-insensitively, so `"aA"` is a duplicate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alphabet.is_empty() {
            return Err(ConfigError::EmptyAlphabet);
        }

        let mut seen = HashSet::new();
        for c in self.alphabet.chars() {
            if c.is_whitespace() {
                return Err(ConfigError::WhitespaceInAlphabet);
            }
            for upper in c.to_uppercase() {
                if !seen.insert(upper) {
                    return Err(ConfigError::DuplicateLetter(c));
                }
            }
        }

        if !self.text_size.is_finite() || self.text_size <= 0.0 {
            return Err(ConfigError::InvalidTextSize(self.text_size));
        }

        Ok(())
    }
}
