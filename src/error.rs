// src/error.rs

//! Unified error handling for the harvester.

use std::fmt;

use thiserror::Error;

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error, fatal before any network activity
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Every fetch attempt for a URL failed
    #[error("Transport failure for {url} after {attempts} attempts")]
    Transport { url: String, attempts: u32 },

    /// Page body did not have the expected structure
    #[error("Parse failure for {url}: {message}")]
    Parse { url: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a transport failure for an exhausted URL.
    pub fn transport(url: impl Into<String>, attempts: u32) -> Self {
        Self::Transport {
            url: url.into(),
            attempts,
        }
    }

    /// Create a parse failure with context.
    pub fn parse(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error only costs the item it belongs to.
    ///
    /// Transport and parse failures drop one page or one post; the run goes on.
    pub fn is_item_loss(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Parse { .. })
    }
}
