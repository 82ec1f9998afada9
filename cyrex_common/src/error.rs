//! Error handling utilities for the Cyrex compiler

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for the Cyrex compiler
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CyrexError {
    #[error("lexical error: {message}")]
    Lex { message: String },

    #[error("parse error: {message}")]
    Parse { message: String },

    #[error("error: {message}")]
    Ir { message: String },
}

/// Result type alias for Cyrex compiler operations
pub type CyrexResult<T> = Result<T, CyrexError>;

impl CyrexError {
    pub fn lex(message: impl Into<String>) -> Self {
        Self::Lex { message: message.into() }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into() }
    }

    pub fn ir(message: impl Into<String>) -> Self {
        Self::Ir { message: message.into() }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Lex { message } | Self::Parse { message } | Self::Ir { message } => message,
        }
    }
}
