//! Error types for constraint-synth.

use thiserror::Error;

use crate::predicate::PredicateError;

/// Result type alias using constraint-synth's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during synthesis, ranking and cache inspection.
#[derive(Error, Debug)]
pub enum Error {
    /// Oracle transport failed or returned nothing usable
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// Oracle provider rejected the request
    #[error("Oracle API error: {provider} - {message}")]
    OracleApi { provider: String, message: String },

    /// Oracle response was not well-formed
    #[error("Response parse error: {0}")]
    ResponseParse(String),

    /// Predicate source failed to compile
    #[error("Predicate error: {0}")]
    Predicate(#[from] PredicateError),

    /// Ranking was asked to choose from nothing
    #[error("Cannot select from an empty candidate set")]
    EmptyCandidateSet,

    /// Attempt budget consumed without a validated value
    #[error("Synthesis exhausted for '{type_text}' after {attempts} attempts")]
    SynthesisExhausted { type_text: String, attempts: u32 },

    /// Cache storage error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an oracle API error.
    pub fn oracle_api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OracleApi {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a synthesis exhausted error.
    pub fn exhausted(type_text: impl Into<String>, attempts: u32) -> Self {
        Self::SynthesisExhausted {
            type_text: type_text.into(),
            attempts,
        }
    }

    /// Whether this error ends synthesis for the bundle outright.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::SynthesisExhausted { .. } | Self::Config(_))
    }
}
