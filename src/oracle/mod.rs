//! The generative oracle: trait, HTTP transports, prompts and response parsing.
//!
//! The orchestrator only ever sees [`Oracle::generate`]: a request of two
//! strings in, raw text out. Timeouts and cancellation belong to the
//! transport; a returned error is treated as a failed attempt.

mod prompt;
mod response;
mod transport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use prompt::PromptBuilder;
pub use response::{parse_response, OracleProposal, OracleReply, NO_VALUE_SENTINEL};
pub use transport::{HttpOracle, OracleProvider, TransportConfig};

/// What is sent to the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleRequest {
    pub system_instruction: String,
    pub user_prompt: String,
}

impl OracleRequest {
    pub fn new(system_instruction: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            user_prompt: user_prompt.into(),
        }
    }
}

/// Source of candidate values and validators.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Issue one request and return the raw response text.
    async fn generate(&self, request: &OracleRequest) -> Result<String>;

    /// Identifier for logs.
    fn name(&self) -> String;
}
