//! The LLM seam.
//!
//! The assistant sends one system briefing plus one user question and
//! waits for the whole answer; there is no streaming or tool use.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;

/// One chat completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub model: String,
    pub messages: Vec<Message>,
    /// Sampling temperature, 0.0 to 2.0.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub message: Message,
    pub usage: Option<Usage>,
    /// Model that answered; may be a dated variant of the one requested.
    pub model: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Name used in logs, e.g. `openai`.
    fn name(&self) -> &str;

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}
