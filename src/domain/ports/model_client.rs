//! Opaque language-model invocation port.

use async_trait::async_trait;

use crate::domain::errors::ModelError;
use crate::domain::models::Prompt;

/// One completed model invocation: response text plus token accounting.
#[derive(Debug, Clone)]
pub struct ModelCompletion {
    pub text: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Language-model invocation: prompt in, text and token counts out.
///
/// Implementations own their transport concerns (auth, retries); errors
/// reach the loop only once those are exhausted.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send `prompt` and await the full response.
    async fn invoke(&self, prompt: &Prompt, max_tokens: u32)
        -> Result<ModelCompletion, ModelError>;
}
