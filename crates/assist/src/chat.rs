use orb_core::{Error, Result};
use orb_providers::{GenerationConfig, Provider};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Free-form prompt straight to the model.
pub async fn chat(provider: &dyn Provider, prompt: &str) -> Result<ChatResponse> {
    if prompt.trim().is_empty() {
        return Err(Error::Validation("Prompt is required".to_string()));
    }
    info!(prompt_len = prompt.len(), "Chat request");
    let config = GenerationConfig::new(0.7, 1024).with_top_p(0.8).with_top_k(40);
    let reply = provider.generate(prompt, &config).await?;
    Ok(ChatResponse { reply })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CannedProvider;

    #[tokio::test]
    async fn test_chat_reply() {
        let provider = CannedProvider::replying("Hello!");
        let resp = chat(&provider, "hi").await.unwrap();
        assert_eq!(resp, ChatResponse { reply: "Hello!".into() });
        assert_eq!(provider.last_call().1.max_output_tokens, 1024);
    }

    #[tokio::test]
    async fn test_chat_requires_prompt() {
        let provider = CannedProvider::replying("unused");
        assert!(matches!(chat(&provider, "").await, Err(Error::Validation(_))));
    }
}
