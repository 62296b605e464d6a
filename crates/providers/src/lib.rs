pub mod client;
pub mod factory;
pub mod gemini;

use async_trait::async_trait;
use orb_core::Result;
use serde::Serialize;

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

impl GenerationConfig {
    pub fn new(temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            temperature,
            max_output_tokens,
            top_p: None,
            top_k: None,
        }
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

/// A text-generation service: one prompt in, prose out.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String>;
}

pub use client::build_http_client;
pub use factory::create_provider;
pub use gemini::GeminiProvider;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_config_serializes_camel_case() {
        let cfg = GenerationConfig::new(0.7, 2048).with_top_p(0.8).with_top_k(40);
        let v = serde_json::to_value(&cfg).unwrap();
        assert_eq!(v["maxOutputTokens"], 2048);
        assert_eq!(v["topK"], 40);

        let bare = serde_json::to_value(GenerationConfig::new(0.0, 5)).unwrap();
        assert!(bare.get("topP").is_none());
    }
}
