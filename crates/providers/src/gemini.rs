use async_trait::async_trait;
use orb_core::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::client::build_http_client;
use crate::{GenerationConfig, Provider};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: &str, api_base: Option<&str>, model: &str) -> Self {
        Self::with_client(Client::new(), api_key, api_base, model)
    }

    pub fn with_options(
        api_key: &str,
        api_base: Option<&str>,
        model: &str,
        proxy: Option<&str>,
        timeout: Duration,
    ) -> Self {
        Self::with_client(build_http_client(proxy, timeout), api_key, api_base, model)
    }

    fn with_client(client: Client, api_key: &str, api_base: Option<&str>, model: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            api_base: api_base
                .unwrap_or(GEMINI_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
        }
    }

    /// Normalize model name: strip "gemini/" prefix if present.
    fn normalize_model(model: &str) -> &str {
        model.strip_prefix("gemini/").unwrap_or(model)
    }

    fn build_request(prompt: &str, config: &GenerationConfig) -> Value {
        json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": config,
        })
    }

    /// Text of the first candidate's first part.
    fn parse_text(raw_body: &str) -> Result<String> {
        let resp: GeminiResponse = serde_json::from_str(raw_body)
            .map_err(|e| Error::MalformedResponse(format!("Invalid response structure: {}", e)))?;

        let candidate = resp
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| Error::MalformedResponse("No candidates in response".to_string()))?;

        candidate
            .content
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| Error::MalformedResponse("Invalid response structure".to_string()))
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        let model = Self::normalize_model(&self.model);
        let url = format!("{}/models/{}:generateContent", self.api_base, model);

        info!(
            model = %model,
            prompt_len = prompt.len(),
            max_output_tokens = config.max_output_tokens,
            "Calling Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::build_request(prompt, config))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!("Gemini request timed out: {}", e))
                } else {
                    Error::Provider(format!("Gemini request failed: {}", e))
                }
            })?;

        let status = response.status();
        let raw_body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!(status = %status, body = %raw_body, "Gemini API error");
            return Err(Error::Upstream {
                status: status.as_u16(),
                message: format!("AI service error: {}", status.as_u16()),
            });
        }

        debug!(body_len = raw_body.len(), "Gemini raw response");
        let text = Self::parse_text(&raw_body)?;
        info!(content_len = text.len(), "Gemini response parsed");
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}
