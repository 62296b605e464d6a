use orb_core::{Error, Result};
use orb_providers::{GenerationConfig, Provider};
use orb_proxy::{truncate_chars, PageContext};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Characters of page content quoted in the prompt.
const PREVIEW_CHARS: usize = 300;
/// Characters of the selection echoed back in the response.
const ECHO_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Explain,
    Simplify,
    Translate,
    Examples,
    Related,
    /// Anything else; answered with a generic instruction.
    Other,
}

impl RequestType {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "explain" => RequestType::Explain,
            "simplify" => RequestType::Simplify,
            "translate" => RequestType::Translate,
            "examples" => RequestType::Examples,
            "related" => RequestType::Related,
            _ => RequestType::Other,
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            RequestType::Explain => {
                "Please provide a clear, comprehensive explanation of the selected text. Consider:
1. What does this text mean in simple terms?
2. Why is this concept important or relevant?
3. How does it relate to the broader context of the webpage?
4. Are there any technical terms that need clarification?

Provide your explanation in a clear, educational manner that would help someone understand this concept better."
            }
            RequestType::Simplify => {
                "Please simplify this text to make it easier to understand:
1. Use simpler language and shorter sentences
2. Remove jargon and technical terms where possible
3. Explain any necessary technical terms in plain language
4. Make it accessible to a general audience

Provide a simplified version that maintains the core meaning but is much easier to read."
            }
            RequestType::Translate => {
                "Please help with this text by:
1. If it's in a foreign language, translate it to English
2. If it's already in English but uses complex terminology, \"translate\" it to plain English
3. If it contains idioms or cultural references, explain what they mean
4. Provide context about any cultural or linguistic nuances

Make this text accessible and understandable."
            }
            RequestType::Examples => {
                "Please provide practical examples related to this text:
1. Give 2-3 concrete, real-world examples that illustrate this concept
2. Show how this might apply in different scenarios or contexts
3. If relevant, provide analogies that make the concept easier to understand
4. Include any common use cases or applications

Help make this concept more tangible with practical examples."
            }
            RequestType::Related => {
                "Please suggest related concepts and topics:
1. What are 3-5 related concepts or topics someone should explore?
2. What are the prerequisites to fully understand this?
3. What are the next steps or advanced topics to learn after this?
4. How does this connect to other fields or disciplines?

Provide a learning pathway and related concepts that would deepen understanding."
            }
            RequestType::Other => {
                "Please provide a helpful response about this selected text, considering the context provided."
            }
        }
    }

    fn generation_config() -> GenerationConfig {
        GenerationConfig::new(0.7, 2048).with_top_p(0.8).with_top_k(40)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainRequest {
    #[serde(default)]
    pub selected_text: String,
    #[serde(default)]
    pub page_context: Option<PageContext>,
    #[serde(default = "default_request_type")]
    pub request_type: String,
}

fn default_request_type() -> String {
    "explain".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainResponse {
    pub explanation: String,
    pub request_type: String,
    pub selected_text: String,
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

/// Page context block (when known), the quoted selection, then the instruction for `kind`.
pub fn build_prompt(selected_text: &str, context: Option<&PageContext>, kind: RequestType) -> String {
    let context_block = match context {
        Some(ctx) => {
            let preview = if ctx.content.trim().is_empty() {
                "Not available".to_string()
            } else {
                format!("{}...", truncate_chars(&ctx.content, PREVIEW_CHARS))
            };
            format!(
                "\nPage Context:\n- Title: {}\n- URL: {}\n- Description: {}\n- Page Content Preview: {}\n",
                or_placeholder(&ctx.title, "Unknown"),
                or_placeholder(&ctx.url, "Unknown"),
                or_placeholder(&ctx.description, "Not available"),
                preview,
            )
        }
        None => String::new(),
    };

    format!(
        "{}\n\nSelected Text: \"{}\"\n\n{}",
        context_block,
        selected_text,
        kind.instruction()
    )
}

pub async fn explain(provider: &dyn Provider, request: ExplainRequest) -> Result<ExplainResponse> {
    let selected = request.selected_text.trim();
    if selected.is_empty() {
        return Err(Error::Validation("Selected text is required".to_string()));
    }

    let kind = RequestType::parse(&request.request_type);
    let prompt = build_prompt(selected, request.page_context.as_ref(), kind);
    info!(request_type = %request.request_type, chars = selected.chars().count(), "Explaining selection");

    let explanation = provider.generate(&prompt, &RequestType::generation_config()).await?;

    Ok(ExplainResponse {
        explanation,
        request_type: request.request_type.clone(),
        selected_text: truncate_chars(selected, ECHO_CHARS),
    })
}
