use once_cell::sync::Lazy;
use orb_core::{Error, Result};
use orb_providers::{GenerationConfig, Provider};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

static FIRST_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").expect("digit regex is valid"));

/// What the user wants to do with a query typed into the search bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intent {
    Browse,
    Learn,
    Mindmap,
    Chat,
}

impl Intent {
    fn from_digit(d: &str) -> Self {
        match d {
            "2" => Intent::Learn,
            "3" => Intent::Mindmap,
            "4" => Intent::Chat,
            _ => Intent::Browse,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentResponse {
    pub query: String,
    pub intent: Intent,
    pub classification: String,
}

/// First digit of the model's answer (`"1"` when there is none) and the intent it maps to.
pub fn parse_classification(raw: &str) -> (String, Intent) {
    let digit = FIRST_DIGIT
        .find(raw.trim())
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "1".to_string());
    let intent = Intent::from_digit(&digit);
    (digit, intent)
}

pub fn classification_prompt(query: &str) -> String {
    format!(
        r#"
You are an intent classification expert.
Classify the following user query into exactly ONE of these categories.
Respond ONLY with the category number (no text, no punctuation).

Rules for nuanced classification:
- **BROWSE (1):** For general web searches, finding resources, looking for courses/tutorials, or "how to learn" queries that imply browsing the web for materials.
- **LEARN (2):** For direct teaching/explanation requests where the user expects YOU to deliver the learning content in structured steps right now.
- **MINDMAP (3):** For requests to visualize relationships, structures, or create mind maps.
- **CHAT (4):** For casual conversation, personal questions, brainstorming, or step-by-step help.

Examples:
"how to learn cpp" → 1
"learn cpp step by step" → 2
"teach me python" → 2
"best way to learn guitar" → 1
"courses for machine learning" → 1
"give me a mind map of WW2 events" → 3
"explain quantum physics" → 2
"talk to me about AI trends" → 4
"best restaurants in Tokyo" → 1

User query: "{}"
Category number only:
"#,
        query
    )
}

pub async fn classify(provider: &dyn Provider, query: &str) -> Result<IntentResponse> {
    let query = query.trim();
    if query.is_empty() {
        return Err(Error::Validation("Query is required".to_string()));
    }

    let raw = provider
        .generate(&classification_prompt(query), &GenerationConfig::new(0.0, 5))
        .await?;
    let (classification, intent) = parse_classification(&raw);
    info!(intent = ?intent, classification = %classification, "Intent classified");

    Ok(IntentResponse {
        query: query.to_string(),
        intent,
        classification,
    })
}
