//! AI request routing: explanation, chat, intent classification and web search.

pub mod chat;
pub mod explain;
pub mod intent;
pub mod search;

pub use chat::{chat, ChatRequest, ChatResponse};
pub use explain::{build_prompt, explain, ExplainRequest, ExplainResponse, RequestType};
pub use intent::{classify, parse_classification, ClassifyRequest, Intent, IntentResponse};
pub use search::{MissingKeys, SearchClient, SearchResponse, SearchResult};
