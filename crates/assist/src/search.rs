use std::time::Duration;

use orb_core::config::SearchConfig;
use orb_core::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

const SEARCH_TIMEOUT_SECS: u64 = 15;
pub const QUOTA_EXCEEDED: &str = "Search quota exceeded. Please try again later.";

/// Which search credentials are absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingKeys {
    pub api_key: bool,
    pub search_engine_id: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: usize,
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub display_link: String,
    pub thumbnail: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub total_results: String,
    pub search_time: f64,
}

/// Custom-search API client.
pub struct SearchClient {
    client: Client,
    api_key: String,
    engine_id: String,
    api_base: String,
    num: u32,
}

impl SearchClient {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key: config.api_key.trim().to_string(),
            engine_id: config.engine_id.trim().to_string(),
            api_base: config.api_base.clone(),
            num: config.num,
        })
    }

    pub fn missing_keys(&self) -> Option<MissingKeys> {
        let missing = MissingKeys {
            api_key: self.api_key.is_empty(),
            search_engine_id: self.engine_id.is_empty(),
        };
        (missing.api_key || missing.search_engine_id).then_some(missing)
    }

    pub async fn search(&self, query: &str) -> Result<SearchResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::Validation("Query parameter is required".to_string()));
        }
        if self.missing_keys().is_some() {
            return Err(Error::Config("Google Search API credentials not configured".to_string()));
        }

        let num = self.num.to_string();
        let response = self
            .client
            .get(&self.api_base)
            .header("Accept", "application/json")
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!("Search timed out: {}", e))
                } else {
                    Error::Network(format!("Search request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Search API error");
            let message = if status.as_u16() == 429 {
                QUOTA_EXCEEDED.to_string()
            } else {
                format!("Google Search API error: {}", status.as_u16())
            };
            return Err(Error::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("Failed to parse search response: {}", e)))?;
        let parsed = parse_response(query, &raw);
        info!(query = %query, results = parsed.results.len(), "Search completed");
        Ok(parsed)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
    search_information: Option<CseSearchInformation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CseItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    display_link: String,
    #[serde(default)]
    pagemap: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CseSearchInformation {
    total_results: Option<String>,
    search_time: Option<f64>,
}

fn parse_response(query: &str, raw: &Value) -> SearchResponse {
    let cse: CseResponse = serde_json::from_value(raw.clone()).unwrap_or_default();

    let results = cse
        .items
        .into_iter()
        .enumerate()
        .map(|(i, item)| SearchResult {
            id: i + 1,
            thumbnail: item.pagemap["cse_thumbnail"][0]["src"].as_str().map(str::to_string),
            title: item.title,
            link: item.link,
            snippet: item.snippet,
            display_link: item.display_link,
            kind: "browse".to_string(),
        })
        .collect();

    let info = cse.search_information;
    SearchResponse {
        query: query.to_string(),
        results,
        total_results: info
            .as_ref()
            .and_then(|i| i.total_results.clone())
            .unwrap_or_else(|| "0".to_string()),
        search_time: info.and_then(|i| i.search_time).unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_items() {
        let raw = json!({
            "items": [
                {
                    "title": "Rust",
                    "link": "https://www.rust-lang.org/",
                    "snippet": "A language empowering everyone",
                    "displayLink": "www.rust-lang.org",
                    "pagemap": { "cse_thumbnail": [ { "src": "https://img.test/r.png" } ] }
                },
                { "title": "Book", "link": "https://doc.rust-lang.org/book/" }
            ],
            "searchInformation": { "totalResults": "1234", "searchTime": 0.21 }
        });
        let resp = parse_response("rust", &raw);
        assert_eq!(resp.results.len(), 2);
        assert_eq!(resp.results[0].id, 1);
        assert_eq!(resp.results[0].thumbnail.as_deref(), Some("https://img.test/r.png"));
        assert_eq!(resp.results[1].id, 2);
        assert!(resp.results[1].thumbnail.is_none());
        assert_eq!(resp.total_results, "1234");

        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["results"][0]["type"], "browse");
        assert_eq!(v["results"][0]["displayLink"], "www.rust-lang.org");
        assert_eq!(v["totalResults"], "1234");
    }

    #[test]
    fn test_parse_empty() {
        let resp = parse_response("nothing", &json!({}));
        assert!(resp.results.is_empty());
        assert_eq!(resp.total_results, "0");
        assert_eq!(resp.search_time, 0.0);
    }

    #[test]
    fn test_missing_keys() {
        let client = SearchClient::new(&SearchConfig::default()).unwrap();
        assert_eq!(
            client.missing_keys(),
            Some(MissingKeys { api_key: true, search_engine_id: true })
        );

        let config = SearchConfig {
            api_key: "k".into(),
            engine_id: "cx".into(),
            ..Default::default()
        };
        assert!(SearchClient::new(&config).unwrap().missing_keys().is_none());
    }

    #[tokio::test]
    async fn test_search_without_keys_is_config_error() {
        let client = SearchClient::new(&SearchConfig::default()).unwrap();
        assert!(matches!(client.search("rust").await, Err(Error::Config(_))));
        assert!(matches!(client.search("").await, Err(Error::Validation(_))));
    }
}
