use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::paths::Paths;

pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_SEARCH_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_SEARCH_ENGINE_ID: &str = "GOOGLE_CX";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-request timeout for text-generation calls.
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
    /// `None` follows the environment, `""` forces a direct connection.
    #[serde(default)]
    pub proxy: Option<String>,
}

fn default_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

fn default_provider_timeout() -> u64 {
    30
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            model: default_model(),
            timeout_secs: default_provider_timeout(),
            proxy: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProvidersConfig {
    #[serde(default)]
    pub gemini: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    #[serde(default)]
    pub api_key: String,
    /// Custom search engine id ("cx").
    #[serde(default)]
    pub engine_id: String,
    #[serde(default = "default_search_api_base")]
    pub api_base: String,
    #[serde(default = "default_search_num")]
    pub num: u32,
}

fn default_search_api_base() -> String {
    "https://www.googleapis.com/customsearch/v1".to_string()
}

fn default_search_num() -> u32 {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            engine_id: String::new(),
            api_base: default_search_api_base(),
            num: default_search_num(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            allowed_origins: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellConfig {
    /// Height of the tab strip drawn above the content area, in window pixels.
    #[serde(default = "default_chrome_height")]
    pub chrome_height: u32,
    #[serde(default = "default_url")]
    pub default_url: String,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

fn default_chrome_height() -> u32 {
    40
}

fn default_url() -> String {
    "https://example.com".to_string()
}

fn default_window_width() -> u32 {
    1300
}

fn default_window_height() -> u32 {
    900
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            chrome_height: default_chrome_height(),
            default_url: default_url(),
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    #[serde(default = "default_proxy_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_proxy_timeout() -> u64 {
    20
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_proxy_timeout(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        let mut config = if config_path.exists() {
            Self::load(&config_path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Credentials from the environment win over the config file. Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = get(ENV_GEMINI_API_KEY) {
            debug!("Using {} from environment", ENV_GEMINI_API_KEY);
            self.providers.gemini.api_key = key;
        }
        if let Some(key) = get(ENV_SEARCH_API_KEY) {
            debug!("Using {} from environment", ENV_SEARCH_API_KEY);
            self.search.api_key = key;
        }
        if let Some(cx) = get(ENV_SEARCH_ENGINE_ID) {
            debug!("Using {} from environment", ENV_SEARCH_ENGINE_ID);
            self.search.engine_id = cx;
        }
    }

    pub fn gemini_api_key(&self) -> Option<&str> {
        let key = self.providers.gemini.api_key.trim();
        (!key.is_empty()).then_some(key)
    }
}
