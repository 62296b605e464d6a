use orb_core::config::ProxyConfig;
use orb_core::{Error, Result};
use tracing::{info, warn};

use crate::context::PageContext;
use crate::embed::embed;
use crate::fetch::{FetchedPage, Fetcher};
use crate::guard::check_target;
use crate::rewrite::rewrite;

pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";
pub const CACHE_CONTROL: &str = "no-cache, no-store, must-revalidate";
pub const FRAME_OPTIONS: &str = "SAMEORIGIN";

/// Result of one proxy request, ready to be turned into an HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyOutcome {
    Page(String),
    Failed { status: u16, error: String, retryable: bool },
}

impl ProxyOutcome {
    fn from_error(e: &Error) -> Self {
        let error = match e {
            Error::Validation(msg) => msg.clone(),
            Error::Blocked(_) => "Blocked domain".to_string(),
            _ => format!("Failed to fetch page: {}", e),
        };
        ProxyOutcome::Failed {
            status: e.http_status(),
            error,
            retryable: e.is_retryable(),
        }
    }
}

/// An embeddable page: rewritten HTML plus what it is about.
#[derive(Debug, Clone)]
pub struct EmbeddedPage {
    pub final_url: String,
    pub html: String,
    pub context: PageContext,
}

/// Fetch → optional rewrite → respond. Nothing is kept between requests.
#[derive(Clone)]
pub struct ProxyService {
    fetcher: Fetcher,
}

impl ProxyService {
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(config)?,
        })
    }

    /// Serve `GET /proxy?url=&preserveCSS=`.
    pub async fn handle(&self, url: Option<&str>, preserve_css: bool) -> ProxyOutcome {
        match self.proxy(url, preserve_css).await {
            Ok(html) => ProxyOutcome::Page(html),
            Err(e) => {
                warn!(error = %e, "Proxy request failed");
                ProxyOutcome::from_error(&e)
            }
        }
    }

    async fn proxy(&self, url: Option<&str>, preserve_css: bool) -> Result<String> {
        let page = self.fetch_checked(url).await?;
        info!(url = %page.final_url, bytes = page.body.len(), preserve_css, "Proxied page");
        if preserve_css {
            Ok(rewrite(&page.body, &page.final_url))
        } else {
            Ok(page.body)
        }
    }

    /// Fetch a page for an enhanced-mode frame: embedding rewrite plus page context.
    pub async fn embed_page(&self, url: &str) -> Result<EmbeddedPage> {
        let page = self.fetch_checked(Some(url)).await?;
        let context = PageContext::extract(&page.body, &page.final_url);
        let html = embed(&page.body, &page.final_url);
        Ok(EmbeddedPage {
            final_url: page.final_url,
            html,
            context,
        })
    }

    pub async fn fetch_checked(&self, url: Option<&str>) -> Result<FetchedPage> {
        let raw = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::Validation("URL parameter is required".to_string()))?;
        let target = check_target(raw)?;
        self.fetcher.fetch(&target).await
    }
}
