use std::time::Duration;

use orb_core::config::ProxyConfig;
use orb_core::{Error, Result};
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::guard::check_target;

/// A fetched document and where the redirect chain ended.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub requested_url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

/// Server-side page fetcher with browser-like headers and a bounded timeout.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    user_agent: String,
}

impl Fetcher {
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        let client = Client::builder()
            .redirect(redirect_policy(config.max_redirects))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
        })
    }

    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        debug!(url = %url, "Fetching page");
        let response = self
            .client
            .get(url.as_str())
            .header("User-Agent", &self.user_agent)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.5")
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .send()
            .await
            .map_err(map_transport_error)?;

        let final_url = response.url().to_string();
        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Upstream returned an error status");
            return Err(Error::Upstream {
                status: status.as_u16(),
                message: format!("HTTP {}: {}", status.as_u16(), status.canonical_reason().unwrap_or("")),
            });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response.text().await.map_err(map_transport_error)?;

        Ok(FetchedPage {
            requested_url: url.to_string(),
            final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

/// Follow at most `max` redirects, and never to a host the guard refuses.
fn redirect_policy(max: usize) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= max {
            return attempt.error(format!("too many redirects (max {})", max));
        }
        match check_target(attempt.url().as_str()) {
            Ok(_) => attempt.follow(),
            Err(e) => attempt.error(e),
        }
    })
}

fn map_transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        return Error::Timeout(format!("Fetch timed out: {}", e));
    }
    if e.is_redirect() {
        if let Some(refused) = refused_redirect(&e) {
            return refused;
        }
    }
    Error::Network(format!("Fetch failed: {}", e))
}

/// The guard error that stopped a redirect chain, if that is what happened.
fn refused_redirect(e: &reqwest::Error) -> Option<Error> {
    let mut source = std::error::Error::source(e);
    while let Some(err) = source {
        match err.downcast_ref::<Error>() {
            Some(Error::Blocked(host)) => return Some(Error::Blocked(host.clone())),
            Some(Error::Validation(msg)) => return Some(Error::Validation(msg.clone())),
            _ => source = err.source(),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_from_config() {
        let config = ProxyConfig {
            timeout_secs: 5,
            ..Default::default()
        };
        let fetcher = Fetcher::new(&config).unwrap();
        assert!(fetcher.user_agent.starts_with("Mozilla/5.0"));
    }

    /// Local upstream that answers every connection with `response`.
    async fn stub_upstream(response: &'static str) -> Url {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        Url::parse(&format!("http://{}/start", addr)).unwrap()
    }

    #[tokio::test]
    async fn test_redirect_to_blocked_host_is_refused() {
        let start = stub_upstream(
            "HTTP/1.1 302 Found\r\nLocation: http://localhost:1/secret\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let fetcher = Fetcher::new(&ProxyConfig::default()).unwrap();
        let err = fetcher.fetch(&start).await.unwrap_err();
        assert!(matches!(err, Error::Blocked(ref host) if host == "localhost"), "got {:?}", err);
    }
}
