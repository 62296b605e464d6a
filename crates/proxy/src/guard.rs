use orb_core::{Error, Result};
use tracing::warn;
use url::Url;

/// Hosts the proxy refuses to fetch.
///
/// Matched as substrings of the hostname, so `localhost.example.com` is refused
/// too. There is no DNS resolution and private ranges are not checked.
pub const BLOCKED_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "::1"];

/// Parse a proxy target and reject anything that is not a public http(s) URL.
pub fn check_target(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| Error::Validation(format!("Invalid URL: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Validation(format!("Unsupported scheme: {}", url.scheme())));
    }

    let host = url
        .host_str()
        .ok_or_else(|| Error::Validation("URL has no host".to_string()))?
        .to_ascii_lowercase();

    if BLOCKED_HOSTS.iter().any(|blocked| host.contains(blocked)) {
        warn!(host = %host, "Proxy target blocked");
        return Err(Error::Blocked(host));
    }

    Ok(url)
}
