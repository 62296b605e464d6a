use reqwest::{Client, Proxy};
use std::time::Duration;
use tracing::{info, warn};

/// Build the HTTP client for a provider.
///
/// `proxy`: `None` follows `HTTPS_PROXY`/`HTTP_PROXY`, `Some("")` forces a
/// direct connection, anything else is used as the proxy URL.
pub fn build_http_client(proxy: Option<&str>, timeout: Duration) -> Client {
    let mut builder = Client::builder().timeout(timeout);

    match proxy.map(str::trim) {
        Some("") => {
            info!("Provider forced to direct connect");
            builder = builder.no_proxy();
        }
        Some(url) => match Proxy::all(url) {
            Ok(p) => {
                info!(proxy = %url, "Provider using proxy");
                builder = builder.proxy(p);
            }
            Err(e) => {
                warn!(error = %e, proxy = %url, "Invalid proxy URL, falling back to direct connect");
            }
        },
        None => {}
    }

    builder.build().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to build HTTP client, using default");
        Client::new()
    })
}
