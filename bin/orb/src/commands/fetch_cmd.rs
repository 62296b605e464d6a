use orb_core::Config;
use orb_core::Paths;
use orb_proxy::{PageContext, ProxyOutcome, ProxyService};
use tracing::info;

/// Run one URL through the proxy pipeline and print the result to stdout.
pub async fn run(url: &str, preserve_css: bool, embed: bool, context: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(&Paths::new())?;
    let proxy = ProxyService::new(&config.proxy)?;

    if context {
        let page = proxy.fetch_checked(Some(url)).await?;
        let context = PageContext::extract(&page.body, &page.final_url);
        println!("{}", serde_json::to_string_pretty(&context)?);
        return Ok(());
    }

    if embed {
        let page = proxy.embed_page(url).await?;
        info!(url = %page.final_url, title = %page.context.title, "Embedded page");
        println!("{}", page.html);
        return Ok(());
    }

    match proxy.handle(Some(url), preserve_css).await {
        ProxyOutcome::Page(html) => {
            println!("{}", html);
            Ok(())
        }
        ProxyOutcome::Failed { status, error, retryable } => {
            anyhow::bail!("{} (status {}{})", error, status, if retryable { ", retryable" } else { "" })
        }
    }
}
