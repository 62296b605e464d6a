use orb_core::{Config, Paths};

fn mark(ok: bool) -> &'static str {
    if ok {
        "✓ configured"
    } else {
        "✗ not set"
    }
}

pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();

    println!("orb status");
    println!("==========");
    println!();

    let config_path = paths.config_file();
    println!(
        "Config:    {} {}",
        config_path.display(),
        if config_path.exists() { "✓" } else { "✗ (not found, using defaults)" }
    );

    // Environment overrides are applied here, so keys from the environment count as configured.
    let config = Config::load_or_default(&paths)?;

    println!();
    println!("AI provider (gemini):");
    println!("  model:     {}", config.providers.gemini.model);
    println!("  api key:   {}", mark(config.gemini_api_key().is_some()));

    println!();
    println!("Search:");
    println!("  api key:   {}", mark(!config.search.api_key.trim().is_empty()));
    println!("  engine id: {}", mark(!config.search.engine_id.trim().is_empty()));

    println!();
    println!("Gateway:     http://{}:{}", config.gateway.host, config.gateway.port);
    println!(
        "Shell:       {}x{} window, {}px chrome, start page {}",
        config.shell.window_width, config.shell.window_height, config.shell.chrome_height, config.shell.default_url
    );
    println!(
        "Proxy:       {}s timeout, {} redirects max",
        config.proxy.timeout_secs, config.proxy.max_redirects
    );

    if config.gemini_api_key().is_none() {
        println!();
        println!("⚠ Set GEMINI_API_KEY (or providers.gemini.apiKey) to enable AI routes.");
    }
    Ok(())
}
