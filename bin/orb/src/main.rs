mod commands;
mod surface;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "orb")]
#[command(about = "A browsing shell with an AI reading assistant", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway: proxy, AI routes and the control-surface API
    Gateway {
        /// Port to listen on (overrides config gateway.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config gateway.host)
        #[arg(long)]
        host: Option<String>,
    },

    /// Show current configuration status
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Run a page through the proxy pipeline and print the result
    Fetch {
        /// Page URL
        url: String,

        /// Resolve stylesheet and asset references against the page
        #[arg(long)]
        preserve_css: bool,

        /// Apply the embedding rewrite and inject the bridge script
        #[arg(long, conflicts_with = "preserve_css")]
        embed: bool,

        /// Print the extracted page context as JSON instead of HTML
        #[arg(long)]
        context: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the current configuration as JSON
    Show,
    /// Get a config value by dot-separated key (e.g. shell.defaultUrl)
    Get {
        /// Config key path
        key: String,
    },
    /// Set a config value by dot-separated key
    Set {
        /// Config key path
        key: String,
        /// Value to set (auto-detects JSON types)
        value: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Gateway { port, host } => {
            commands::gateway::run(host, port).await?;
        }
        Commands::Status => {
            commands::status::run().await?;
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => commands::config_cmd::show().await?,
            ConfigCommands::Get { key } => commands::config_cmd::get(&key).await?,
            ConfigCommands::Set { key, value } => commands::config_cmd::set(&key, &value).await?,
        },
        Commands::Fetch {
            url,
            preserve_css,
            embed,
            context,
        } => {
            commands::fetch_cmd::run(&url, preserve_css, embed, context).await?;
        }
    }

    Ok(())
}
