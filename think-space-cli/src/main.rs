//! CLI entry point for think-space

mod client;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use think_space_core::config::{Config, ConfigLoader};
use think_space_core::logging::init_logging;
use tracing::info;

use crate::client::ApiClient;

#[derive(Parser)]
#[command(name = "think-space")]
#[command(about = "Brainstorming relay in front of an LLM completion API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP relay
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Send a prompt to a running server
    Ask {
        /// Prompt text
        prompt: String,
        /// Session id for conversation continuity
        #[arg(short, long)]
        session: Option<String>,
        /// Server base URL
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Clear a session on a running server
    Clear {
        /// Session id to clear
        session_id: String,
        /// Server base URL
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Show effective configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = config_loader.load()?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let _guard = init_logging(&config.logging);
            info!("Starting think-space relay");
            think_space_manager::serve(&config).await?;
        }
        Commands::Ask {
            prompt,
            session,
            url,
        } => {
            run_ask(url, &prompt, session.as_deref()).await?;
        }
        Commands::Clear { session_id, url } => {
            let message = ApiClient::new(url).clear_session(&session_id).await?;
            println!("{}", message);
        }
        Commands::Status => {
            let config = config_loader.load()?;
            print_status(&config_loader, &config);
        }
    }

    Ok(())
}

async fn run_ask(url: Option<String>, prompt: &str, session: Option<&str>) -> Result<()> {
    let reply = ApiClient::new(url).brainstorm(prompt, session).await?;
    println!("{}", reply.response);
    println!();
    println!("{} {}", style("session:").dim(), reply.session_id);
    Ok(())
}

fn print_status(loader: &ConfigLoader, config: &Config) {
    let key_status = match config.provider.api_key() {
        Some(key) => style(mask_key(key)).green().to_string(),
        None => style(format!("missing (set {})", config.provider.api_key_env))
            .red()
            .to_string(),
    };

    println!("{}", style("think-space status").bold());
    println!("  config dir : {}", loader.config_dir().display());
    println!("  provider   : {}", config.provider.name);
    println!(
        "  api base   : {}",
        config.provider.api_base.as_deref().unwrap_or("(provider default)")
    );
    println!("  api key    : {}", key_status);
    println!("  model      : {}", config.provider.model);
    println!(
        "  sampling   : temperature {}, max_tokens {}",
        config.provider.temperature, config.provider.max_tokens
    );
    println!(
        "  listen     : {}:{}",
        config.server.host, config.server.port
    );
    println!(
        "  sessions   : idle ttl {}s, max {}",
        config.sessions.idle_ttl_secs, config.sessions.max_sessions
    );
}

fn mask_key(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    if key.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}
