use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rugpull_checker::address::{self, Address};
use rugpull_checker::cache::ExpiringCache;
use rugpull_checker::config::Config;
use rugpull_checker::daemon::{AppState, VERSION};
use rugpull_checker::error::{RugpullError, Result};
use rugpull_checker::services::analysis::AnalysisService;
use rugpull_checker::services::events::AgentEvent;

#[derive(Parser, Debug)]
#[command(name = "rugpull-checker")]
#[command(about = "Check Solana tokens for rug pull risk from the command line")]
#[command(version = VERSION)]
struct Cli {
    /// JSON config file; environment variables override it.
    #[arg(long, global = true, env = "RUGPULL_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    cache_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one message through the full pipeline and print every event.
    Check {
        #[arg(required = true)]
        text: Vec<String>,

        /// Print raw SSE frames instead of plain text.
        #[arg(long, default_value_t = false)]
        sse: bool,
    },
    /// Print every Solana address found in the text.
    Extract {
        #[arg(required = true)]
        text: Vec<String>,
    },
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Remove every cached analysis.
    Clear,
    /// Remove the cached analysis for one address.
    Delete { address: String },
}

fn print_event(event: &AgentEvent, sse: bool) {
    if sse {
        print!("{}", event.to_sse());
        return;
    }
    match event {
        AgentEvent::Done => {}
        AgentEvent::Status(text) => println!("[{}] {}", event.name(), text),
        _ => {
            if let Some(text) = event.text() {
                println!("[{}]\n{}\n", event.name(), text);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    rugpull_checker::logging::init_tracing("rugpull_checker_cli");
    let cli = Cli::parse();

    match cli.command {
        Command::Check { text, sse } => {
            let mut config = Config::load(cli.config.as_deref())?;
            if let Some(dir) = cli.cache_dir {
                config.server.cache_dir = Some(dir);
            }
            let state = AppState::from_config(&config)?;
            let service: Arc<AnalysisService> = state.service;
            for event in service.run(&text.join(" ")).await {
                print_event(&event, sse);
            }
        }
        Command::Extract { text } => {
            let found = address::extract_all(&text.join(" "));
            if found.is_empty() {
                eprintln!("No Solana address found");
            }
            for address in found {
                println!("{address}");
            }
        }
        Command::Cache(command) => {
            let config = Config::load_unvalidated(cli.config.as_deref())?;
            let dir = cli.cache_dir.unwrap_or_else(|| config.cache_dir());
            let cache = ExpiringCache::new(dir, config.scanner.cache_ttl_hours.max(1))?;
            match command {
                CacheCommand::Clear => {
                    println!("Removed {} cached entries", cache.clear_all().await);
                }
                CacheCommand::Delete { address } => {
                    let address = Address::parse(address.trim()).ok_or_else(|| {
                        RugpullError::Config(format!("not a Solana address: {address}"))
                    })?;
                    let deleted = cache.delete(&AnalysisService::cache_key(&address)).await;
                    println!("{}", if deleted { "Deleted" } else { "Not cached" });
                }
            }
        }
    }
    Ok(())
}
