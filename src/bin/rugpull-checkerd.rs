use std::path::PathBuf;

use clap::Parser;
use rugpull_checker::config::Config;
use rugpull_checker::daemon;
use rugpull_checker::error::Result;

#[derive(Parser, Debug)]
#[command(name = "rugpull-checkerd")]
#[command(about = "Rug pull checker SSE daemon")]
#[command(version = daemon::VERSION)]
struct Cli {
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// JSON config file; environment variables override it.
    #[arg(long, env = "RUGPULL_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long)]
    cache_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    rugpull_checker::logging::init_tracing("rugpull_checkerd");
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(cache_dir) = cli.cache_dir {
        config.server.cache_dir = Some(cache_dir);
    }

    daemon::run(config).await
}
