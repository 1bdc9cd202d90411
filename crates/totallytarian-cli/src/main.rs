use std::time::Duration;

use clap::Parser;
use totallytarian_client::config::{ClientConfig, DEFAULT_API_BASE_URL};
use tracing_subscriber::EnvFilter;

mod client;
mod commands;

#[derive(Parser)]
#[command(name = "totallytarian")]
#[command(about = "Play TotallyTarian from the terminal", long_about = None)]
struct Cli {
    /// Game server API root
    #[arg(short, long, env = "API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    server: String,

    /// Player name
    #[arg(short, long)]
    name: String,

    /// Lobby ID to join
    #[arg(short, long, required_unless_present = "create", conflicts_with = "create")]
    lobby: Option<String>,

    /// Create a new lobby and host it
    #[arg(short, long)]
    create: bool,

    /// Timeout for each HTTP request, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    request_timeout_ms: u64,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so they never interleave with the game text.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = ClientConfig {
        api_base_url: cli.server,
        request_timeout: Duration::from_millis(cli.request_timeout_ms),
        ..ClientConfig::default()
    };

    let lobby = if cli.create { None } else { cli.lobby.as_deref() };
    match lobby {
        Some(lobby) => println!(
            "Joining lobby '{lobby}' on {} as '{}'...",
            config.api_base_url, cli.name
        ),
        None => println!("Creating a lobby on {} as '{}'...", config.api_base_url, cli.name),
    }

    if let Err(e) = client::start_client(config, &cli.name, lobby).await {
        eprintln!("Error: {e}");
    }
}
