//! Walkthrough client for a running basalt-server.
//!
//! Connects over the Unix socket, then exercises the wide-column API end to
//! end: table administration, puts, gets, scans, filtered scans, and deletes.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use basalt_server::client::BasaltClient;
use basalt_server::error::ClientError;

mod config;
mod ops;

use config::DemoConfig;

/// BasaltDB Demo, a fixed walkthrough of the wide-column API against a
/// running server.
#[derive(Parser, Debug)]
#[command(name = "basalt-demo", version)]
struct Cli {
    /// Load settings from a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Unix socket path to connect to (default: ~/.local/share/basalt/server.sock).
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Drop and recreate the demo table before running (the default).
    #[arg(long, overrides_with = "no_reset")]
    reset: bool,

    /// Keep whatever table state the server already has.
    #[arg(long)]
    no_reset: bool,
}

/// File settings first, then command-line overrides on top.
fn load_config(cli: &Cli) -> Result<DemoConfig, config::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => DemoConfig::from_file(path)?,
        None => DemoConfig::default(),
    };
    if let Some(socket) = &cli.socket {
        config.socket_path = socket.clone();
    }
    if cli.reset {
        config.reset_on_start = true;
    }
    if cli.no_reset {
        config.reset_on_start = false;
    }
    Ok(config)
}

async fn run(client: &mut BasaltClient, config: &DemoConfig) -> Result<(), ClientError> {
    client.ping().await?;
    println!("BasaltDB is accessible!");
    ops::run(client, config).await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let mut client = match BasaltClient::connect(&config.socket_path).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!(
                "{e}\nStart a server with: basalt-server --socket {}",
                config.socket_path.display()
            );
            process::exit(1);
        }
    };

    if let Err(e) = run(&mut client, &config).await {
        eprintln!("demo failed: {e}");
        process::exit(1);
    }
}
