//! BasaltDB server binary.
//!
//! Creates an in-memory store and serves it over a Unix domain socket.
//! All data lives for the lifetime of the process.

use std::path::PathBuf;

use basalt_core::BasaltDB;
use basalt_server::BasaltServer;
use tracing::info;

fn default_socket_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("basalt")
        .join("server.sock")
}

fn parse_args() -> PathBuf {
    let args: Vec<String> = std::env::args().collect();
    let mut socket_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--socket" => {
                i += 1;
                socket_path = Some(PathBuf::from(&args[i]));
            }
            other => {
                eprintln!("unknown argument: {other}");
                eprintln!("usage: basalt-server [--socket PATH]");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    socket_path.unwrap_or_else(default_socket_path)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let socket_path = parse_args();

    // Ensure the socket's parent directory exists.
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    info!(socket = %socket_path.display(), "starting");

    let server = BasaltServer::new(BasaltDB::new(), socket_path);
    server.run().await?;

    Ok(())
}
