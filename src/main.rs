//! lspgate - HTTP gateway for Language Server Protocol servers.
//!
//! Spawns (or connects to) a language server and exposes it over plain
//! HTTP: `POST /lsp/{method}` with a JSON body becomes one JSON-RPC
//! request, and the JSON-RPC response comes back as the HTTP response.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lspgate::{gateway, lsp};

/// HTTP gateway for Language Server Protocol servers.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Address to bind the HTTP server to
    #[arg(long, default_value = "localhost:8080")]
    addr: String,

    /// Connection method to use with the language server: "stdio" or a
    /// host:port address to dial
    #[arg(long, default_value = lsp::CONNECT_STDIO)]
    connect: String,

    /// Command starting the language server subprocess; omit it to use an
    /// externally managed server
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    server_command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "lspgate=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();
    info!("starting lspgate v{}", env!("CARGO_PKG_VERSION"));

    let server = if args.server_command.is_empty() {
        lsp::Server::external()
    } else {
        lsp::Server::subprocess(
            args.server_command[0].clone(),
            args.server_command[1..].to_vec(),
        )
    };
    let server = Arc::new(server);

    server
        .connect(&args.connect)
        .await
        .context("unable to connect to language server")?;

    info!("lspgate running on {}", args.addr);

    tokio::select! {
        result = gateway::serve(&args.addr, Arc::clone(&server)) => {
            result.context("HTTP server failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down servers...");
            if let Err(e) = server.shutdown_and_exit().await {
                error!("error shutting down language server: {}", e);
            }
        }
    }

    info!("lspgate exit");
    Ok(())
}
