//! edge-proxy
//!
//! Edge routing and observability proxy built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────▶ http::server ──▶ routing ──┬─▶ http::api  ──▶ API origin
//!                  (request event)            │   (api_call, tee/buffer, CORS)
//!                                             └─▶ http::site ──▶ SITE origin
//!                                                 (site_request/site_response)
//!
//!     Cross-cutting: config (TOML, hot reload) · observability (events to
//!     stdout, tracing to stderr, Prometheus) · lifecycle (signals, drain)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use edge_proxy::lifecycle::startup::{self, StartupOptions};

#[derive(Parser)]
#[command(name = "edge-proxy", version)]
#[command(about = "Edge routing and observability proxy", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "EDGE_PROXY_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Reload the configuration file when it changes.
    #[arg(short, long)]
    watch: bool,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and print the effective settings
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let options = StartupOptions {
        config_path: cli.config,
        watch: cli.watch,
        bind: cli.bind,
    };

    let result = match cli.command {
        Some(Commands::Check) => check(&options),
        None => startup::run(options).await.map_err(|e| e.to_string()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("edge-proxy: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn check(options: &StartupOptions) -> Result<(), String> {
    let config = startup::resolve_config(options).map_err(|e| e.to_string())?;
    let rendered = toml::to_string_pretty(&config).map_err(|e| e.to_string())?;
    println!("{}", rendered);
    Ok(())
}
