//! skydesk - MCP gateway for satellite imagery
//!
//! Subcommands:
//! - `skydesk serve` - Run the MCP gateway (SSE sessions → imagery API)
//! - `skydesk config` - Print the effective configuration
//! - `skydesk tools` - Print the tool catalogue as JSON

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uplink_conf::SkydeskConfig;

use skydesk::{serve, telemetry, tools};

#[derive(Parser)]
#[command(name = "skydesk")]
#[command(about = "MCP gateway for satellite imagery feasibility, ordering and notifications")]
#[command(version)]
struct Cli {
    /// Config file to load instead of ./skydesk.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP gateway server
    Serve {
        /// HTTP port to bind (0 lets the OS choose)
        #[arg(short, long)]
        port: Option<u16>,

        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// OTLP gRPC endpoint for OpenTelemetry (e.g., "localhost:4317")
        #[arg(long)]
        otlp_endpoint: Option<String>,
    },

    /// Print the effective configuration (API key redacted)
    Config,

    /// Print the tool catalogue as JSON
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = SkydeskConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve {
            port,
            host,
            otlp_endpoint,
        } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(endpoint) = otlp_endpoint {
                config.telemetry.otlp_endpoint = endpoint;
            }

            let otlp = config
                .telemetry
                .otlp_enabled()
                .then(|| config.telemetry.otlp_endpoint.clone());
            let telemetry = telemetry::init(&config.telemetry.log_level, otlp.as_deref())?;

            for path in &sources.files {
                tracing::info!(path = %path.display(), "Loaded config file");
            }
            for var in &sources.env_overrides {
                tracing::debug!(var = %var, "Config overridden from environment");
            }

            let result = serve::run(config).await;
            telemetry.shutdown();
            result?;
        }
        Commands::Config => {
            telemetry::init_plain(&config.telemetry.log_level);
            for path in &sources.files {
                eprintln!("# loaded: {}", path.display());
            }
            for var in &sources.env_overrides {
                eprintln!("# env: {}", var);
            }
            print!("{}", config.to_toml());
        }
        Commands::Tools => {
            let catalogue = serde_json::to_string_pretty(&tools::catalogue())
                .context("Failed to serialize tool catalogue")?;
            println!("{}", catalogue);
        }
    }

    Ok(())
}
