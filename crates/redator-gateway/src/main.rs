//! Redator — article generator server

use clap::{Parser, Subcommand};
use redator_core::{BindMode, RedatorConfig};
use redator_gateway::start_server;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "redator", about = "Redator — gerador de artigos com pesquisa e redação", version)]
struct Cli {
    /// Config file (TOML). Missing file means defaults.
    #[arg(short, long, env = "REDATOR_CONFIG", default_value = "redator.toml", global = true)]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
        /// "lan" or "loopback"
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Print the effective configuration as TOML
    PrintConfig,
    /// Show version
    Version,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "redator=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn parse_bind(bind: &str) -> BindMode {
    match bind {
        "loopback" | "localhost" | "127.0.0.1" => BindMode::Loopback,
        _ => BindMode::Lan,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::PrintConfig) => {
            let config = RedatorConfig::load(&cli.config).with_env();
            print!("{}", config.to_toml());
        }

        Some(Commands::Version) => {
            println!("redator v{}", env!("CARGO_PKG_VERSION"));
        }

        Some(Commands::Serve { port, bind }) => {
            init_tracing(cli.log_json);
            let mut config = RedatorConfig::load(&cli.config).with_env();
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(bind) = bind {
                config.server.bind = parse_bind(&bind);
            }
            start_server(config).await?;
        }

        // No subcommand = serve with config values
        None => {
            init_tracing(cli.log_json);
            start_server(RedatorConfig::load(&cli.config).with_env()).await?;
        }
    }

    Ok(())
}
