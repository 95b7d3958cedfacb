//! OKR Tracker - Main Server

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use okr_tracker::api::{create_router, ServerState};
use okr_tracker::{AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "okr-tracker")]
#[command(about = "Strategic planning backend with progress roll-up")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,okr_tracker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server_port = port;
            }
            serve(config).await
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    let port = config.server_port;
    let auth_config = config.auth_config.clone();
    if auth_config.is_none() {
        tracing::warn!("No auth section configured — all API requests will be denied");
    }

    let state = AppState::new(config).await?;
    tracing::info!("Connected to Neo4j");

    let server_state = Arc::new(ServerState::new(state.store.clone(), auth_config));
    let router = create_router(server_state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}
