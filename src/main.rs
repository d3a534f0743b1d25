use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use itinera_core::settings::{load_settings, Settings};
use itinera_core::state::{TravelRequest, DEFAULT_PROVIDER};
use itinera_engine::{ContextRetriever, Pipeline, ProviderRegistry};
use itinera_server::{AppState, RouteProxy, ServerConfig};
use itinera_telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser)]
#[command(name = "itinera", version, about = "AI travel itinerary service")]
struct Cli {
    /// JSON settings file merged over the defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Skip the travel-wiki retrieval stage.
        #[arg(long)]
        no_rag: bool,
    },
    /// Plan a single trip and print the itinerary.
    Plan {
        text: String,
        #[arg(long, default_value = DEFAULT_PROVIDER)]
        provider: String,
    },
}

fn build_pipeline(settings: &Settings) -> Pipeline {
    let registry = Arc::new(ProviderRegistry::from_settings(&settings.providers));
    let mut builder = Pipeline::builder(registry);
    if settings.retrieval.enabled {
        builder = builder.with_retrieval(ContextRetriever::from_settings(&settings.retrieval));
    }
    builder.build()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref()).context("failed to load settings")?;

    init_telemetry(
        &TelemetryConfig::from_level_str(&settings.logging.level, settings.logging.json)
            .with_module_levels(&settings.logging.module_levels),
    )?;

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
        no_rag: false,
    }) {
        Command::Serve { host, port, no_rag } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            if no_rag {
                settings.retrieval.enabled = false;
            }

            let state = AppState::new(
                build_pipeline(&settings),
                RouteProxy::from_settings(&settings.routing),
            );
            let handle = itinera_server::start(ServerConfig::from(&settings.server), state)
                .await
                .context("failed to start server")?;

            tracing::info!(port = handle.port, "itinera ready");

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for ctrl+c")?;

            tracing::info!("shutting down");
            handle.shutdown();
        }
        Command::Plan { text, provider } => {
            let pipeline = build_pipeline(&settings);
            let response = pipeline.plan(TravelRequest::new(text, provider)).await;
            println!("{}", response.output);
        }
    }

    Ok(())
}
