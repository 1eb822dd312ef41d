//! Main Entrypoint for the NPC Voice Host
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment (with CLI overrides).
//! 2. Initializing logging.
//! 3. Opening the audio output device.
//! 4. Connecting the voice session and running until Ctrl+C or hangup.

mod config;
mod output;

use anyhow::Context;
use clap::Parser;
use config::Config;
use output::CpalSink;
use talk_client::{Session, SessionConfig};
use tracing::{info, warn};

/// Command-line overrides for the environment configuration.
#[derive(Parser, Debug)]
#[command(name = "npc-voice", about = "Voice-agent client for NPC dialogue")]
struct Args {
    /// Agent to talk to (overrides TALK_AGENT_ID).
    #[arg(long)]
    agent_id: Option<String>,
    /// WebSocket endpoint template (overrides TALK_ENDPOINT).
    #[arg(long)]
    endpoint: Option<String>,
}

/// Listens for the `Ctrl+C` signal to shut the session down gracefully.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Closing session...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    if let Some(agent_id) = args.agent_id {
        config.agent_id = agent_id;
    }
    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }

    let sink = CpalSink::spawn().context("Failed to open audio output")?;

    info!(agent_id = %config.agent_id, "Starting voice session...");
    let session_config = SessionConfig {
        endpoint: config.endpoint,
        agent_id: config.agent_id,
        api_key: config.api_key,
        output_sample_rate: config.output_sample_rate,
    };
    let mut session = Session::connect(session_config, sink)
        .await
        .context("Failed to establish voice session")?;

    tokio::select! {
        _ = shutdown_signal() => {}
        _ = session.closed() => warn!("Voice session ended by the server."),
    }

    session.close();
    info!("Shut down.");
    Ok(())
}
