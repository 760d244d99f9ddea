use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use voice_agent::config::AgentConfig;
use voice_agent::session;

#[derive(Parser)]
#[command(
    name = "voice-agent",
    about = "Customer-support voice agent with human escalation handoff"
)]
struct Cli {
    /// Room to serve.
    #[arg(long)]
    room: String,

    /// Participant poll interval in seconds.
    #[arg(long, default_value_t = 2)]
    poll_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Fatal before any call connects; no caller exists yet.
    let config = AgentConfig::from_env()?;
    info!(room = %cli.room, "voice agent starting");

    let report = session::run_session(
        config,
        &cli.room,
        Duration::from_secs(cli.poll_interval_secs),
    )
    .await?;
    info!(cause = %report.cause, "session complete, disconnecting");

    Ok(())
}
