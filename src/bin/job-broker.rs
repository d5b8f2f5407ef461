//! job-broker CLI — runs the broker's HTTP server.

use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use job_broker::broker::Broker;
use job_broker::config::Config;
use job_broker::http::{self, cors::build_cors};
use job_broker::telemetry::{TelemetryConfig, init_telemetry};
use tracing::info;

#[derive(Parser)]
#[command(name = "job-broker", about = "In-memory work-distribution broker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server and the stale-job sweeper
    Serve {
        /// Listen address (overrides BROKER_ADDR)
        #[arg(long)]
        addr: Option<SocketAddr>,
        /// Seconds between sweeps (overrides SWEEP_INTERVAL_SECS)
        #[arg(long)]
        sweep_interval: Option<u64>,
        /// Seconds before an unreported or uncollected job is evicted
        /// (overrides STALE_AFTER_SECS)
        #[arg(long)]
        stale_after: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            addr,
            sweep_interval,
            stale_after,
        } => {
            let mut config = Config::from_env()?;
            if let Some(addr) = addr {
                config.bind_addr = addr;
            }
            if let Some(secs) = sweep_interval {
                anyhow::ensure!(secs > 0, "--sweep-interval must be greater than zero");
                config.sweep_interval = std::time::Duration::from_secs(secs);
            }
            if let Some(secs) = stale_after {
                config.stale_after = std::time::Duration::from_secs(secs);
            }
            cmd_serve(config).await
        }
    }
}

async fn cmd_serve(config: Config) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: config.service_name.clone(),
        default_filter: config.log_level.clone(),
    })?;

    let broker = Broker::new();
    let sweeper = broker.spawn_sweeper(config.sweep())?;

    let app = http::router(broker.clone(), build_cors(&config)?);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "broker listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutdown requested");
        })
        .await
        .context("http server error")?;

    broker.shutdown();
    sweeper.await.context("sweeper task panicked")?;
    Ok(())
}
