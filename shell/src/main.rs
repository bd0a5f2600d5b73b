//! Terminal host for the evolution viewport.
//!
//! Reads control commands from stdin, forwards them to the viewport
//! controller and prints the grid on request.

mod commands;
mod state;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use viewport::{HttpSimulationService, RecordingSink, ViewportConfig, ViewportController};

use commands::Command;
use state::AppState;

#[derive(Parser, Debug)]
#[command(
    name = "evo-viewport",
    version,
    about = "Watch a remote evolution simulation on a terminal grid"
)]
struct Cli {
    /// Base URL of the simulation service.
    #[arg(long, env = "EVO_VIEWPORT_URL")]
    service_url: Option<String>,

    /// JSON config file; command-line flags override its values.
    #[arg(short, long, env = "EVO_VIEWPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Grid height (world Y).
    #[arg(long)]
    height: Option<u32>,

    /// Grid width (world X).
    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    pop_size: Option<u32>,

    #[arg(long)]
    lifespan: Option<u32>,

    #[arg(long)]
    genes: Option<u32>,

    /// Evolve-step requests allowed in flight at once.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Push the grid size to the service on every resize.
    #[arg(long)]
    sync_world_size: bool,

    /// Skip the `/action/start` call before an evolution run.
    #[arg(long)]
    no_announce: bool,

    /// Print the grid without colors.
    #[arg(long)]
    plain: bool,
}

impl Cli {
    fn resolve_config(&self) -> Result<ViewportConfig> {
        let mut config = match &self.config {
            Some(path) => ViewportConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ViewportConfig::default(),
        };

        if let Some(url) = &self.service_url {
            config.service_url = url.clone();
        }
        let params = &mut config.parameters;
        if let Some(height) = self.height {
            params.world_height = height;
        }
        if let Some(width) = self.width {
            params.world_width = width;
        }
        if let Some(pop_size) = self.pop_size {
            params.population_size = pop_size;
        }
        if let Some(lifespan) = self.lifespan {
            params.lifespan = lifespan;
        }
        if let Some(genes) = self.genes {
            params.num_genes = genes;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        config.sync_world_size |= self.sync_world_size;
        if self.no_announce {
            config.announce_start = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    let service = HttpSimulationService::new(config.service_url.clone(), config.request_timeout())
        .context("failed to build HTTP client")?;
    let failures = Arc::new(RecordingSink::new());
    let controller = ViewportController::new(service, &config, failures.clone());
    let mut app = AppState::new(controller, failures, cli.plain);

    info!(
        url = %config.service_url,
        dimensions = %config.parameters.world(),
        population = config.parameters.population_size,
        "connecting to simulation service"
    );
    let outcome = app.controller.initialize().await;
    commands::print_outcome(&outcome);
    println!("{}", commands::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match commands::parse(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => commands::run(&mut app, command).await,
            Err(err) => warn!("{err:#}"),
        }
    }

    if let Some(report) = app.controller.shutdown().await.filter(|report| report.cancelled) {
        info!(dispatched = report.dispatched, "evolution run cancelled on exit");
    }
    Ok(())
}
