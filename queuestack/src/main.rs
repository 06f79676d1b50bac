//! QueueStack - in-memory queue simulator
//!
//! Seeds a queue store from configuration, then executes JSON-lines queue
//! commands from a script file or stdin and writes one JSON response per
//! command to stdout.

mod config;
mod runner;

use anyhow::Context;
use clap::Parser;
use queuestack_queue::QueueRegistry;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::runner::Runner;

#[derive(Parser, Debug)]
#[command(name = "queuestack")]
#[command(about = "In-memory FIFO/LIFO queue simulator", long_about = None)]
struct Args {
    /// Configuration file with store settings and seed queues
    #[arg(short, long, env = "QUEUESTACK_CONFIG")]
    config: Option<PathBuf>,

    /// Store name (overrides the configuration file)
    #[arg(long, env = "QUEUESTACK_STORE_NAME")]
    store: Option<String>,

    /// JSON-lines command script; stdin when omitted
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "QUEUESTACK_LOG_LEVEL")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout only carries responses
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("queuestack={0},queuestack_queue={0}", args.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    let store_name = args.store.unwrap_or_else(|| config.store.name.clone());

    let registry = QueueRegistry::new();
    registry
        .init_with(&store_name, config.queues, config.store.settings())
        .with_context(|| format!("Failed to seed store '{}'", store_name))?;
    let store = registry.open(&store_name)?;

    info!("Starting QueueStack...");
    info!("  Store: {}", store_name);
    info!("  Queues: {:?}", store.get_queues());
    info!(
        "  Close: {}",
        if config.store.reject_when_closed {
            "strict"
        } else {
            "advisory"
        }
    );

    let runner = Runner::new(store);
    let stdout = io::stdout().lock();
    let processed = match args.script {
        Some(path) => {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open script {}", path.display()))?;
            runner.run(BufReader::new(file), stdout)?
        }
        None => runner.run(io::stdin().lock(), stdout)?,
    };

    registry.dispose(&store_name);
    info!(processed, "Finished");

    Ok(())
}
