mod config;
mod service;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use service::Engine;
use tracing::info;

#[derive(Parser)]
#[clap(name = "sequencer-node")]
#[clap(author, version, about = "Decentralized sequencer pod progression node", long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pod progression engine
    Run {
        /// Configuration file path
        #[clap(short, long, value_name = "FILE", default_value = "config.toml")]
        config: String,
    },

    /// Write a default configuration file
    Init {
        #[clap(short, long, default_value = "config.toml")]
        output: String,
    },
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { output }) => init_config(&output),
        Some(Commands::Run { config }) => run_node(&config).await,
        None => run_node("config.toml").await,
    }
}

fn init_config(output: &str) -> Result<()> {
    let config = Config::default();
    config.to_file(output)?;
    println!("Configuration file created: {output}");
    Ok(())
}

async fn run_node(config_path: &str) -> Result<()> {
    let config = if std::path::Path::new(config_path).exists() {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };

    init_logging(&config)?;
    info!(station_id = %config.node.station_id, "starting sequencer node");

    let engine = Engine::new(config).await?;
    engine.run().await?;

    Ok(())
}

fn init_logging(config: &Config) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    Ok(())
}
