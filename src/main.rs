mod aggregator;
mod classifier;
mod cli;
mod config;
mod delivery;
mod error;
mod host;
mod notifier;
mod outcome;
mod output;
mod ownership;
mod report;
mod scenario;
mod tracker;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting buildherald");
    cli.execute().await?;

    Ok(())
}
