use crate::pipeline::launch;
use anyhow::Result;
use clap::Parser;

mod cache;
mod cli;
mod config;
mod executor;
mod pipeline;
mod providers;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let (config, query) = args.into_config()?;

    launch(&config, &query).await
}
