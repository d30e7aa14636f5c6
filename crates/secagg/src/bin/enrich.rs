//! Enrich `processed_dataset.csv` with securely computed per-pair aggregates and save it as
//! `enriched_dataset1.csv`. See `secagg-enrich --help` for the available options.
//!
//! To view the logging output, set the environment variable `RUST_LOG` as specified
//! [here](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/struct.EnvFilter.html).
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use secagg::config::EnrichArgs;
use secagg::pipeline::enrich_file;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = EnrichArgs::parse();

    enrich_file(&args)
        .await
        .with_context(|| format!("Unable to enrich {}", args.input.display()))?;
    println!("Dataset has been enriched and saved.");
    Ok(())
}
