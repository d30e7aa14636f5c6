//! Command line configuration of the enrichment binary.
use std::path::PathBuf;

use clap::Parser;

use crate::dataset::{Columns, AMOUNT_COLUMN, RECEIVER_COLUMN, SENDER_COLUMN};
use crate::runtime::SessionConfig;

/// Enrich a transaction dataset with per (sender, receiver) pair interaction counts and
/// amount totals, computed on secret-shared values.
///
/// To view the logging output, set the environment variable `RUST_LOG`, e.g. `RUST_LOG=info`.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct EnrichArgs {
    /// CSV file with the transactions.
    #[arg(short, long, default_value = "processed_dataset.csv")]
    pub input: PathBuf,
    /// Where to write the enriched CSV file.
    #[arg(short, long, default_value = "enriched_dataset1.csv")]
    pub output: PathBuf,
    #[arg(long, default_value = SENDER_COLUMN)]
    pub sender_column: String,
    #[arg(long, default_value = RECEIVER_COLUMN)]
    pub receiver_column: String,
    #[arg(long, default_value = AMOUNT_COLUMN)]
    pub amount_column: String,
    /// Number of parties the values are secret-shared among.
    #[arg(short, long, default_value_t = 3)]
    pub parties: usize,
    /// Fractional bits of the secret fixed-point amounts.
    #[arg(long, default_value_t = 16)]
    pub frac_bits: u32,
    /// Seed for the share randomness. Uses OS entropy if not set.
    #[arg(long)]
    pub seed: Option<u64>,
}

impl EnrichArgs {
    pub fn columns(&self) -> Columns {
        Columns {
            sender: self.sender_column.clone(),
            receiver: self.receiver_column.clone(),
            amount: self.amount_column.clone(),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            parties: self.parties,
            frac_bits: self.frac_bits,
            seed: self.seed,
        }
    }
}
