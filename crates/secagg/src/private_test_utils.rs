//! Private test utilities - Do Not Use!
//!
//! This module is activated by the "_integration_tests" feature and should not be used by
//! downstream code. It can change in any version.
use std::collections::HashMap;
use std::fmt::Write;

use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::aggregate::PairKey;
use crate::dataset::{AMOUNT_COLUMN, RECEIVER_COLUMN, SENDER_COLUMN};

pub fn init_tracing() -> tracing::dispatcher::DefaultGuard {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .set_default()
}

/// CSV text with an id column and the sender, receiver and amount columns.
pub fn transactions_csv(rows: &[(&str, &str, f64)]) -> String {
    let mut csv = format!("Id,{SENDER_COLUMN},{RECEIVER_COLUMN},{AMOUNT_COLUMN}\n");
    for (id, (sender, receiver, amount)) in rows.iter().enumerate() {
        writeln!(csv, "{id},{sender},{receiver},{amount}").expect("writing to String can't fail");
    }
    csv
}

/// Plaintext reference for the secure aggregation.
pub fn plain_count_and_sum(rows: &[(&str, &str, f64)]) -> HashMap<PairKey, (i64, f64)> {
    let mut totals: HashMap<PairKey, (i64, f64)> = HashMap::new();
    for (sender, receiver, amount) in rows {
        let entry = totals.entry(PairKey::new(sender, receiver)).or_default();
        entry.0 += 1;
        entry.1 += amount;
    }
    totals
}
