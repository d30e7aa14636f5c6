//! # secagg
//!
//! Enriches a transaction dataset with the number of interactions and the total amount of every
//! (sender, receiver) pair. The per-pair totals are accumulated on secret-shared values, so no
//! intermediate running total is visible to any single party. Only the final totals are revealed.
//!
//! ## Secure computation
//! A [`Session`] runs `n` parties, each holding one additive share (over the ring Z/2^64) of every
//! secret value. [`SecInt`] and [`SecFxp`] handles support addition via the standard `std::ops`
//! traits, which the parties evaluate locally on their shares. Revealing a value with
//! [`Session::output`] is the only step where the parties communicate: each party sends its
//! share to all other parties and reconstructs the plaintext. The protocol is secure against
//! semi-honest parties only.
//!
//! ## Pipeline
//! 1. [`Table::read_path`] loads the CSV input.
//! 2. [`aggregate::accumulate`] builds a secret count and sum per pair.
//! 3. [`aggregate::reveal`] outputs every aggregate.
//! 4. [`dataset::enrich`] appends `interaction_count` and `total_transaction_amount` to every
//!    row.
//! 5. [`EnrichedTable::write_path`] persists the result.
//!
//! [`pipeline::enrich_file`] runs all steps, and the `secagg-enrich` binary wraps it in a CLI.
//!
//! To view the logging output, set the environment variable `RUST_LOG` as specified
//! [here](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/struct.EnvFilter.html).
pub use aggregate::{PairKey, RevealedAggregates};
pub use dataset::{EnrichedTable, Table};
pub use runtime::{Session, SessionConfig};
pub use secagg_channel as channel;
pub use secret::{SecFxp, SecInt};

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod pipeline;
#[cfg(any(test, feature = "_integration_tests"))]
#[doc(hidden)]
/// Do **not** use items from this module. They are intended for integration tests and must
/// therefore be public.
pub mod private_test_utils;
pub mod protocols;
pub mod runtime;
pub mod secret;
