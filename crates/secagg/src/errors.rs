use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::aggregate::PairKey;
use crate::secret::ShareId;

#[derive(Error, Debug)]
pub enum MpcError {
    #[error("A session needs at least one party")]
    NoParties,
    #[error("Fixed-point precision of {0} fractional bits is not supported (maximum is 32)")]
    UnsupportedPrecision(u32),
    #[error("The secure computation session is closed")]
    SessionClosed,
    #[error("Secret {0} belongs to a different session")]
    ForeignSecret(ShareId),
    #[error("Party {party_id} is not available")]
    PartyUnavailable { party_id: usize },
    #[error("Party {party_id} panicked or was aborted")]
    PartyPanicked {
        party_id: usize,
        #[source]
        source: tokio::task::JoinError,
    },
    #[error("Peer {peer_id} disconnected from party {party_id}")]
    PeerDisconnected { party_id: usize, peer_id: usize },
    #[error("Party {party_id} holds no share for secret {id}")]
    UnknownShare { party_id: usize, id: ShareId },
    #[error("Party {party_id} expected the share of secret {expected} but received {received}")]
    OutOfSync {
        party_id: usize,
        expected: ShareId,
        received: ShareId,
    },
    #[error("Parties reconstructed different values for secret {0}")]
    InconsistentOutput(ShareId),
    #[error("Cannot encode non-finite value {0} as a secret fixed-point number")]
    NonFiniteInput(f64),
    #[error("Value {value} is out of range for a fixed-point number with {frac_bits} fractional bits")]
    OutOfRange { value: f64, frac_bits: u32 },
    #[error("Amount sum of pair {pair} can exceed the fixed-point range with {frac_bits} fractional bits")]
    SumOverflow { pair: PairKey, frac_bits: u32 },
}

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Unable to read dataset {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Unable to write dataset {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Malformed CSV data")]
    Csv(#[from] csv::Error),
    #[error("Unable to flush dataset")]
    Io(#[from] io::Error),
    #[error("Dataset has no column `{0}`")]
    MissingColumn(String),
    #[error("Row {row} has a non-numeric amount `{value}`")]
    InvalidAmount { row: usize, value: String },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Secure computation failed")]
    Mpc(#[from] MpcError),
    #[error("Dataset processing failed")]
    Dataset(#[from] DatasetError),
}
