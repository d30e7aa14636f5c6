//! Secret sharing schemes used by the session runtime.
use num_traits::{WrappingAdd, WrappingSub};
use std::fmt::Debug;

pub mod additive;

pub trait Ring: WrappingAdd + WrappingSub + Copy + Default + Eq + Debug + Send + Sync + 'static {
    const ZERO: Self;
}

impl Ring for u64 {
    const ZERO: Self = 0;
}

/// A secret sharing scheme for an arbitrary number of parties.
pub trait Sharing {
    type Plain: Clone + Default + Debug;

    /// Split `input` into one share per party.
    fn share(&mut self, input: Self::Plain, parties: usize) -> Vec<Self::Plain>;

    fn reconstruct(shares: impl IntoIterator<Item = Self::Plain>) -> Self::Plain;
}
