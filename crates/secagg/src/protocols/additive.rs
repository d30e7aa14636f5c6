use crate::protocols::{Ring, Sharing};
use rand::distributions::{Distribution, Standard};
use rand::{CryptoRng, Rng};
use std::marker::PhantomData;

/// Additive secret sharing over the ring `RING`.
///
/// The first `n - 1` shares are uniformly random, the last share is the input minus their sum.
/// Sharing is linear: adding the shares of two values party-wise yields shares of the sum, and
/// adding a public constant to a single share adds it to the shared value.
#[derive(Debug)]
pub struct AdditiveSharing<RING, RNG: CryptoRng + Rng> {
    rng: RNG,
    phantom: PhantomData<RING>,
}

impl<RING, RNG: CryptoRng + Rng> AdditiveSharing<RING, RNG> {
    pub fn new(rng: RNG) -> Self {
        Self {
            rng,
            phantom: PhantomData,
        }
    }
}

impl<RING, RNG> Sharing for AdditiveSharing<RING, RNG>
where
    RING: Ring,
    RNG: CryptoRng + Rng,
    Standard: Distribution<RING>,
{
    type Plain = RING;

    fn share(&mut self, input: RING, parties: usize) -> Vec<RING> {
        assert!(parties > 0, "Can't share a value among zero parties");
        let mut shares: Vec<RING> = (&mut self.rng)
            .sample_iter(Standard)
            .take(parties - 1)
            .collect();
        let masked_input = shares
            .iter()
            .fold(input, |acc, rand| acc.wrapping_sub(rand));
        shares.push(masked_input);
        shares
    }

    fn reconstruct(shares: impl IntoIterator<Item = RING>) -> RING {
        shares
            .into_iter()
            .fold(RING::ZERO, |acc, share| acc.wrapping_add(&share))
    }
}
