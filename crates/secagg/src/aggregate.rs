//! Per (sender, receiver) pair aggregation on secret values.
use std::fmt::{Display, Formatter};

use indexmap::map::Entry;
use indexmap::IndexMap;
use tracing::{debug, info, instrument, trace};

use crate::errors::MpcError;
use crate::runtime::Session;
use crate::secret::{FixedPoint, SecFxp, SecInt, SecureType};

/// Key of an interaction between two accounts.
///
/// Account ids are compared as trimmed strings, so `" 42"` and `"42"` name the same account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub sender: String,
    pub receiver: String,
}

impl PairKey {
    pub fn new(sender: impl AsRef<str>, receiver: impl AsRef<str>) -> Self {
        Self {
            sender: sender.as_ref().trim().to_owned(),
            receiver: receiver.as_ref().trim().to_owned(),
        }
    }
}

impl Display for PairKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.sender, self.receiver)
    }
}

/// Secret running totals of one pair.
#[derive(Debug)]
pub struct PairAggregate {
    pub count: SecInt,
    pub sum: SecFxp,
    /// Public upper bound of the encoded magnitude of `sum`. Never exceeds `i64::MAX`, so `sum`
    /// can't wrap around the ring.
    pub bound: u64,
}

const MAX_SUM_MAGNITUDE: u64 = i64::MAX as u64;

/// Secret aggregates in order of the first occurrence of each pair.
pub type SecretAggregates = IndexMap<PairKey, PairAggregate>;

/// Revealed totals of one pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Revealed {
    pub count: i64,
    pub sum: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevealedAggregates {
    pairs: IndexMap<PairKey, Revealed>,
}

impl RevealedAggregates {
    pub fn get(&self, pair: &PairKey) -> Option<&Revealed> {
        self.pairs.get(pair)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&PairKey, &Revealed)> + '_ {
        self.pairs.iter()
    }
}

impl FromIterator<(PairKey, Revealed)> for RevealedAggregates {
    fn from_iter<I: IntoIterator<Item = (PairKey, Revealed)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

/// Accumulate a secret interaction count and a secret amount sum per pair.
///
/// Nothing is revealed here, the running totals stay secret-shared. Fails with
/// [`MpcError::SumOverflow`] if the amounts of a pair add up to more than the fixed-point
/// encoding can hold.
pub fn accumulate<I>(session: &Session, inputs: I) -> Result<SecretAggregates, MpcError>
where
    I: IntoIterator<Item = (PairKey, f64)>,
{
    let frac_bits = session.config().frac_bits;
    let mut aggregates = SecretAggregates::new();
    let mut rows = 0_usize;
    for (pair, amount) in inputs {
        let magnitude = (FixedPoint::encode(amount, frac_bits)? as i64).unsigned_abs();
        match aggregates.entry(pair) {
            Entry::Vacant(entry) => {
                trace!(pair = %entry.key(), "New pair");
                entry.insert(PairAggregate {
                    count: session.int(1),
                    sum: session.fxp(amount)?,
                    bound: magnitude,
                });
            }
            Entry::Occupied(mut entry) => {
                let Some(bound) = entry
                    .get()
                    .bound
                    .checked_add(magnitude)
                    .filter(|bound| *bound <= MAX_SUM_MAGNITUDE)
                else {
                    return Err(MpcError::SumOverflow {
                        pair: entry.key().clone(),
                        frac_bits,
                    });
                };
                let amount = session.fxp(amount)?;
                let aggregate = entry.get_mut();
                aggregate.count += 1;
                aggregate.sum += amount;
                aggregate.bound = bound;
            }
        }
        rows += 1;
    }
    info!(rows, pairs = aggregates.len(), "Accumulated secret aggregates");
    Ok(aggregates)
}

/// Reveal every aggregate. Consumes the aggregates, each value is output exactly once.
#[instrument(skip_all, fields(pairs = aggregates.len()), err)]
pub async fn reveal(
    session: &Session,
    aggregates: SecretAggregates,
) -> Result<RevealedAggregates, MpcError> {
    let mut revealed = IndexMap::with_capacity(aggregates.len());
    for (pair, PairAggregate { count, sum, .. }) in aggregates {
        let count = session.output(&count).await?;
        let sum = session.output(&sum).await?;
        debug!(%pair, count, sum, "Revealed aggregate");
        revealed.insert(pair, Revealed { count, sum });
    }
    Ok(RevealedAggregates { pairs: revealed })
}

/// Accumulate and reveal the interaction count and amount sum of every pair in `inputs`.
pub async fn secure_interaction_count_and_sum<I>(
    session: &Session,
    inputs: I,
) -> Result<RevealedAggregates, MpcError>
where
    I: IntoIterator<Item = (PairKey, f64)>,
{
    let aggregates = accumulate(session, inputs)?;
    reveal(session, aggregates).await
}
