//! Communication counters.
use std::ops::{Add, AddAssign};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone, Default, Debug)]
/// A counter that tracks the number of messages sent or received over a channel. Clones share
/// the same underlying count.
pub struct Counter(Arc<AtomicUsize>);

/// Snapshot of the messages sent and received by a party.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountPair {
    pub sent: usize,
    pub recv: usize,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl AddAssign<usize> for Counter {
    fn add_assign(&mut self, rhs: usize) {
        self.0.fetch_add(rhs, Ordering::SeqCst);
    }
}

impl CountPair {
    pub fn new(sent: &Counter, recv: &Counter) -> Self {
        Self {
            sent: sent.get(),
            recv: recv.get(),
        }
    }
}

impl AddAssign for CountPair {
    fn add_assign(&mut self, rhs: Self) {
        self.sent += rhs.sent;
        self.recv += rhs.recv;
    }
}

impl Add for CountPair {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{CountPair, Counter};

    #[test]
    fn clones_share_count() {
        let counter = Counter::new();
        let mut clone = counter.clone();
        clone += 3;
        assert_eq!(3, counter.get());
        assert_eq!(3, clone.get());
    }

    #[test]
    fn count_pairs_add_up() {
        let (mut sent, mut recv) = (Counter::new(), Counter::new());
        sent += 2;
        recv += 5;
        let total = CountPair::new(&sent, &recv) + CountPair { sent: 1, recv: 1 };
        assert_eq!(CountPair { sent: 3, recv: 6 }, total);
    }
}
