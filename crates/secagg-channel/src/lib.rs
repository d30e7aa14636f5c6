//! Channels connecting the parties of a secure computation session.
//!
//! Every party of a session owns one end of a point-to-point [`InMemory`] channel to every
//! other party. [`mesh`] creates the full set of channels for `n` parties.
pub use in_memory::InMemory;
pub use util::{CountPair, Counter};

pub mod in_memory;
pub mod util;

/// The channels of one party. Index `j` holds the channel to party `j`, the party's own
/// index is `None`.
pub type PeerChannels<Item> = Vec<Option<InMemory<Item>>>;

/// Create a fully connected mesh of in-memory channels for `parties` parties.
///
/// The returned vector is indexed by party id.
pub fn mesh<Item>(parties: usize) -> Vec<PeerChannels<Item>> {
    let mut mesh: Vec<PeerChannels<Item>> = (0..parties)
        .map(|_| (0..parties).map(|_| None).collect())
        .collect();
    for i in 0..parties {
        for j in (i + 1)..parties {
            let (ch_i, ch_j) = InMemory::new_pair();
            mesh[i][j] = Some(ch_i);
            mesh[j][i] = Some(ch_j);
        }
    }
    mesh
}
