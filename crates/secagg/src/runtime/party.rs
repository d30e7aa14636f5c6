//! A single party of a session.
use ahash::AHashMap;
use futures::{SinkExt, StreamExt};
use secagg_channel::{CountPair, PeerChannels};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument, trace};

use crate::errors::MpcError;
use crate::protocols::Sharing;
use crate::runtime::DealerSharing;
use crate::secret::ShareId;

/// Instructions from the session to its parties. Every party receives the same sequence of
/// commands, only the shares of `Input` differ.
#[derive(Debug)]
pub(crate) enum Command {
    Input { id: ShareId, share: u64 },
    Add { dst: ShareId, rhs: ShareId },
    AddConst { dst: ShareId, constant: u64 },
    Open { id: ShareId, reply: oneshot::Sender<u64> },
    Free { id: ShareId },
}

#[derive(Debug, Clone)]
pub(crate) struct PeerMsg {
    id: ShareId,
    share: u64,
}

/// Statistics reported by a party when the session shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartyStats {
    pub party_id: usize,
    pub inputs: usize,
    pub opened: usize,
    pub messages: CountPair,
    /// Shares still held when the session closed.
    pub live_shares: usize,
}

pub(crate) struct Party {
    party_id: usize,
    shares: AHashMap<ShareId, u64>,
    peers: PeerChannels<PeerMsg>,
    inputs: usize,
    opened: usize,
}

impl Party {
    pub(crate) fn new(party_id: usize, peers: PeerChannels<PeerMsg>) -> Self {
        Self {
            party_id,
            shares: AHashMap::new(),
            peers,
            inputs: 0,
            opened: 0,
        }
    }

    /// Process commands until the session closes the command channel.
    #[instrument(skip_all, fields(party_id = self.party_id), err)]
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) -> Result<PartyStats, MpcError> {
        debug!("Party started");
        while let Some(cmd) = commands.recv().await {
            trace!(?cmd, "Processing");
            match cmd {
                Command::Input { id, share } => {
                    self.shares.insert(id, share);
                    self.inputs += 1;
                }
                Command::Add { dst, rhs } => {
                    let rhs = self.share(rhs)?;
                    let dst = self.share_mut(dst)?;
                    *dst = dst.wrapping_add(rhs);
                }
                Command::AddConst { dst, constant } => {
                    let party_id = self.party_id;
                    let dst = self.share_mut(dst)?;
                    if party_id == 0 {
                        *dst = dst.wrapping_add(constant);
                    }
                }
                Command::Open { id, reply } => {
                    let value = self.open(id).await?;
                    self.opened += 1;
                    // the session may have stopped waiting for the output, which is not our
                    // concern
                    let _ = reply.send(value);
                }
                Command::Free { id } => {
                    self.shares.remove(&id);
                }
            }
        }
        let stats = self.stats();
        debug!(?stats, "Party finished");
        Ok(stats)
    }

    /// Send our share of `id` to every peer and reconstruct the value from all shares.
    async fn open(&mut self, id: ShareId) -> Result<u64, MpcError> {
        let party_id = self.party_id;
        let own = self.share(id)?;
        for (peer_id, peer) in self.peers.iter_mut().enumerate() {
            let Some(peer) = peer else { continue };
            peer.send(PeerMsg { id, share: own })
                .await
                .map_err(|_| MpcError::PeerDisconnected { party_id, peer_id })?;
        }

        let mut shares = Vec::with_capacity(self.peers.len());
        shares.push(own);
        for (peer_id, peer) in self.peers.iter_mut().enumerate() {
            let Some(peer) = peer else { continue };
            let msg = peer
                .next()
                .await
                .ok_or(MpcError::PeerDisconnected { party_id, peer_id })?;
            if msg.id != id {
                return Err(MpcError::OutOfSync {
                    party_id,
                    expected: id,
                    received: msg.id,
                });
            }
            shares.push(msg.share);
        }
        Ok(DealerSharing::reconstruct(shares))
    }

    fn share(&self, id: ShareId) -> Result<u64, MpcError> {
        self.shares
            .get(&id)
            .copied()
            .ok_or(MpcError::UnknownShare {
                party_id: self.party_id,
                id,
            })
    }

    fn share_mut(&mut self, id: ShareId) -> Result<&mut u64, MpcError> {
        let party_id = self.party_id;
        self.shares
            .get_mut(&id)
            .ok_or(MpcError::UnknownShare { party_id, id })
    }

    fn stats(&self) -> PartyStats {
        let messages = self
            .peers
            .iter()
            .flatten()
            .map(|peer| CountPair::new(&peer.sent(), &peer.received()))
            .fold(CountPair::default(), |acc, pair| acc + pair);
        PartyStats {
            party_id: self.party_id,
            inputs: self.inputs,
            opened: self.opened,
            messages,
            live_shares: self.shares.len(),
        }
    }
}
