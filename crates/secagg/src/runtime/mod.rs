//! Secure computation session.
//!
//! A [`Session`] runs `n` parties as tokio tasks. Each party holds one additive share of every
//! secret created in the session. Secrets are created by the session (which acts as the input
//! dealer), combined with the arithmetic operators on [`Secret`] and revealed with
//! [`Session::output`], which is the only point where parties exchange messages.
//!
//! The session must be explicitly started and shut down:
//!
//! ```rust
//! # use secagg::runtime::{Session, SessionConfig};
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), secagg::errors::MpcError> {
//! let session = Session::start(SessionConfig::default()).await?;
//! let mut count = session.int(1);
//! count += 1;
//! let sum = session.fxp(10.5)? + session.fxp(20.25)?;
//! assert_eq!(2, session.output(&count).await?);
//! assert_eq!(30.75, session.output(&sum).await?);
//! drop((count, sum));
//! session.shutdown().await?;
//! # Ok(())
//! # }
//! ```
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::errors::MpcError;
use crate::protocols::additive::AdditiveSharing;
use crate::protocols::Sharing;
use crate::secret::{FixedPoint, Integer, SecFxp, SecInt, Secret, SecureType, ShareId};

pub(crate) use party::Command;
pub use party::PartyStats;
use party::Party;

mod party;

pub(crate) type DealerSharing = AdditiveSharing<u64, ChaCha12Rng>;

/// Largest supported number of fractional bits of [`FixedPoint`] secrets.
pub const MAX_FRAC_BITS: u32 = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Number of parties holding shares.
    pub parties: usize,
    /// Fractional bits of secret fixed-point numbers.
    pub frac_bits: u32,
    /// Seed for the share randomness. Uses OS entropy if `None`.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            parties: 3,
            frac_bits: 16,
            seed: None,
        }
    }
}

impl SessionConfig {
    pub fn with_parties(mut self, parties: usize) -> Self {
        self.parties = parties;
        self
    }

    pub fn with_frac_bits(mut self, frac_bits: u32) -> Self {
        self.frac_bits = frac_bits;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn validate(&self) -> Result<(), MpcError> {
        if self.parties == 0 {
            return Err(MpcError::NoParties);
        }
        if self.frac_bits > MAX_FRAC_BITS {
            return Err(MpcError::UnsupportedPrecision(self.frac_bits));
        }
        Ok(())
    }
}

/// State shared between a [`Session`] and its [`Secret`]s.
pub(crate) struct SessionShared {
    // None once the session is shut down
    commands: RwLock<Option<Vec<mpsc::UnboundedSender<Command>>>>,
    next_id: AtomicU64,
}

impl SessionShared {
    fn next_id(&self) -> ShareId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn send(&self, party_id: usize, cmd: Command) -> Result<(), MpcError> {
        let commands = self.commands.read();
        let commands = commands.as_ref().ok_or(MpcError::SessionClosed)?;
        commands[party_id]
            .send(cmd)
            .map_err(|_| MpcError::PartyUnavailable { party_id })
    }

    /// Send the command produced by `cmd` for each party id to that party.
    pub(crate) fn broadcast(&self, mut cmd: impl FnMut(usize) -> Command) -> Result<(), MpcError> {
        let commands = self.commands.read();
        let commands = commands.as_ref().ok_or(MpcError::SessionClosed)?;
        for (party_id, sender) in commands.iter().enumerate() {
            sender
                .send(cmd(party_id))
                .map_err(|_| MpcError::PartyUnavailable { party_id })?;
        }
        Ok(())
    }

    fn close(&self) {
        self.commands.write().take();
    }
}

pub struct Session {
    shared: Arc<SessionShared>,
    dealer: Mutex<DealerSharing>,
    parties: Vec<JoinHandle<Result<PartyStats, MpcError>>>,
    config: SessionConfig,
}

impl Session {
    /// Spawn the parties of a new session on the current tokio runtime.
    #[instrument(skip_all, fields(parties = config.parties), err)]
    pub async fn start(config: SessionConfig) -> Result<Self, MpcError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::from_entropy(),
        };

        let mut senders = Vec::with_capacity(config.parties);
        let mut parties = Vec::with_capacity(config.parties);
        for (party_id, peers) in secagg_channel::mesh(config.parties)
            .into_iter()
            .enumerate()
        {
            let (sender, receiver) = mpsc::unbounded_channel();
            let party = Party::new(party_id, peers);
            parties.push(tokio::spawn(party.run(receiver)));
            senders.push(sender);
        }
        info!(frac_bits = config.frac_bits, "Started secure computation session");

        Ok(Self {
            shared: Arc::new(SessionShared {
                commands: RwLock::new(Some(senders)),
                next_id: AtomicU64::new(0),
            }),
            dealer: Mutex::new(AdditiveSharing::new(rng)),
            parties,
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Secret-share an integer.
    pub fn int(&self, value: i64) -> SecInt {
        // Integer encoding is infallible
        self.input_raw(value as u64)
    }

    /// Secret-share a fixed-point number.
    pub fn fxp(&self, value: f64) -> Result<SecFxp, MpcError> {
        self.input::<FixedPoint>(value)
    }

    /// Secret-share a plaintext value of any [`SecureType`].
    pub fn input<T: SecureType>(&self, value: T::Plain) -> Result<Secret<T>, MpcError> {
        let raw = T::encode(value, self.config.frac_bits)?;
        Ok(self.input_raw(raw))
    }

    fn input_raw<T: SecureType>(&self, raw: u64) -> Secret<T> {
        let id = self.shared.next_id();
        let shares = self.dealer.lock().share(raw, self.config.parties);
        if let Err(err) = self
            .shared
            .broadcast(|party_id| Command::Input {
                id,
                share: shares[party_id],
            })
        {
            // surfaces when the secret is output or the session is shut down
            warn!(%err, id, "Unable to distribute input shares");
        }
        Secret::from_parts(id, self.shared.clone())
    }

    /// Reveal the plaintext of `secret` to the session.
    ///
    /// Every party sends its share to every other party and reconstructs the value. The
    /// reconstructions of all parties must agree.
    #[instrument(skip_all, fields(id = secret.id(), secure_type = T::NAME), err)]
    pub async fn output<T: SecureType>(&self, secret: &Secret<T>) -> Result<T::Plain, MpcError> {
        if !secret.belongs_to(&self.shared) {
            return Err(MpcError::ForeignSecret(secret.id()));
        }
        let id = secret.id();
        let mut replies = Vec::with_capacity(self.config.parties);
        for party_id in 0..self.config.parties {
            let (reply, response) = oneshot::channel();
            self.shared.send(party_id, Command::Open { id, reply })?;
            replies.push(response);
        }

        let mut reconstructed = None;
        for (party_id, response) in replies.into_iter().enumerate() {
            let value = response
                .await
                .map_err(|_| MpcError::PartyUnavailable { party_id })?;
            match reconstructed {
                None => reconstructed = Some(value),
                Some(prev) if prev != value => return Err(MpcError::InconsistentOutput(id)),
                Some(_) => {}
            }
        }
        let raw = reconstructed.ok_or(MpcError::NoParties)?;
        Ok(T::decode(raw, self.config.frac_bits))
    }

    /// Output a secret integer.
    pub async fn output_int(&self, secret: &SecInt) -> Result<i64, MpcError> {
        self.output::<Integer>(secret).await
    }

    /// Close the session and wait for all parties to finish.
    ///
    /// Errors which caused a party to stop early are returned here.
    #[instrument(skip_all, err)]
    pub async fn shutdown(mut self) -> Result<Vec<PartyStats>, MpcError> {
        self.shared.close();
        let parties = mem::take(&mut self.parties);
        let mut stats = Vec::with_capacity(parties.len());
        for (party_id, handle) in parties.into_iter().enumerate() {
            let party_stats = handle
                .await
                .map_err(|source| MpcError::PartyPanicked { party_id, source })??;
            debug!(
                party_id,
                inputs = party_stats.inputs,
                opened = party_stats.opened,
                sent = party_stats.messages.sent,
                received = party_stats.messages.recv,
                live_shares = party_stats.live_shares,
                "Party statistics"
            );
            stats.push(party_stats);
        }
        info!("Secure computation session shut down");
        Ok(stats)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.parties.is_empty() {
            return;
        }
        warn!("Session dropped without shutdown, aborting parties");
        self.shared.close();
        for handle in &self.parties {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::MpcError;
    use crate::private_test_utils::init_tracing;
    use crate::runtime::{Session, SessionConfig};

    fn config(parties: usize) -> SessionConfig {
        SessionConfig::default().with_parties(parties).with_seed(7)
    }

    #[tokio::test]
    async fn adds_secret_integers() -> anyhow::Result<()> {
        let _guard = init_tracing();
        for parties in 1..=4 {
            let session = Session::start(config(parties)).await?;
            let mut count = session.int(1);
            count += 1;
            count += session.int(-5);
            let count = count + 10;
            assert_eq!(7, session.output(&count).await?);
            drop(count);
            session.shutdown().await?;
        }
        Ok(())
    }

    #[tokio::test]
    async fn adds_secret_fixed_point() -> anyhow::Result<()> {
        let session = Session::start(config(3)).await?;
        let mut sum = session.fxp(10.0)?;
        sum += session.fxp(20.5)?;
        sum += &session.fxp(-0.25)?;
        assert_eq!(30.25, session.output(&sum).await?);
        drop(sum);
        session.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn output_is_repeatable() -> anyhow::Result<()> {
        let session = Session::start(config(3)).await?;
        let value = session.int(42);
        assert_eq!(42, session.output_int(&value).await?);
        assert_eq!(42, session.output_int(&value).await?);
        drop(value);
        session.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn reports_party_statistics() -> anyhow::Result<()> {
        let session = Session::start(config(3)).await?;
        let a = session.int(1);
        let b = session.int(2);
        let kept = a + &b;
        drop(b);
        assert_eq!(3, session.output(&kept).await?);

        let stats = session.shutdown().await?;
        assert_eq!(3, stats.len());
        for (party_id, party) in stats.iter().enumerate() {
            assert_eq!(party_id, party.party_id);
            assert_eq!(2, party.inputs);
            assert_eq!(1, party.opened);
            assert_eq!(2, party.messages.sent);
            assert_eq!(2, party.messages.recv);
            assert_eq!(1, party.live_shares);
        }
        drop(kept);
        Ok(())
    }

    #[tokio::test]
    async fn rejects_invalid_config() {
        assert!(matches!(
            Session::start(SessionConfig::default().with_parties(0)).await,
            Err(MpcError::NoParties)
        ));
        assert!(matches!(
            Session::start(SessionConfig::default().with_frac_bits(40)).await,
            Err(MpcError::UnsupportedPrecision(40))
        ));
    }

    #[tokio::test]
    async fn rejects_secret_of_other_session() -> anyhow::Result<()> {
        let first = Session::start(config(2)).await?;
        let second = Session::start(config(2)).await?;
        let secret = first.int(1);
        assert!(matches!(
            second.output(&secret).await,
            Err(MpcError::ForeignSecret(_))
        ));
        drop(secret);
        first.shutdown().await?;
        second.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn rejects_non_finite_amount() -> anyhow::Result<()> {
        let session = Session::start(config(2)).await?;
        assert!(matches!(
            session.fxp(f64::NAN),
            Err(MpcError::NonFiniteInput(_))
        ));
        session.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    #[should_panic(expected = "same session")]
    async fn mixing_sessions_panics() {
        let first = Session::start(config(2)).await.unwrap();
        let second = Session::start(config(2)).await.unwrap();
        let _ = first.int(1) + second.int(2);
    }
}
