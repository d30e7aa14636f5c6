//! Secret values of a [`Session`](crate::runtime::Session).
//!
//! A [`Secret`] is a handle to a value which is additively shared among the parties of a
//! session. Arithmetic on secrets is forwarded to every party which updates its share locally,
//! so no party ever learns an intermediate result. Only
//! [`Session::output`](crate::runtime::Session::output) reveals a value.
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::ops::{Add, AddAssign};
use std::sync::Arc;

use tracing::{trace, warn};

use crate::errors::MpcError;
use crate::runtime::{Command, SessionShared};

/// Identifies the shares of one secret across all parties.
pub type ShareId = u64;

/// Secret integer.
pub type SecInt = Secret<Integer>;
/// Secret fixed-point number.
pub type SecFxp = Secret<FixedPoint>;

/// Embedding of a plaintext type into the ring Z/2^64 the shares live in.
pub trait SecureType: Send + Sync + 'static {
    type Plain: Copy + Debug + PartialEq + Send + 'static;
    const NAME: &'static str;

    fn encode(plain: Self::Plain, frac_bits: u32) -> Result<u64, MpcError>;

    fn decode(raw: u64, frac_bits: u32) -> Self::Plain;
}

/// Signed 64-bit integers in two's complement.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq)]
pub struct Integer;

/// Signed fixed-point numbers with a configurable number of fractional bits.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq)]
pub struct FixedPoint;

impl SecureType for Integer {
    type Plain = i64;
    const NAME: &'static str = "secint";

    fn encode(plain: i64, _frac_bits: u32) -> Result<u64, MpcError> {
        Ok(plain as u64)
    }

    fn decode(raw: u64, _frac_bits: u32) -> i64 {
        raw as i64
    }
}

impl SecureType for FixedPoint {
    type Plain = f64;
    const NAME: &'static str = "secfxp";

    fn encode(plain: f64, frac_bits: u32) -> Result<u64, MpcError> {
        if !plain.is_finite() {
            return Err(MpcError::NonFiniteInput(plain));
        }
        let scaled = (plain * scale(frac_bits)).round();
        // i64::MAX as f64 is 2^63 which is already out of range
        if scaled >= i64::MAX as f64 || scaled < i64::MIN as f64 {
            return Err(MpcError::OutOfRange {
                value: plain,
                frac_bits,
            });
        }
        Ok(scaled as i64 as u64)
    }

    fn decode(raw: u64, frac_bits: u32) -> f64 {
        raw as i64 as f64 / scale(frac_bits)
    }
}

fn scale(frac_bits: u32) -> f64 {
    (1_u64 << frac_bits) as f64
}

pub struct Secret<T: SecureType> {
    pub(crate) id: ShareId,
    pub(crate) session: Arc<SessionShared>,
    secure_type: PhantomData<T>,
}

impl<T: SecureType> Secret<T> {
    pub(crate) fn from_parts(id: ShareId, session: Arc<SessionShared>) -> Self {
        Self {
            id,
            session,
            secure_type: PhantomData,
        }
    }

    pub fn id(&self) -> ShareId {
        self.id
    }

    pub(crate) fn belongs_to(&self, session: &Arc<SessionShared>) -> bool {
        Arc::ptr_eq(&self.session, session)
    }

    fn apply(&self, op: &'static str, cmd: impl FnMut(usize) -> Command) {
        if let Err(err) = self.session.broadcast(cmd) {
            warn!(%err, id = self.id, op, "Secret operation was not delivered");
        }
    }
}

impl<T: SecureType> AddAssign<&Secret<T>> for Secret<T> {
    fn add_assign(&mut self, rhs: &Secret<T>) {
        assert!(
            rhs.belongs_to(&self.session),
            "Secret operations are only defined on secrets of the same session"
        );
        let (dst, rhs) = (self.id, rhs.id);
        self.apply("add", |_| Command::Add { dst, rhs });
    }
}

impl<T: SecureType> AddAssign for Secret<T> {
    fn add_assign(&mut self, rhs: Self) {
        *self += &rhs;
    }
}

impl<T: SecureType> Add<&Secret<T>> for Secret<T> {
    type Output = Self;

    fn add(mut self, rhs: &Secret<T>) -> Self::Output {
        self += rhs;
        self
    }
}

impl<T: SecureType> Add for Secret<T> {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += &rhs;
        self
    }
}

impl AddAssign<i64> for Secret<Integer> {
    fn add_assign(&mut self, rhs: i64) {
        let dst = self.id;
        // Integer encoding is infallible
        let constant = rhs as u64;
        self.apply("add_const", |_| Command::AddConst { dst, constant });
    }
}

impl Add<i64> for Secret<Integer> {
    type Output = Self;

    fn add(mut self, rhs: i64) -> Self::Output {
        self += rhs;
        self
    }
}

impl<T: SecureType> Drop for Secret<T> {
    fn drop(&mut self) {
        let id = self.id;
        if self.session.broadcast(|_| Command::Free { id }).is_err() {
            trace!(id, "Session already closed, shares are freed with the parties");
        }
    }
}

impl<T: SecureType> Debug for Secret<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("type", &T::NAME)
            .field("id", &self.id)
            .finish()
    }
}
