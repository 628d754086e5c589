//! Process-wide signer session
//!
//! Tracks whether an account exists, whether the user has signed in, and the
//! root seed that becomes available once they have. The flags travel on a
//! `watch` channel so gate waiters are woken by the mutation itself instead
//! of polling.
//!
//! Only [`AccountService`](account::AccountService) writes the session; every
//! other component reads it.

pub mod account;
pub mod gate;

pub use account::{AccountService, AccountStore, FileAccountStore, ACCOUNT_FLAG_FILE};
pub use gate::{Requirement, SessionGate};

use std::fmt;
use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tracing::info;
use zeroize::Zeroize;

/// Length of the root seed produced by the zkp library
pub const ROOT_SEED_LEN: usize = 64;

/// Root seed loaded on unlock
///
/// Zeroized on drop. `Debug` never prints the bytes.
#[derive(Clone)]
pub struct RootSeed(Box<[u8; ROOT_SEED_LEN]>);

impl RootSeed {
    pub fn new(bytes: [u8; ROOT_SEED_LEN]) -> Self {
        Self(Box::new(bytes))
    }

    /// Build a seed from a slice, failing unless it is exactly 64 bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; ROOT_SEED_LEN] = bytes.try_into().ok()?;
        Some(Self::new(array))
    }

    pub fn as_bytes(&self) -> &[u8; ROOT_SEED_LEN] {
        &self.0
    }
}

impl Drop for RootSeed {
    fn drop(&mut self) {
        let bytes: &mut [u8; ROOT_SEED_LEN] = &mut self.0;
        bytes.zeroize();
    }
}

impl fmt::Debug for RootSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RootSeed(<redacted>)")
    }
}

/// Observable session flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionFlags {
    pub account_exists: bool,
    pub signed_in: bool,
}

/// The single session of this process
pub struct Session {
    flags: watch::Sender<SessionFlags>,
    root_seed: RwLock<Option<Arc<RootSeed>>>,
}

/// Shared handle passed to the gate, router and account service
pub type SessionState = Arc<Session>;

impl Session {
    /// Create a signed-out session
    pub fn new(account_exists: bool) -> Self {
        let (flags, _) = watch::channel(SessionFlags {
            account_exists,
            signed_in: false,
        });

        Self {
            flags,
            root_seed: RwLock::new(None),
        }
    }

    pub fn flags(&self) -> SessionFlags {
        *self.flags.borrow()
    }

    pub fn account_exists(&self) -> bool {
        self.flags().account_exists
    }

    pub fn is_signed_in(&self) -> bool {
        self.flags().signed_in
    }

    /// Receiver that observes every flag change
    pub fn subscribe(&self) -> watch::Receiver<SessionFlags> {
        self.flags.subscribe()
    }

    /// Root seed for downstream signer calls, present only once signed in
    pub async fn root_seed(&self) -> Option<Arc<RootSeed>> {
        self.root_seed.read().await.clone()
    }

    /// Record that the account now exists; this never reverts
    pub(crate) fn mark_account_created(&self) {
        self.flags.send_if_modified(|flags| {
            if flags.account_exists {
                return false;
            }
            flags.account_exists = true;
            true
        });
        info!("Account marked as created");
    }

    /// Install the root seed and flip the signed-in flag
    ///
    /// The seed is written before the flag so a woken waiter always finds it.
    pub(crate) async fn sign_in(&self, seed: RootSeed) {
        {
            let mut slot = self.root_seed.write().await;
            *slot = Some(Arc::new(seed));
        }

        self.flags.send_modify(|flags| {
            flags.account_exists = true;
            flags.signed_in = true;
        });
        info!("User signed in, root seed loaded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_seed_debug_is_redacted() {
        let seed = RootSeed::new([7u8; ROOT_SEED_LEN]);
        assert_eq!(format!("{:?}", seed), "RootSeed(<redacted>)");
    }

    #[test]
    fn test_root_seed_from_slice_requires_exact_length() {
        assert!(RootSeed::from_slice(&[1u8; 32]).is_none());
        assert!(RootSeed::from_slice(&[1u8; 65]).is_none());
        let seed = RootSeed::from_slice(&[1u8; 64]).expect("64 bytes");
        assert_eq!(seed.as_bytes()[63], 1);
    }

    #[tokio::test]
    async fn test_sign_in_sets_flags_and_seed() {
        let session = Session::new(false);
        assert_eq!(session.flags(), SessionFlags::default());
        assert!(session.root_seed().await.is_none());

        session.sign_in(RootSeed::new([3u8; ROOT_SEED_LEN])).await;

        assert!(session.account_exists());
        assert!(session.is_signed_in());
        let seed = session.root_seed().await.expect("seed loaded");
        assert_eq!(seed.as_bytes()[0], 3);
    }

    #[tokio::test]
    async fn test_subscribers_observe_account_creation() {
        let session = Session::new(false);
        let mut rx = session.subscribe();

        session.mark_account_created();

        rx.changed().await.expect("sender alive");
        assert!(rx.borrow().account_exists);
        assert!(!rx.borrow().signed_in);
    }
}
