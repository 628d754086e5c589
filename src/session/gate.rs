//! Session gate
//!
//! Holds a request until the session satisfies its requirement. When the
//! account is missing or the user is signed out, the UI is navigated to the
//! matching screen and the caller parks on the session's watch channel until
//! the account service flips the flag, or until the gate timeout elapses.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{Session, SessionFlags};
use crate::types::{Result, SignerError};
use crate::ui::{UiBridge, UiEvent};

/// Default bound on a gate wait
pub const DEFAULT_GATE_TIMEOUT: Duration = Duration::from_secs(600);

/// What a request needs from the session before it may proceed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    AccountMustExist,
    /// Implies the account exists as well
    MustBeSignedIn,
}

pub struct SessionGate {
    session: Arc<Session>,
    ui: Arc<dyn UiBridge>,
    timeout: Duration,
}

impl SessionGate {
    pub fn new(session: Arc<Session>, ui: Arc<dyn UiBridge>, timeout: Duration) -> Self {
        Self {
            session,
            ui,
            timeout,
        }
    }

    /// Wait until `requirement` holds
    ///
    /// Returns immediately when it already does. Never mutates the session.
    /// Fails with [`SignerError::Abandoned`] once the timeout elapses; the
    /// whole wait (account creation plus sign-in) shares one deadline.
    pub async fn wait(&self, requirement: Requirement) -> Result<()> {
        let deadline = Instant::now() + self.timeout;
        // Subscribe before reading so no flag change can slip between the two
        let mut flags = self.session.subscribe();

        let account_exists = flags.borrow().account_exists;
        if !account_exists {
            info!("No account yet, sending user to account creation");
            self.ui.show_window();
            self.ui.emit(UiEvent::OpenCreateAccount);
            self.park(&mut flags, deadline, "account creation", |f| f.account_exists)
                .await?;
        }

        let signed_in = flags.borrow().signed_in;
        if requirement == Requirement::MustBeSignedIn && !signed_in {
            info!("User not signed in, sending user to sign-in");
            self.ui.show_window();
            self.ui.emit(UiEvent::OpenSignIn);
            self.park(&mut flags, deadline, "sign-in", |f| f.signed_in)
                .await?;
        }

        debug!(?requirement, "Session gate passed");
        Ok(())
    }

    async fn park(
        &self,
        flags: &mut watch::Receiver<SessionFlags>,
        deadline: Instant,
        what: &str,
        satisfied: impl FnMut(&SessionFlags) -> bool,
    ) -> Result<()> {
        match tokio::time::timeout_at(deadline, flags.wait_for(satisfied)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(SignerError::Internal("session channel closed".into())),
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Gave up waiting for {}", what);
                Err(SignerError::Abandoned(format!("{} not completed in time", what)))
            }
        }
    }
}
