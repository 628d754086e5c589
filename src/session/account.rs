//! Account creation and unlock
//!
//! The only writers of the session. Both operations call into the signer on
//! the blocking pool, then flip the matching session flag, which wakes every
//! request parked in the session gate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};
use zeroize::Zeroizing;

use super::{RootSeed, Session};
use crate::signer::Signer;
use crate::types::{Result, SignerError};
use crate::ui::UiBridge;

/// File the zkp library writes the encrypted root seed to
pub const ACCOUNT_FLAG_FILE: &str = "root_seed.aes";

/// On-disk record of whether an account was created
pub trait AccountStore: Send + Sync {
    fn account_exists(&self) -> bool;

    /// Persist the account-created fact; idempotent
    fn mark_created(&self) -> Result<()>;
}

/// Account flag backed by the encrypted seed file in the data directory
#[derive(Debug, Clone)]
pub struct FileAccountStore {
    path: PathBuf,
}

impl FileAccountStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(ACCOUNT_FLAG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AccountStore for FileAccountStore {
    fn account_exists(&self) -> bool {
        // Unreadable metadata counts as "no account", same as a missing file
        self.path.try_exists().unwrap_or(false)
    }

    fn mark_created(&self) -> Result<()> {
        if self.account_exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        Ok(())
    }
}

/// Operations the UI host calls to create an account or sign in
pub struct AccountService {
    session: Arc<Session>,
    store: Arc<dyn AccountStore>,
    signer: Arc<dyn Signer>,
    ui: Arc<dyn UiBridge>,
}

impl AccountService {
    pub fn new(
        session: Arc<Session>,
        store: Arc<dyn AccountStore>,
        signer: Arc<dyn Signer>,
        ui: Arc<dyn UiBridge>,
    ) -> Self {
        Self {
            session,
            store,
            signer,
            ui,
        }
    }

    /// Whether an account exists, per the on-disk flag
    pub fn account_created(&self) -> bool {
        self.store.account_exists()
    }

    /// Create the account and return its recovery phrase
    pub async fn create_account(&self, password: &str) -> Result<Zeroizing<String>> {
        let signer = self.signer.clone();
        let password = Zeroizing::new(password.to_string());
        let phrase = tokio::task::spawn_blocking(move || signer.create_account(&password))
            .await
            .map_err(|e| SignerError::Internal(format!("create_account task failed: {}", e)))?
            .map_err(|e| {
                error!("Error creating account: {}", e);
                e
            })?;

        self.store.mark_created()?;
        self.session.mark_account_created();
        info!("Account created");
        Ok(phrase)
    }

    /// Load the root seed with `password` and sign the user in
    ///
    /// A wrong password leaves the session untouched.
    pub async fn unlock(&self, password: &str) -> Result<()> {
        let signer = self.signer.clone();
        let password = Zeroizing::new(password.to_string());
        let seed: RootSeed = tokio::task::spawn_blocking(move || signer.load_root_seed(&password))
            .await
            .map_err(|e| SignerError::Internal(format!("load_root_seed task failed: {}", e)))?
            .map_err(|e| {
                warn!("Error loading root seed: {}", e);
                e
            })?;

        self.session.sign_in(seed).await;
        Ok(())
    }

    pub fn show_window(&self) {
        self.ui.show_window();
    }

    pub fn hide_window(&self) {
        self.ui.hide_window();
    }
}
