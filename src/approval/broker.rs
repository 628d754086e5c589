//! Approval broker
//!
//! Single-flight mediation of human approval for value-moving requests.
//!
//! A request claims the one approval slot (a semaphore with a single permit),
//! installs a [`PendingApproval`] under a fresh [`ApprovalId`], shows the
//! prompt and parks on a oneshot channel owned by that approval alone. The UI
//! resolves by id, so an outcome can never land on a later request. The slot
//! is released when the request finishes or its future is dropped.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Semaphore, TryAcquireError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::summary::{extract_summary, PayloadDecoder, TransactionKind, TransactionSummary};
use crate::types::{Result, SignerError};
use crate::ui::{UiBridge, UiEvent, SIGNAL_UNLOCK_FAIL, SIGNAL_UNLOCK_SUCCESS};

/// Default bound on how long the user has to answer a prompt
pub const DEFAULT_APPROVAL_TIMEOUT: Duration = Duration::from_secs(300);

/// Identity of one pending approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalId(Uuid);

impl ApprovalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(Self)
    }
}

impl Default for ApprovalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The user's answer to a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    /// Map a UI outcome signal name to a decision
    pub fn from_signal(name: &str) -> Option<Self> {
        match name {
            SIGNAL_UNLOCK_SUCCESS => Some(Decision::Approved),
            SIGNAL_UNLOCK_FAIL => Some(Decision::Rejected),
            _ => None,
        }
    }
}

/// Terminal outcome of an approval request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    Approved,
    Rejected,
    /// The UI never answered, or the prompt was cancelled
    Abandoned,
}

/// Behaviour when a second value-moving request arrives mid-approval
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePolicy {
    /// Block until the current approval resolves
    #[default]
    Wait,
    /// Fail immediately with [`SignerError::Busy`]
    Reject,
}

#[derive(Debug, Clone)]
pub struct ApprovalConfig {
    pub timeout: Duration,
    pub queue: QueuePolicy,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_APPROVAL_TIMEOUT,
            queue: QueuePolicy::Wait,
        }
    }
}

/// Snapshot of the approval currently shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingApproval {
    pub id: ApprovalId,
    pub summary: TransactionSummary,
    pub created_at: DateTime<Utc>,
}

struct PendingEntry {
    approval: PendingApproval,
    resolve_tx: Option<oneshot::Sender<Decision>>,
}

pub struct ApprovalBroker {
    slot: Semaphore,
    pending: Mutex<Option<PendingEntry>>,
    ui: Arc<dyn UiBridge>,
    decoder: Arc<dyn PayloadDecoder>,
    config: ApprovalConfig,
}

impl ApprovalBroker {
    pub fn new(ui: Arc<dyn UiBridge>, decoder: Arc<dyn PayloadDecoder>, config: ApprovalConfig) -> Self {
        Self {
            slot: Semaphore::new(1),
            pending: Mutex::new(None),
            ui,
            decoder,
            config,
        }
    }

    /// Ask the user to approve a `kind` request carrying `bytes`
    ///
    /// Call only after the session gate has passed. Resolves to exactly one
    /// outcome; only [`QueuePolicy::Reject`] produces an error (`Busy`).
    pub async fn request_approval(&self, kind: TransactionKind, bytes: &[u8]) -> Result<ApprovalOutcome> {
        let summary = self.summarize(kind, bytes).await?;

        let _permit = match self.config.queue {
            QueuePolicy::Wait => self
                .slot
                .acquire()
                .await
                .map_err(|_| SignerError::Internal("approval slot closed".into()))?,
            QueuePolicy::Reject => match self.slot.try_acquire() {
                Ok(permit) => permit,
                Err(TryAcquireError::NoPermits) => {
                    info!(?kind, "Approval already pending, rejecting request");
                    return Err(SignerError::Busy);
                }
                Err(TryAcquireError::Closed) => {
                    return Err(SignerError::Internal("approval slot closed".into()));
                }
            },
        };

        let id = ApprovalId::new();
        let (resolve_tx, resolve_rx) = oneshot::channel();
        let mut guard = self.install(PendingEntry {
            approval: PendingApproval {
                id,
                summary: summary.clone(),
                created_at: Utc::now(),
            },
            resolve_tx: Some(resolve_tx),
        });

        info!(approval_id = %id, ?kind, value = %summary.value, "Awaiting user authorization");
        self.ui.show_window();
        self.ui.emit(UiEvent::OpenAuthorizeTransaction {
            approval_id: id,
            summary,
        });

        let outcome = match tokio::time::timeout(self.config.timeout, resolve_rx).await {
            Ok(Ok(Decision::Approved)) => ApprovalOutcome::Approved,
            Ok(Ok(Decision::Rejected)) => ApprovalOutcome::Rejected,
            Ok(Err(_)) => ApprovalOutcome::Abandoned,
            Err(_) => {
                warn!(
                    approval_id = %id,
                    timeout_secs = self.config.timeout.as_secs(),
                    "No answer from the UI, abandoning approval"
                );
                ApprovalOutcome::Abandoned
            }
        };

        // The UI takes the prompt down itself once the user has answered
        guard.answered = outcome != ApprovalOutcome::Abandoned;

        info!(approval_id = %id, ?outcome, "Authorization finished");
        drop(guard);
        Ok(outcome)
    }

    /// Deliver the user's decision for approval `id`
    ///
    /// Returns false when `id` is not the pending approval or was already
    /// answered; such signals are dropped.
    pub fn resolve(&self, id: ApprovalId, decision: Decision) -> bool {
        let tx = {
            let mut pending = self.lock_pending();
            match pending.as_mut() {
                Some(entry) if entry.approval.id == id => entry.resolve_tx.take(),
                _ => None,
            }
        };

        match tx {
            Some(tx) => {
                debug!(approval_id = %id, ?decision, "Resolving approval");
                tx.send(decision).is_ok()
            }
            None => {
                warn!(approval_id = %id, ?decision, "Outcome for unknown or settled approval ignored");
                false
            }
        }
    }

    /// Resolve from a named UI signal (`manta.server.onUnlockSuccess` / `onUnlockFail`)
    pub fn resolve_signal(&self, id: ApprovalId, signal: &str) -> bool {
        match Decision::from_signal(signal) {
            Some(decision) => self.resolve(id, decision),
            None => {
                warn!(approval_id = %id, signal, "Unknown approval signal");
                false
            }
        }
    }

    /// Abandon approval `id`, e.g. because the window was closed
    pub fn cancel(&self, id: ApprovalId) -> bool {
        let mut pending = self.lock_pending();
        match pending.as_mut() {
            Some(entry) if entry.approval.id == id => {
                // Dropping the sender wakes the waiter with `Abandoned`
                entry.resolve_tx.take().is_some()
            }
            _ => false,
        }
    }

    /// The approval currently awaiting the user, if any
    pub fn pending(&self) -> Option<PendingApproval> {
        self.lock_pending()
            .as_ref()
            .map(|entry| entry.approval.clone())
    }

    /// Decode the display summary on the blocking pool
    async fn summarize(&self, kind: TransactionKind, bytes: &[u8]) -> Result<TransactionSummary> {
        let decoder = self.decoder.clone();
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || extract_summary(decoder.as_ref(), kind, &bytes))
            .await
            .map_err(|e| SignerError::Internal(format!("summary task failed: {}", e)))
    }

    fn install(&self, entry: PendingEntry) -> PendingGuard<'_> {
        let id = entry.approval.id;
        let mut pending = self.lock_pending();
        if let Some(stale) = pending.replace(entry) {
            // Unreachable while the slot permit is held
            warn!(approval_id = %stale.approval.id, "Replaced a stale pending approval");
        }
        PendingGuard {
            broker: self,
            id,
            answered: false,
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<PendingEntry>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Clears the pending entry when its request finishes or is dropped
///
/// Unless the user answered, the prompt is also closed in the UI. The guard
/// drops before the slot permit, so the close event always precedes the next
/// prompt.
struct PendingGuard<'a> {
    broker: &'a ApprovalBroker,
    id: ApprovalId,
    answered: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let cleared = {
            let mut pending = self.broker.lock_pending();
            if pending.as_ref().map(|entry| entry.approval.id) == Some(self.id) {
                *pending = None;
                true
            } else {
                false
            }
        };

        if cleared && !self.answered {
            debug!(approval_id = %self.id, "Closing abandoned prompt");
            self.broker
                .ui
                .emit(UiEvent::CloseAuthorizeTransaction { approval_id: self.id });
        }
    }
}
