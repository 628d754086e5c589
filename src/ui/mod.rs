//! Bridge to the signer's graphical surface
//!
//! The window, menus and prompts live in a separate UI process or embedding
//! GUI. The core only needs to show or hide the main window, emit named
//! events, and raise the occasional message dialog. Outcomes flow back through
//! [`ApprovalBroker::resolve`](crate::approval::ApprovalBroker::resolve) and
//! the [`AccountService`](crate::session::AccountService).

pub mod console;
pub mod hub;

pub use hub::{EventHub, UiNotification};

use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use crate::approval::{ApprovalId, TransactionSummary};
use crate::types::Result;

/// UI navigates to account creation
pub const EVENT_OPEN_CREATE_ACCOUNT: &str = "manta.browser.openCreateAccount";
/// UI navigates to sign-in
pub const EVENT_OPEN_SIGN_IN: &str = "manta.browser.openSignIn";
/// UI shows the transaction authorization prompt
pub const EVENT_OPEN_AUTHORIZE_TRANSACTION: &str = "manta.browser.openAuthorizeTransaction";
/// UI should drop a prompt whose request is gone
pub const EVENT_CLOSE_AUTHORIZE_TRANSACTION: &str = "manta.browser.closeAuthorizeTransaction";

/// UI reports that the user approved the pending transaction
pub const SIGNAL_UNLOCK_SUCCESS: &str = "manta.server.onUnlockSuccess";
/// UI reports that the user declined the pending transaction
pub const SIGNAL_UNLOCK_FAIL: &str = "manta.server.onUnlockFail";

/// Events the core emits towards the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    OpenCreateAccount,
    OpenSignIn,
    OpenAuthorizeTransaction {
        approval_id: ApprovalId,
        summary: TransactionSummary,
    },
    CloseAuthorizeTransaction {
        approval_id: ApprovalId,
    },
}

/// Payload of the authorization prompt event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizePayload<'a> {
    pub approval_id: ApprovalId,
    pub transaction_type: &'a str,
    pub value: &'a str,
    pub denomination: &'a str,
    pub recipient: &'a str,
}

impl UiEvent {
    /// Event name on the UI bus
    pub fn name(&self) -> &'static str {
        match self {
            UiEvent::OpenCreateAccount => EVENT_OPEN_CREATE_ACCOUNT,
            UiEvent::OpenSignIn => EVENT_OPEN_SIGN_IN,
            UiEvent::OpenAuthorizeTransaction { .. } => EVENT_OPEN_AUTHORIZE_TRANSACTION,
            UiEvent::CloseAuthorizeTransaction { .. } => EVENT_CLOSE_AUTHORIZE_TRANSACTION,
        }
    }

    /// JSON payload delivered with the event
    pub fn payload(&self) -> JsonValue {
        match self {
            UiEvent::OpenCreateAccount | UiEvent::OpenSignIn => JsonValue::Null,
            UiEvent::OpenAuthorizeTransaction {
                approval_id,
                summary,
            } => serde_json::to_value(AuthorizePayload {
                approval_id: *approval_id,
                transaction_type: summary.kind.label(),
                value: &summary.value,
                denomination: &summary.denomination,
                recipient: &summary.recipient,
            })
            .unwrap_or_default(),
            UiEvent::CloseAuthorizeTransaction { approval_id } => {
                json!({ "approvalId": approval_id })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    Info,
    Error,
}

/// A modal message dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDialog {
    pub kind: DialogKind,
    pub title: String,
    pub message: String,
}

impl MessageDialog {
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: DialogKind::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// The UI surface as seen from the core
pub trait UiBridge: Send + Sync {
    /// Bring the main window to the front
    fn show_window(&self);

    fn hide_window(&self);

    /// Emit a named event on the UI bus
    fn emit(&self, event: UiEvent);

    /// Show a modal dialog
    fn message_dialog(&self, dialog: MessageDialog) -> Result<()>;
}
