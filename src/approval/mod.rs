//! Human approval of value-moving requests
//!
//! - [`summary`]: what the user is shown
//! - [`broker`]: single-flight prompt and outcome routing

pub mod broker;
pub mod summary;

pub use broker::{
    ApprovalBroker, ApprovalConfig, ApprovalId, ApprovalOutcome, Decision, PendingApproval,
    QueuePolicy, DEFAULT_APPROVAL_TIMEOUT,
};
pub use summary::{
    extract_summary, PayloadDecoder, SummaryField, TransactionKind, TransactionSummary,
    RECLAIM_RECIPIENT,
};
