//! Headless console surface
//!
//! Stands in for the GUI when the daemon runs without one: every UI
//! notification is printed to stdout, and lines typed on stdin answer
//! prompts, create the account, sign in, or replay an activation URL.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use super::{UiEvent, UiNotification};
use crate::approval::{ApprovalId, Decision};
use crate::server::AppState;

#[derive(Debug, Parser)]
#[command(name = "console", no_binary_name = true)]
struct ConsoleLine {
    #[command(subcommand)]
    command: ConsoleCommand,
}

/// Commands accepted on the console
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum ConsoleCommand {
    /// Approve the pending transaction (or the one with this id)
    Approve {
        #[arg(value_parser = parse_approval_id)]
        id: Option<ApprovalId>,
    },

    /// Reject the pending transaction (or the one with this id)
    Reject {
        #[arg(value_parser = parse_approval_id)]
        id: Option<ApprovalId>,
    },

    /// Create the account with a password (rest of the line)
    Create {
        #[arg(allow_hyphen_values = true)]
        password: String,
    },

    /// Sign in with the account password (rest of the line)
    Unlock {
        #[arg(allow_hyphen_values = true)]
        password: String,
    },

    /// Handle an activation URL, e.g. manta://show
    Open { url: String },

    /// Show session and approval state
    Status,
}

fn parse_approval_id(s: &str) -> Result<ApprovalId, String> {
    ApprovalId::parse(s).ok_or_else(|| format!("{:?} is not an approval id", s))
}

/// Parse one console line
///
/// Passwords take the rest of the line verbatim, inner spaces included.
pub fn parse_command(line: &str) -> Result<ConsoleCommand, clap::Error> {
    let line = line.trim();
    let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim_start();

    let parsed = match head {
        "create" | "unlock" if !rest.is_empty() => ConsoleLine::try_parse_from([head, rest]),
        _ => ConsoleLine::try_parse_from(line.split_whitespace()),
    };
    parsed.map(|parsed| parsed.command)
}

/// One-line rendering of a notification
pub fn describe(notification: &UiNotification) -> String {
    match notification {
        UiNotification::ShowWindow => "[window] show".to_string(),
        UiNotification::HideWindow => "[window] hide".to_string(),
        UiNotification::Event(UiEvent::OpenAuthorizeTransaction {
            approval_id,
            summary,
        }) => format!(
            "[authorize {}] {}: {} {} to {} (approve | reject)",
            approval_id,
            summary.kind.label(),
            summary.value,
            summary.denomination,
            summary.recipient
        ),
        UiNotification::Event(event) => {
            let payload = event.payload();
            if payload.is_null() {
                format!("[event] {}", event.name())
            } else {
                format!("[event] {} {}", event.name(), payload)
            }
        }
        UiNotification::Dialog(dialog) => {
            format!("[{:?}] {}: {}", dialog.kind, dialog.title, dialog.message)
        }
    }
}

/// Run a parsed command against the daemon and describe the result
pub async fn execute(state: &AppState, command: ConsoleCommand) -> String {
    match command {
        ConsoleCommand::Approve { id } => resolve(state, id, Decision::Approved),
        ConsoleCommand::Reject { id } => resolve(state, id, Decision::Rejected),
        ConsoleCommand::Create { password } => match state.accounts.create_account(&password).await {
            Ok(phrase) => format!("Account created. Recovery phrase: {}", phrase.as_str()),
            Err(e) => format!("Account creation failed: {}", e),
        },
        ConsoleCommand::Unlock { password } => match state.accounts.unlock(&password).await {
            Ok(()) => "Signed in".to_string(),
            Err(e) => format!("Sign-in failed: {}", e),
        },
        ConsoleCommand::Open { url } => match state.activation.handle(&url).await {
            Ok(result) => format!("Activation: {:?}", result),
            Err(e) => format!("Activation failed: {}", e),
        },
        ConsoleCommand::Status => {
            let flags = state.session.flags();
            let pending = match state.broker.pending() {
                Some(approval) => format!(
                    "{} ({} {} {})",
                    approval.id,
                    approval.summary.kind.label(),
                    approval.summary.value,
                    approval.summary.denomination
                ),
                None => "none".to_string(),
            };
            format!(
                "account: {}, signed in: {}, pending approval: {}",
                flags.account_exists, flags.signed_in, pending
            )
        }
    }
}

fn resolve(state: &AppState, id: Option<ApprovalId>, decision: Decision) -> String {
    let Some(id) = id.or_else(|| state.broker.pending().map(|approval| approval.id)) else {
        return "No transaction awaiting approval".to_string();
    };

    if state.broker.resolve(id, decision) {
        format!("{:?} {}", decision, id)
    } else {
        format!("No pending approval {}", id)
    }
}

/// Print notifications and serve stdin commands until stdin closes
pub async fn run_console(
    state: Arc<AppState>,
    notifications: broadcast::Receiver<UiNotification>,
) -> std::io::Result<()> {
    tokio::spawn(print_notifications(notifications));

    println!("Console ready. Commands: approve, reject, create, unlock, open, status, help");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_command(line) {
            Ok(command) => println!("{}", execute(&state, command).await),
            Err(e) => println!("{}", e),
        }
    }

    debug!("Console input closed");
    Ok(())
}

async fn print_notifications(mut notifications: broadcast::Receiver<UiNotification>) {
    loop {
        match notifications.recv().await {
            Ok(notification) => println!("{}", describe(&notification)),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Console fell behind UI notifications");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::{TransactionKind, TransactionSummary};
    use crate::server::GatewayConfig;
    use crate::session::FileAccountStore;
    use crate::signer::UnavailableSigner;
    use crate::ui::EventHub;

    fn state(hub: Arc<EventHub>, dir: &std::path::Path) -> Arc<AppState> {
        Arc::new(AppState::new(
            GatewayConfig::default(),
            Arc::new(UnavailableSigner),
            Arc::new(UnavailableSigner),
            hub,
            Arc::new(FileAccountStore::new(dir)),
        ))
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("approve").unwrap(), ConsoleCommand::Approve { id: None });
        assert_eq!(parse_command("status").unwrap(), ConsoleCommand::Status);
        assert_eq!(
            parse_command("open manta://show").unwrap(),
            ConsoleCommand::Open {
                url: "manta://show".into()
            }
        );

        let id = ApprovalId::new();
        assert_eq!(
            parse_command(&format!("reject {}", id)).unwrap(),
            ConsoleCommand::Reject { id: Some(id) }
        );
    }

    #[test]
    fn test_passwords_keep_spaces() {
        assert_eq!(
            parse_command("unlock correct horse  battery staple").unwrap(),
            ConsoleCommand::Unlock {
                password: "correct horse  battery staple".into()
            }
        );
        assert_eq!(
            parse_command("create   -leading dash ").unwrap(),
            ConsoleCommand::Create {
                password: "-leading dash".into()
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_command("approve not-a-uuid").is_err());
        assert!(parse_command("unlock").is_err());
        assert!(parse_command("launch").is_err());
    }

    #[test]
    fn test_describe_prompt() {
        let id = ApprovalId::new();
        let line = describe(&UiNotification::Event(UiEvent::OpenAuthorizeTransaction {
            approval_id: id,
            summary: TransactionSummary {
                kind: TransactionKind::Reclaim,
                value: "5".into(),
                denomination: "DOL".into(),
                recipient: "your public wallet".into(),
            },
        }));
        assert!(line.contains(&id.to_string()));
        assert!(line.contains("Withdraw: 5 DOL to your public wallet"));

        assert_eq!(
            describe(&UiNotification::Event(UiEvent::OpenSignIn)),
            "[event] manta.browser.openSignIn"
        );
    }

    #[tokio::test]
    async fn test_approve_without_pending() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(Arc::new(EventHub::default()), dir.path());

        let reply = execute(&state, ConsoleCommand::Approve { id: None }).await;
        assert_eq!(reply, "No transaction awaiting approval");

        let reply = execute(&state, ConsoleCommand::Status).await;
        assert_eq!(reply, "account: false, signed in: false, pending approval: none");
    }

    #[tokio::test]
    async fn test_approve_resolves_pending_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let hub = Arc::new(EventHub::default());
        let mut rx = hub.subscribe();
        let state = state(hub, dir.path());

        let waiter = {
            let state = state.clone();
            tokio::spawn(async move {
                state
                    .broker
                    .request_approval(TransactionKind::Reclaim, b"tx")
                    .await
            })
        };
        loop {
            if let UiNotification::Event(UiEvent::OpenAuthorizeTransaction { .. }) = rx.recv().await.unwrap() {
                break;
            }
        }

        let reply = execute(&state, ConsoleCommand::Approve { id: None }).await;
        assert!(reply.starts_with("Approved"), "{}", reply);
        assert_eq!(
            waiter.await.unwrap().unwrap(),
            crate::approval::ApprovalOutcome::Approved
        );
    }

    #[tokio::test]
    async fn test_unlock_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(Arc::new(EventHub::default()), dir.path());

        let reply = execute(
            &state,
            ConsoleCommand::Unlock {
                password: "pw".into(),
            },
        )
        .await;
        assert!(reply.starts_with("Sign-in failed"), "{}", reply);
        assert!(!state.session.is_signed_in());
    }
}
