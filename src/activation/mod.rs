//! Incoming activation URLs (`manta://<action>`)
//!
//! The OS hands the app deep links on cold start and while running. They are
//! processed strictly one at a time: [`ActivationGuard`] holds a single-permit
//! semaphore for the whole of each activation, and the permit is returned on
//! every exit path by drop.
//!
//! Only `show` is supported. A URL that does not parse or uses another scheme
//! raises an error dialog; an unknown action is logged and ignored.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

use crate::types::{Result, SignerError};
use crate::ui::{MessageDialog, UiBridge};

/// Deep-link scheme registered for the signer
pub const ACTIVATION_SCHEME: &str = "manta";

/// Activations processed concurrently
pub const CONCURRENT_ACTIVATIONS: usize = 1;

/// A parsed activation URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingUrl {
    pub action: String,
    pub params: Vec<(String, String)>,
}

impl IncomingUrl {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse `manta://<action>?<params>`
///
/// The action is the host and path with surrounding slashes trimmed, so
/// `manta://show`, `manta://show/` and `manta:show` all name `show`.
pub fn parse_incoming_url(raw: &str) -> Result<IncomingUrl> {
    let url = Url::parse(raw.trim()).map_err(|e| SignerError::InvalidUrl(e.to_string()))?;

    if url.scheme() != ACTIVATION_SCHEME {
        return Err(SignerError::InvalidUrl(format!(
            "not a {}:// url",
            ACTIVATION_SCHEME
        )));
    }

    let mut action = url.host_str().unwrap_or_default().to_string();
    action.push_str(url.path());

    Ok(IncomingUrl {
        action: action.trim_matches('/').to_string(),
        params: url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
    })
}

/// What an activation ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationResult {
    /// Main window brought to front
    Shown,
    /// Well-formed URL with an action we do not handle
    Ignored(String),
    /// Unparseable URL or wrong scheme; the user saw an error dialog
    Invalid(String),
}

pub struct ActivationGuard {
    slot: Semaphore,
    ui: Arc<dyn UiBridge>,
}

impl ActivationGuard {
    pub fn new(ui: Arc<dyn UiBridge>) -> Self {
        Self {
            slot: Semaphore::new(CONCURRENT_ACTIVATIONS),
            ui,
        }
    }

    /// Process one activation, waiting for any in-flight one to finish first
    pub async fn handle(&self, raw: &str) -> Result<ActivationResult> {
        let _permit = self
            .slot
            .acquire()
            .await
            .map_err(|_| SignerError::Internal("activation slot closed".into()))?;

        info!("incoming URL: {}", raw);

        let incoming = match parse_incoming_url(raw) {
            Ok(incoming) => incoming,
            Err(e) => {
                let reason = e.to_string();
                warn!("Rejecting activation URL {}: {}", raw, reason);
                if let Err(dialog_err) = self.ui.message_dialog(MessageDialog::error("Invalid URL", &reason)) {
                    warn!("Failed to show invalid URL dialog: {}", dialog_err);
                }
                return Ok(ActivationResult::Invalid(reason));
            }
        };

        debug!(action = %incoming.action, params = ?incoming.params, "Parsed activation");

        match incoming.action.as_str() {
            "show" => {
                self.ui.show_window();
                Ok(ActivationResult::Shown)
            }
            other => {
                info!("incoming URL: skipping, unknown action {:?}", other);
                Ok(ActivationResult::Ignored(other.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::{DialogKind, EventHub, UiNotification};

    #[test]
    fn test_parse_show_forms() {
        for raw in ["manta://show", "manta://show/", "manta:show", " manta://show "] {
            let parsed = parse_incoming_url(raw).unwrap();
            assert_eq!(parsed.action, "show", "{}", raw);
        }
    }

    #[test]
    fn test_parse_keeps_params() {
        let parsed = parse_incoming_url("manta://show?tab=assets&x=1").unwrap();
        assert_eq!(parsed.param("tab"), Some("assets"));
        assert_eq!(parsed.param("x"), Some("1"));
        assert_eq!(parsed.param("missing"), None);
    }

    #[test]
    fn test_parse_rejects_wrong_scheme_and_garbage() {
        assert!(matches!(
            parse_incoming_url("notmanta://show"),
            Err(SignerError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_incoming_url("not a url"),
            Err(SignerError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_handle_outcomes() {
        let hub = Arc::new(EventHub::default());
        let mut rx = hub.subscribe();
        let guard = ActivationGuard::new(hub.clone());

        assert_eq!(
            guard.handle("manta://unknown").await.unwrap(),
            ActivationResult::Ignored("unknown".into())
        );
        assert!(rx.try_recv().is_err());

        let result = guard.handle("notmanta://show").await.unwrap();
        assert!(matches!(result, ActivationResult::Invalid(_)));
        match rx.try_recv().unwrap() {
            UiNotification::Dialog(dialog) => {
                assert_eq!(dialog.kind, DialogKind::Error);
                assert_eq!(dialog.title, "Invalid URL");
            }
            other => panic!("expected dialog, got {:?}", other),
        }
        assert!(!hub.is_window_visible());

        assert_eq!(
            guard.handle("manta://show").await.unwrap(),
            ActivationResult::Shown
        );
        assert_eq!(rx.try_recv().unwrap(), UiNotification::ShowWindow);
    }

    #[tokio::test]
    async fn test_slot_is_released_after_invalid_url() {
        let hub = Arc::new(EventHub::default());
        let guard = ActivationGuard::new(hub);

        guard.handle("::::").await.unwrap();
        assert_eq!(guard.slot.available_permits(), CONCURRENT_ACTIVATIONS);
    }
}
