//! Broadcast hub implementation of the UI bridge
//!
//! Every call on the bridge is published as a [`UiNotification`] to all
//! subscribers: the embedding GUI, the headless console, or a test. Sending
//! never blocks and succeeds even with no subscriber attached.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tracing::debug;

use super::{MessageDialog, UiBridge, UiEvent};
use crate::types::Result;

/// Default notification buffer per subscriber
pub const DEFAULT_HUB_CAPACITY: usize = 64;

/// Something the core asked the UI to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiNotification {
    ShowWindow,
    HideWindow,
    Event(UiEvent),
    Dialog(MessageDialog),
}

pub struct EventHub {
    sender: broadcast::Sender<UiNotification>,
    window_visible: AtomicBool,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            window_visible: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiNotification> {
        self.sender.subscribe()
    }

    /// Whether the last window request was a show
    pub fn is_window_visible(&self) -> bool {
        self.window_visible.load(Ordering::Acquire)
    }

    fn publish(&self, notification: UiNotification) {
        let receivers = self.sender.receiver_count();
        debug!(?notification, receivers, "UI notification");
        // Err only means nobody is listening right now
        let _ = self.sender.send(notification);
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_HUB_CAPACITY)
    }
}

impl UiBridge for EventHub {
    fn show_window(&self) {
        self.window_visible.store(true, Ordering::Release);
        self.publish(UiNotification::ShowWindow);
    }

    fn hide_window(&self) {
        self.window_visible.store(false, Ordering::Release);
        self.publish(UiNotification::HideWindow);
    }

    fn emit(&self, event: UiEvent) {
        self.publish(UiNotification::Event(event));
    }

    fn message_dialog(&self, dialog: MessageDialog) -> Result<()> {
        self.publish(UiNotification::Dialog(dialog));
        Ok(())
    }
}
