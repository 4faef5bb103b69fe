//! Push message parsing and notification click routing.
//!
//! Payloads arrive as JSON from the push service while the page is not
//! necessarily open. Malformed payloads are dropped without display.

use serde::Deserialize;
use tracing::warn;

/// Tag shared by all notifications so repeated pushes replace rather
/// than stack.
pub const NOTIFICATION_TAG: &str = "vowkit";

/// Action ID for the open button and the default tap.
pub const ACTION_OPEN: &str = "open";
/// Action ID for the close button.
pub const ACTION_CLOSE: &str = "close";

const DEFAULT_TITLE: &str = "Wedding planner";
const DEFAULT_BODY: &str = "You have a new update.";

/// Inbound push payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushMessage {
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub image: Option<String>,
    pub data: Option<PushData>,
}

/// Navigation payload carried by a push message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushData {
    /// Explicit target; wins over `type`.
    pub url: Option<String>,
    /// Message kind: "rsvp", "gift", "upload", or anything else.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Guest to highlight for RSVP messages.
    pub guest_id: Option<u64>,
}

impl PushMessage {
    /// Parse a push payload. Malformed JSON is dropped, no retry.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match serde_json::from_slice(payload) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(error = %e, "Dropping malformed push payload");
                None
            }
        }
    }

    /// Build the notification to display, applying placeholder defaults.
    pub fn into_notification(self) -> Notification {
        Notification {
            tag: NOTIFICATION_TAG.to_string(),
            title: self.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: self.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
            icon: self.icon,
            badge: self.badge,
            image: self.image,
            data: self.data,
            actions: vec![
                NotificationAction {
                    action: ACTION_OPEN.to_string(),
                    title: "Open".to_string(),
                },
                NotificationAction {
                    action: ACTION_CLOSE.to_string(),
                    title: "Close".to_string(),
                },
            ],
        }
    }
}

/// A button on a displayed notification.
#[derive(Debug, Clone)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// A displayed system notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub tag: String,
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub image: Option<String>,
    pub data: Option<PushData>,
    pub actions: Vec<NotificationAction>,
}

/// Resolve the navigation target for a clicked notification.
///
/// An explicit `data.url` wins; otherwise the message kind maps to the
/// guest list (deep-linked to a highlighted guest when given), the gift
/// list, the upload-approval queue, or home.
pub fn resolve_target(data: Option<&PushData>) -> String {
    let Some(data) = data else {
        return "/".to_string();
    };

    if let Some(ref url) = data.url {
        return url.clone();
    }

    match data.kind.as_deref() {
        Some("rsvp") => match data.guest_id {
            Some(id) => format!("/guests?highlight={}", id),
            None => "/guests".to_string(),
        },
        Some("gift") => "/gifts".to_string(),
        Some("upload") => "/uploads/approval".to_string(),
        _ => "/".to_string(),
    }
}
