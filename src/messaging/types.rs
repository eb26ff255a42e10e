use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::messaging::error::ListenerResult;

/// Payload displayed to the user when a notification is shown.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub image: Option<String>,
    pub icon: Option<String>,
}

/// Message data delivered by the push provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub notification: Option<NotificationPayload>,
    #[serde(default)]
    pub data: HashMap<String, String>,
    pub from: Option<String>,
    pub collapse_key: Option<String>,
    pub message_id: Option<String>,
}

impl MessagePayload {
    /// Builds a data-only message.
    pub fn from_data<I, K, V>(data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            data: data
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }
}

/// Host-side subscriber for incoming messages and token changes.
///
/// Both callbacks default to doing nothing. Returning an error, or panicking,
/// only affects the listener that failed: the remaining listeners still run.
pub trait MessagingListener: Send + Sync {
    fn on_message_received(&self, _payload: &MessagePayload) -> ListenerResult {
        Ok(())
    }

    fn on_token_available(&self, _token: &str) -> ListenerResult {
        Ok(())
    }
}

pub type MessageCallback = Arc<dyn Fn(&MessagePayload) -> ListenerResult + Send + Sync + 'static>;
pub type TokenCallback = Arc<dyn Fn(&str) -> ListenerResult + Send + Sync + 'static>;

/// Closure-backed [`MessagingListener`].
///
/// ```
/// use messaging_lifecycle::messaging::FnListener;
///
/// let listener = FnListener::new()
///     .with_token(|token| {
///         println!("new push token: {token}");
///         Ok(())
///     });
/// # let _ = listener;
/// ```
#[derive(Clone, Default)]
pub struct FnListener {
    message: Option<MessageCallback>,
    token: Option<TokenCallback>,
}

impl FnListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message<F>(mut self, callback: F) -> Self
    where
        F: Fn(&MessagePayload) -> ListenerResult + Send + Sync + 'static,
    {
        self.message = Some(Arc::new(callback));
        self
    }

    pub fn with_token<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) -> ListenerResult + Send + Sync + 'static,
    {
        self.token = Some(Arc::new(callback));
        self
    }

    pub fn into_arc(self) -> Arc<dyn MessagingListener> {
        Arc::new(self)
    }
}

impl fmt::Debug for FnListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnListener")
            .field("message", &self.message.is_some())
            .field("token", &self.token.is_some())
            .finish()
    }
}

impl MessagingListener for FnListener {
    fn on_message_received(&self, payload: &MessagePayload) -> ListenerResult {
        match &self.message {
            Some(callback) => callback(payload),
            None => Ok(()),
        }
    }

    fn on_token_available(&self, token: &str) -> ListenerResult {
        match &self.token {
            Some(callback) => callback(token),
            None => Ok(()),
        }
    }
}

/// Outcome of a single registration attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The provider returned the token listeners already know about.
    Unchanged,
    /// A new token was delivered to listeners and persisted.
    Updated(String),
    /// The attempt failed while in the foreground; a retry is armed.
    RetryScheduled,
    /// The attempt failed while in the background; nothing further happens.
    Dropped,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_deserializes_without_data() {
        let payload: MessagePayload = serde_json::from_value(json!({
            "notification": {"title": "Hi", "body": null, "image": null, "icon": null},
            "from": "sender",
            "collapse_key": null,
            "message_id": "m-1"
        }))
        .unwrap();
        assert!(payload.data.is_empty());
        assert_eq!(payload.message_id.as_deref(), Some("m-1"));
        assert_eq!(
            payload.notification.and_then(|n| n.title).as_deref(),
            Some("Hi")
        );
    }

    #[test]
    fn fn_listener_defaults_to_ok() {
        let listener = FnListener::new();
        assert!(listener.on_token_available("t").is_ok());
        assert!(listener
            .on_message_received(&MessagePayload::from_data([("k", "v")]))
            .is_ok());
    }
}
