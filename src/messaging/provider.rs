use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::messaging::constants::LOCAL_TOKEN_LEN;
use crate::messaging::error::MessagingResult;

/// Vendor push service the manager registers against.
///
/// Implementations wrap whatever SDK issues device tokens. `fetch_token`
/// may resolve to `Ok(None)` or an empty string when the vendor completed
/// without a token; the manager treats both like a failure.
#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn fetch_token(&self) -> MessagingResult<Option<String>>;

    async fn subscribe_to_topic(&self, topic: &str) -> MessagingResult<()>;

    async fn unsubscribe_from_topic(&self, topic: &str) -> MessagingResult<()>;
}

/// Provider that mints its own tokens instead of talking to a vendor.
///
/// Handy for desktop builds and demos: the first `fetch_token` call issues a
/// random alphanumeric token that stays stable until [`rotate_token`] is
/// called.
///
/// [`rotate_token`]: LocalPushProvider::rotate_token
#[derive(Debug, Default)]
pub struct LocalPushProvider {
    token: Mutex<Option<String>>,
    topics: Mutex<BTreeSet<String>>,
}

impl LocalPushProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards the current token; the next fetch issues a fresh one.
    pub fn rotate_token(&self) {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn topics(&self) -> Vec<String> {
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

fn generate_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(LOCAL_TOKEN_LEN)
        .collect()
}

#[async_trait]
impl PushProvider for LocalPushProvider {
    async fn fetch_token(&self) -> MessagingResult<Option<String>> {
        let mut guard = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        let token = guard.get_or_insert_with(generate_token).clone();
        Ok(Some(token))
    }

    async fn subscribe_to_topic(&self, topic: &str) -> MessagingResult<()> {
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(topic.to_owned());
        Ok(())
    }

    async fn unsubscribe_from_topic(&self, topic: &str) -> MessagingResult<()> {
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(topic);
        Ok(())
    }
}
