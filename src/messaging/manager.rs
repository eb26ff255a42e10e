use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures::future::join_all;
use once_cell::sync::OnceCell;
use serde_json::json;

use crate::logger::LogLevel;
use crate::messaging::constants::{DEFAULT_RETRY_DELAY_SECS, MIN_RETRY_DELAY_SECS};
use crate::messaging::error::{
    internal_error, token_missing, topic_subscribe_failed, topic_unsubscribe_failed,
    MessagingError, MessagingResult,
};
use crate::messaging::lifecycle::{LifecycleTracker, Transition};
use crate::messaging::listeners::ListenerRegistry;
use crate::messaging::logger::LOGGER;
use crate::messaging::options::MessagingOptions;
use crate::messaging::provider::PushProvider;
use crate::messaging::scheduler::RetryScheduler;
use crate::messaging::token_store::TokenStore;
use crate::messaging::topics::normalize_topic;
use crate::messaging::types::{MessagePayload, MessagingListener, RegistrationOutcome};
use crate::platform::runtime::spawn_detached;

/// Keeps a push token registered for the lifetime of the host process.
///
/// The manager is cheap to clone; clones share the same state. Every public
/// method is callable from any thread, never blocks on the provider, and
/// never returns an error: failures are logged through the messaging logger
/// and otherwise swallowed.
///
/// Registration is attempted when the host enters the foreground (first
/// visible screen) and, if no token was ever cached, once more when it goes
/// to the background. Failed attempts are retried after the configured delay
/// for as long as the host stays in the foreground.
#[derive(Clone)]
pub struct TokenRegistrationManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    provider: Arc<dyn PushProvider>,
    store: Arc<dyn TokenStore>,
    listeners: ListenerRegistry,
    lifecycle: LifecycleTracker,
    scheduler: RetryScheduler,
    options: OnceCell<MessagingOptions>,
    // Last token handed to listeners. The lock serialises token
    // compare-notify-persist and message fan-out.
    dispatch_lock: Mutex<Option<String>>,
    in_flight: AtomicUsize,
}

#[derive(Clone, Copy, Debug)]
enum TopicAction {
    Subscribe,
    Unsubscribe,
}

impl TopicAction {
    fn operation(self) -> &'static str {
        match self {
            TopicAction::Subscribe => "subscribe_to_topics",
            TopicAction::Unsubscribe => "unsubscribe_from_topics",
        }
    }

    async fn apply(self, provider: &dyn PushProvider, topic: &str) -> MessagingResult<()> {
        match self {
            TopicAction::Subscribe => provider
                .subscribe_to_topic(topic)
                .await
                .map_err(|err| topic_subscribe_failed(topic, err)),
            TopicAction::Unsubscribe => provider
                .unsubscribe_from_topic(topic)
                .await
                .map_err(|err| topic_unsubscribe_failed(topic, err)),
        }
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Logs a failed entry point and discards the error.
fn report<T>(operation: &str, result: MessagingResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            let level = if err.code.is_retryable() {
                LogLevel::Info
            } else {
                LogLevel::Error
            };
            LOGGER.log_with(
                level,
                format!("{operation} failed: {err}"),
                json!({ "code": err.code_str() }),
            );
            None
        }
    }
}

fn require_token(token: Option<String>) -> MessagingResult<String> {
    match token {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(token_missing()),
    }
}

impl TokenRegistrationManager {
    pub fn new(provider: Arc<dyn PushProvider>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                provider,
                store,
                listeners: ListenerRegistry::new(),
                lifecycle: LifecycleTracker::new(),
                scheduler: RetryScheduler::new(),
                options: OnceCell::new(),
                dispatch_lock: Mutex::new(None),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Applies `options`. Only the first call has any effect.
    ///
    /// A retry delay under five seconds is replaced by the thirty second
    /// default.
    pub fn initialize(&self, options: MessagingOptions) {
        match self.inner.options.set(options) {
            Ok(()) => {
                LOGGER.set_log_level(options.log_level);
                if options.retry_delay_secs < MIN_RETRY_DELAY_SECS {
                    LOGGER.info(format!(
                        "Retry delay of {}s is below the {}s minimum; using {}s",
                        options.retry_delay_secs, MIN_RETRY_DELAY_SECS, DEFAULT_RETRY_DELAY_SECS
                    ));
                }
                LOGGER.verbose(format!(
                    "Messaging initialized with a {}s retry delay",
                    options.effective_retry_delay().as_secs()
                ));
            }
            Err(_) => LOGGER.info("Messaging already initialized; ignoring new options"),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.options.get().is_some()
    }

    pub fn retry_delay(&self) -> Duration {
        self.inner
            .options
            .get()
            .map(MessagingOptions::effective_retry_delay)
            .unwrap_or(Duration::from_secs(DEFAULT_RETRY_DELAY_SECS))
    }

    /// Records a visible screen. Registers on the first one only.
    pub fn on_foreground_enter(&self) {
        if self.inner.lifecycle.enter() == Transition::EnteredForeground {
            LOGGER.verbose("Entered foreground; requesting push token");
            self.attempt_registration();
        }
    }

    /// Records a screen going away. When the last one leaves, pending
    /// retries are cancelled and, if no token was ever cached, one last
    /// registration is attempted.
    pub fn on_foreground_exit(&self) {
        if self.inner.lifecycle.exit() != Transition::EnteredBackground {
            return;
        }
        if self.inner.scheduler.cancel() {
            LOGGER.verbose("Entered background; cancelled pending token retry");
        }
        let cached = report("on_foreground_exit", self.inner.store.read_token());
        if cached.map_or(true, |token| token.is_empty()) {
            LOGGER.verbose("Entered background without a cached token; registering once");
            self.attempt_registration();
        }
    }

    /// Requests the current token from the provider in the background.
    pub fn attempt_registration(&self) {
        let manager = self.clone();
        let spawned = spawn_detached(async move {
            manager.run_registration().await;
        });
        if spawned.is_none() {
            report::<()>(
                "attempt_registration",
                Err(internal_error("No runtime available to run the registration")),
            );
        }
    }

    async fn run_registration(&self) {
        if let Some(outcome) = report("attempt_registration", self.register().await) {
            LOGGER.verbose(format!("Registration finished: {outcome:?}"));
        }
    }

    /// One provider round-trip. The foreground check happens when the
    /// provider completes, not when the request is issued.
    pub(crate) async fn register(&self) -> MessagingResult<RegistrationOutcome> {
        let _in_flight = InFlightGuard::enter(&self.inner.in_flight);
        let fetched = self
            .inner
            .provider
            .fetch_token()
            .await
            .and_then(require_token);
        match fetched {
            Ok(token) => self.apply_token(token),
            Err(err) => self.handle_failure(err),
        }
    }

    /// Compares `token` with the stored one, tells listeners when it differs
    /// and persists it.
    ///
    /// An unreadable store counts as empty, so the save below overwrites it.
    /// A token already handed to listeners is not announced again when an
    /// earlier save failed; only the save is repeated.
    fn apply_token(&self, token: String) -> MessagingResult<RegistrationOutcome> {
        let mut announced = self.dispatch_guard();
        let cached = report("apply_token", self.inner.store.read_token()).unwrap_or_default();
        if cached == token {
            *announced = Some(token);
            return Ok(RegistrationOutcome::Unchanged);
        }
        let fresh = announced.as_deref() != Some(token.as_str());
        if fresh {
            for err in self.inner.listeners.notify_token(&token) {
                report::<()>("on_token_available", Err(err));
            }
            *announced = Some(token.clone());
        }
        self.inner.store.save_token(&token)?;
        if !fresh {
            LOGGER.info("Persisted previously announced push token");
            return Ok(RegistrationOutcome::Unchanged);
        }
        LOGGER.info("Push token updated");
        Ok(RegistrationOutcome::Updated(token))
    }

    fn handle_failure(&self, err: MessagingError) -> MessagingResult<RegistrationOutcome> {
        if !self.inner.lifecycle.is_foreground() {
            LOGGER.info(format!("Token request failed in background, not retrying: {err}"));
            return Ok(RegistrationOutcome::Dropped);
        }
        let delay = self.retry_delay();
        LOGGER.log_with(
            LogLevel::Info,
            format!("Token request failed, retrying: {err}"),
            json!({ "delay_secs": delay.as_secs(), "code": err.code_str() }),
        );
        let weak: Weak<ManagerInner> = Arc::downgrade(&self.inner);
        let armed = self.inner.scheduler.schedule(delay, async move {
            if let Some(inner) = weak.upgrade() {
                TokenRegistrationManager { inner }.run_registration().await;
            }
        });
        if armed {
            Ok(RegistrationOutcome::RetryScheduled)
        } else {
            Err(internal_error("No runtime available to schedule a retry"))
        }
    }

    /// Delivers `payload` to every listener, in registration order, on the
    /// calling thread.
    ///
    /// Listeners must not call `dispatch_message` from inside their own
    /// callbacks.
    pub fn dispatch_message(&self, payload: &MessagePayload) {
        let _guard = self.dispatch_guard();
        for err in self.inner.listeners.notify_message(payload) {
            report::<()>("dispatch_message", Err(err));
        }
    }

    /// Adds `listener`; `None` is ignored.
    pub fn add_listener<L>(&self, listener: L)
    where
        L: Into<Option<Arc<dyn MessagingListener>>>,
    {
        if let Some(listener) = listener.into() {
            self.inner.listeners.add(listener);
        }
    }

    /// Removes one registration of `listener`; unknown listeners and `None`
    /// are ignored.
    pub fn remove_listener<L>(&self, listener: L)
    where
        L: Into<Option<Arc<dyn MessagingListener>>>,
    {
        if let Some(listener) = listener.into() {
            self.inner.listeners.remove(&listener);
        }
    }

    pub fn subscribe_to_topics<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.update_topics(TopicAction::Subscribe, names);
    }

    pub fn unsubscribe_from_topics<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.update_topics(TopicAction::Unsubscribe, names);
    }

    fn update_topics<I, S>(&self, action: TopicAction, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let topics: Vec<String> = names
            .into_iter()
            .filter_map(|name| report(action.operation(), normalize_topic(name.as_ref())))
            .collect();
        if topics.is_empty() {
            return;
        }
        let provider = Arc::clone(&self.inner.provider);
        let spawned = spawn_detached(async move {
            for result in apply_topics(provider.as_ref(), action, &topics).await {
                report(action.operation(), result);
            }
        });
        if spawned.is_none() {
            report::<()>(
                action.operation(),
                Err(internal_error("No runtime available to update topics")),
            );
        }
    }

    pub fn is_foreground(&self) -> bool {
        self.inner.lifecycle.is_foreground()
    }

    pub fn foreground_count(&self) -> usize {
        self.inner.lifecycle.count()
    }

    pub fn has_pending_retry(&self) -> bool {
        self.inner.scheduler.is_pending()
    }

    pub fn is_registering(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst) > 0
    }

    /// The cached token, or `None` if nothing is cached or the store failed.
    pub fn cached_token(&self) -> Option<String> {
        report("cached_token", self.inner.store.read_token()).filter(|token| !token.is_empty())
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    fn dispatch_guard(&self) -> MutexGuard<'_, Option<String>> {
        self.inner
            .dispatch_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

async fn apply_topics(
    provider: &dyn PushProvider,
    action: TopicAction,
    topics: &[String],
) -> Vec<MessagingResult<()>> {
    join_all(topics.iter().map(|topic| action.apply(provider, topic))).await
}

impl std::fmt::Debug for TokenRegistrationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRegistrationManager")
            .field("foreground_count", &self.foreground_count())
            .field("pending_retry", &self.has_pending_retry())
            .field("listeners", &self.listener_count())
            .field("retry_delay", &self.retry_delay())
            .finish()
    }
}
