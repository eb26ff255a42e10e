//! # Messaging lifecycle module
//!
//! Keeps a push token registered with a Firebase Cloud Messaging style
//! provider for as long as the host process runs, and fans incoming messages
//! and token changes out to host listeners.
//!
//! ## Features
//!
//! - Register on the first foreground screen and retry failed requests at a fixed
//!   delay (30 s by default, never under 5 s) while the host stays visible.
//! - Cancel pending retries on backgrounding, registering one last time if no token
//!   was ever cached.
//! - Notify listeners only when the provider hands out a token different from the
//!   cached one, then persist it through a pluggable [`TokenStore`].
//! - Deliver incoming messages to every listener in order, isolating listener
//!   errors and panics.
//! - Fire-and-forget topic subscription with per-topic error isolation.
//!
//! The vendor SDK and the persistence layer are injected as [`PushProvider`] and
//! [`TokenStore`]. [`LocalPushProvider`], [`MemoryTokenStore`] and
//! [`FileTokenStore`] cover desktop hosts and tests.
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use messaging_lifecycle::messaging::{
//!     FnListener, LocalPushProvider, MemoryTokenStore, MessagingOptions,
//!     TokenRegistrationManager,
//! };
//!
//! let manager = TokenRegistrationManager::new(
//!     Arc::new(LocalPushProvider::new()),
//!     Arc::new(MemoryTokenStore::new()),
//! );
//! manager.initialize(MessagingOptions::from_env());
//!
//! manager.add_listener(
//!     FnListener::new()
//!         .with_token(|token| {
//!             println!("register {token} with the backend");
//!             Ok(())
//!         })
//!         .into_arc(),
//! );
//!
//! // Wire these to the host's screen lifecycle.
//! manager.on_foreground_enter();
//! manager.subscribe_to_topics(["news", "/topics/alerts"]);
//! manager.on_foreground_exit();
//! ```

mod constants;
pub mod error;
mod global;
mod lifecycle;
mod listeners;
mod logger;
mod manager;
mod options;
mod provider;
mod scheduler;
mod token_store;
mod topics;
mod types;

pub use constants::{DEFAULT_RETRY_DELAY_SECS, MIN_RETRY_DELAY_SECS};
pub use error::{ListenerResult, MessagingError, MessagingErrorCode, MessagingResult};
pub use global::{global, global_or_init, install_global};
pub use lifecycle::{LifecycleTracker, Transition};
pub use listeners::ListenerRegistry;
pub use manager::TokenRegistrationManager;
pub use options::MessagingOptions;
pub use provider::{LocalPushProvider, PushProvider};
pub use scheduler::RetryScheduler;
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenRecord, TokenStore};
pub use topics::normalize_topic;
pub use types::{
    FnListener, MessageCallback, MessagePayload, MessagingListener, NotificationPayload,
    RegistrationOutcome, TokenCallback,
};
