use std::time::Duration;

use crate::logger::LogLevel;
use crate::messaging::constants::{
    DEFAULT_RETRY_DELAY_SECS, LOG_LEVEL_ENV, MIN_RETRY_DELAY_SECS, RETRY_DELAY_ENV,
};

/// Configuration applied by [`TokenRegistrationManager::initialize`].
///
/// [`TokenRegistrationManager::initialize`]: crate::messaging::TokenRegistrationManager::initialize
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessagingOptions {
    pub retry_delay_secs: u64,
    pub log_level: LogLevel,
}

impl Default for MessagingOptions {
    fn default() -> Self {
        Self {
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            log_level: LogLevel::Info,
        }
    }
}

impl MessagingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry_delay_secs(mut self, secs: u64) -> Self {
        self.retry_delay_secs = secs;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Reads `PUSH_RETRY_DELAY_SECS` and `PUSH_LOG_LEVEL`; unset or
    /// unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(secs) = std::env::var(RETRY_DELAY_ENV)
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
        {
            options.retry_delay_secs = secs;
        }
        if let Ok(raw) = std::env::var(LOG_LEVEL_ENV) {
            options.log_level = LogLevel::parse_or_default(&raw);
        }
        options
    }

    /// Retry delay with the floor applied: anything under the minimum falls
    /// back to the default.
    pub fn effective_retry_delay(&self) -> Duration {
        let secs = if self.retry_delay_secs < MIN_RETRY_DELAY_SECS {
            DEFAULT_RETRY_DELAY_SECS
        } else {
            self.retry_delay_secs
        };
        Duration::from_secs(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_minimum_delay_falls_back_to_default() {
        let options = MessagingOptions::new().with_retry_delay_secs(2);
        assert_eq!(options.effective_retry_delay(), Duration::from_secs(30));
    }

    #[test]
    fn minimum_delay_is_accepted() {
        let options = MessagingOptions::new().with_retry_delay_secs(MIN_RETRY_DELAY_SECS);
        assert_eq!(options.effective_retry_delay(), Duration::from_secs(5));
    }
}
