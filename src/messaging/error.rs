use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessagingErrorCode {
    TokenFetchFailed,
    TokenMissing,
    TopicSubscribeFailed,
    TopicUnsubscribeFailed,
    InvalidArgument,
    ListenerFailed,
    StorageFailed,
    Internal,
}

impl MessagingErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessagingErrorCode::TokenFetchFailed => "messaging/token-fetch-failed",
            MessagingErrorCode::TokenMissing => "messaging/token-missing",
            MessagingErrorCode::TopicSubscribeFailed => "messaging/topic-subscribe-failed",
            MessagingErrorCode::TopicUnsubscribeFailed => "messaging/topic-unsubscribe-failed",
            MessagingErrorCode::InvalidArgument => "messaging/invalid-argument",
            MessagingErrorCode::ListenerFailed => "messaging/listener-failed",
            MessagingErrorCode::StorageFailed => "messaging/storage-failed",
            MessagingErrorCode::Internal => "messaging/internal",
        }
    }

    /// Provider-side failures are recovered by retrying; everything else is
    /// only ever logged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MessagingErrorCode::TokenFetchFailed | MessagingErrorCode::TokenMissing
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessagingError {
    pub code: MessagingErrorCode,
    message: String,
}

impl MessagingError {
    pub fn new(code: MessagingErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for MessagingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for MessagingError {}

pub type MessagingResult<T> = Result<T, MessagingError>;

/// Result returned by host-supplied listener callbacks.
pub type ListenerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub fn token_fetch_failed(message: impl Into<String>) -> MessagingError {
    MessagingError::new(MessagingErrorCode::TokenFetchFailed, message)
}

pub fn token_missing() -> MessagingError {
    MessagingError::new(
        MessagingErrorCode::TokenMissing,
        "Push provider completed without returning a token.",
    )
}

pub fn topic_subscribe_failed(topic: &str, message: impl Display) -> MessagingError {
    MessagingError::new(
        MessagingErrorCode::TopicSubscribeFailed,
        format!("Failed to subscribe to topic '{topic}': {message}"),
    )
}

pub fn topic_unsubscribe_failed(topic: &str, message: impl Display) -> MessagingError {
    MessagingError::new(
        MessagingErrorCode::TopicUnsubscribeFailed,
        format!("Failed to unsubscribe from topic '{topic}': {message}"),
    )
}

pub fn invalid_argument(message: impl Into<String>) -> MessagingError {
    MessagingError::new(MessagingErrorCode::InvalidArgument, message)
}

pub fn listener_failed(message: impl Into<String>) -> MessagingError {
    MessagingError::new(MessagingErrorCode::ListenerFailed, message)
}

pub fn storage_failed(message: impl Into<String>) -> MessagingError {
    MessagingError::new(MessagingErrorCode::StorageFailed, message)
}

pub fn internal_error(message: impl Into<String>) -> MessagingError {
    MessagingError::new(MessagingErrorCode::Internal, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code() {
        let err = topic_subscribe_failed("news", "offline");
        assert_eq!(
            err.to_string(),
            "Failed to subscribe to topic 'news': offline (messaging/topic-subscribe-failed)"
        );
    }

    #[test]
    fn only_provider_failures_are_retryable() {
        assert!(token_fetch_failed("boom").code.is_retryable());
        assert!(token_missing().code.is_retryable());
        assert!(!storage_failed("disk").code.is_retryable());
        assert!(!internal_error("bug").code.is_retryable());
    }
}
