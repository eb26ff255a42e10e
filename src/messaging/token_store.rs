use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use percent_encoding::{percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::messaging::constants::TOKEN_CACHE_DIR_ENV;
use crate::messaging::error::{storage_failed, MessagingResult};

/// Opaque storage for the last push token the manager handed to listeners.
pub trait TokenStore: Send + Sync {
    /// Returns the cached token, or an empty string when none is stored.
    fn read_token(&self) -> MessagingResult<String>;

    fn save_token(&self, token: &str) -> MessagingResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<String>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(token.into()),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn read_token(&self) -> MessagingResult<String> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save_token(&self, token: &str) -> MessagingResult<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = token.to_owned();
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenRecord {
    pub token: String,
    pub saved_at: DateTime<Utc>,
}

/// Stores the token as a small JSON document under `base_dir`.
#[derive(Clone, Debug)]
pub struct FileTokenStore {
    base_dir: Arc<PathBuf>,
    key: String,
}

impl FileTokenStore {
    pub fn new(base_dir: PathBuf, key: impl Into<String>) -> MessagingResult<Self> {
        fs::create_dir_all(&base_dir).map_err(|err| {
            storage_failed(format!(
                "Failed to create token cache directory '{}': {}",
                base_dir.display(),
                err
            ))
        })?;
        Ok(Self {
            base_dir: Arc::new(base_dir),
            key: key.into(),
        })
    }

    /// Uses `PUSH_TOKEN_CACHE_DIR` when set, `./.push/tokens` otherwise.
    pub fn from_env(key: impl Into<String>) -> MessagingResult<Self> {
        if let Ok(dir) = std::env::var(TOKEN_CACHE_DIR_ENV) {
            return Self::new(PathBuf::from(dir), key);
        }
        let dir = std::env::current_dir()
            .map_err(|err| storage_failed(format!("Failed to obtain working directory: {err}")))?
            .join(".push/tokens");
        Self::new(dir, key)
    }

    pub fn path(&self) -> PathBuf {
        let encoded = percent_encode(self.key.as_bytes(), NON_ALPHANUMERIC).to_string();
        self.base_dir.join(format!("{encoded}.json"))
    }

    pub fn read_record(&self) -> MessagingResult<Option<TokenRecord>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|err| {
            storage_failed(format!(
                "Failed to read token cache '{}': {}",
                path.display(),
                err
            ))
        })?;
        let record = serde_json::from_slice(&bytes).map_err(|err| {
            storage_failed(format!(
                "Failed to parse token cache '{}': {}",
                path.display(),
                err
            ))
        })?;
        Ok(Some(record))
    }

    pub fn clear(&self) -> MessagingResult<()> {
        let path = self.path();
        if path.exists() {
            fs::remove_file(&path).map_err(|err| {
                storage_failed(format!(
                    "Failed to delete token cache '{}': {}",
                    path.display(),
                    err
                ))
            })?;
        }
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn read_token(&self) -> MessagingResult<String> {
        Ok(self
            .read_record()?
            .map(|record| record.token)
            .unwrap_or_default())
    }

    fn save_token(&self, token: &str) -> MessagingResult<()> {
        let path = self.path();
        let record = TokenRecord {
            token: token.to_owned(),
            saved_at: Utc::now(),
        };
        let bytes = serde_json::to_vec(&record).map_err(|err| {
            storage_failed(format!(
                "Failed to serialize token cache '{}': {}",
                path.display(),
                err
            ))
        })?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, bytes)
            .and_then(|()| fs::rename(&staging, &path))
            .map_err(|err| {
                storage_failed(format!(
                    "Failed to write token cache '{}': {}",
                    path.display(),
                    err
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_dir() -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        std::env::temp_dir().join(format!(
            "push-token-store-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ))
    }

    #[test]
    fn memory_store_starts_empty() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.read_token().unwrap(), "");
        store.save_token("T1").unwrap();
        assert_eq!(store.read_token().unwrap(), "T1");
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = temp_dir();
        let store = FileTokenStore::new(dir.clone(), "app/main").unwrap();
        assert_eq!(store.read_token().unwrap(), "");

        store.save_token("T1").unwrap();
        let reopened = FileTokenStore::new(dir.clone(), "app/main").unwrap();
        assert_eq!(reopened.read_token().unwrap(), "T1");
        assert!(reopened.path().ends_with("app%2Fmain.json"));

        assert!(!reopened.path().with_extension("json.tmp").exists());
        reopened.clear().unwrap();
        assert_eq!(store.read_token().unwrap(), "");
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = temp_dir();
        let store = FileTokenStore::new(dir.clone(), "broken").unwrap();
        fs::write(store.path(), b"not json").unwrap();

        let err = store.read_token().unwrap_err();
        assert_eq!(err.code_str(), "messaging/storage-failed");
        fs::remove_dir_all(dir).ok();
    }
}
