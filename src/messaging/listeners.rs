use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::messaging::error::{listener_failed, ListenerResult, MessagingError};
use crate::messaging::types::{MessagePayload, MessagingListener};

type ListenerEntry = Arc<dyn MessagingListener>;

/// Insertion-ordered set of listeners. Duplicates are allowed; removal
/// drops the first entry pointing at the same allocation.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: Mutex<Vec<ListenerEntry>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<ListenerEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, listener: ListenerEntry) {
        self.entries().push(listener);
    }

    pub fn remove(&self, listener: &ListenerEntry) -> bool {
        let mut entries = self.entries();
        match entries
            .iter()
            .position(|entry| Arc::ptr_eq(entry, listener))
        {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn snapshot(&self) -> Vec<ListenerEntry> {
        self.entries().clone()
    }

    /// Delivers `payload` to every listener in order and returns the
    /// failures that were isolated along the way.
    pub fn notify_message(&self, payload: &MessagePayload) -> Vec<MessagingError> {
        self.notify_each("on_message_received", |listener| {
            listener.on_message_received(payload)
        })
    }

    pub fn notify_token(&self, token: &str) -> Vec<MessagingError> {
        self.notify_each("on_token_available", |listener| {
            listener.on_token_available(token)
        })
    }

    fn notify_each<F>(&self, callback: &str, invoke: F) -> Vec<MessagingError>
    where
        F: Fn(&dyn MessagingListener) -> ListenerResult,
    {
        self.snapshot()
            .iter()
            .enumerate()
            .filter_map(|(index, listener)| {
                match catch_unwind(AssertUnwindSafe(|| invoke(listener.as_ref()))) {
                    Ok(Ok(())) => None,
                    Ok(Err(err)) => Some(listener_failed(format!(
                        "Listener #{index} failed in {callback}: {err}"
                    ))),
                    Err(panic) => Some(listener_failed(format!(
                        "Listener #{index} panicked in {callback}: {}",
                        panic_message(panic.as_ref())
                    ))),
                }
            })
            .collect()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::types::FnListener;

    fn recording(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> ListenerEntry {
        let log = Arc::clone(log);
        FnListener::new()
            .with_token(move |token| {
                log.lock().unwrap().push(format!("{name}:{token}"));
                Ok(())
            })
            .into_arc()
    }

    #[test]
    fn notifies_in_insertion_order_with_duplicates() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        let a = recording(&log, "a");
        registry.add(Arc::clone(&a));
        registry.add(recording(&log, "b"));
        registry.add(Arc::clone(&a));

        assert!(registry.notify_token("T1").is_empty());
        assert_eq!(*log.lock().unwrap(), ["a:T1", "b:T1", "a:T1"]);
    }

    #[test]
    fn remove_drops_one_matching_entry() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        let a = recording(&log, "a");
        registry.add(Arc::clone(&a));
        registry.add(Arc::clone(&a));

        assert!(registry.remove(&a));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(&a));
        assert!(registry.is_empty());
        assert!(!registry.remove(&a));
    }

    #[test]
    fn failures_and_panics_are_isolated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        registry.add(
            FnListener::new()
                .with_message(|_| Err("bad payload".into()))
                .into_arc(),
        );
        registry.add(
            FnListener::new()
                .with_message(|_| panic!("listener exploded"))
                .into_arc(),
        );
        let sink = Arc::clone(&log);
        registry.add(
            FnListener::new()
                .with_message(move |payload| {
                    sink.lock()
                        .unwrap()
                        .push(payload.message_id.clone().unwrap_or_default());
                    Ok(())
                })
                .into_arc(),
        );

        let errors = registry.notify_message(&MessagePayload::default().with_message_id("m-1"));
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message().contains("bad payload"));
        assert!(errors[1].message().contains("listener exploded"));
        assert_eq!(*log.lock().unwrap(), ["m-1"]);
    }
}
