use std::sync::atomic::{AtomicUsize, Ordering};

/// Edge reported by [`LifecycleTracker`] after a start or stop event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The counter went from 0 to 1.
    EnteredForeground,
    /// The counter went from 1 to 0.
    EnteredBackground,
    Unchanged,
}

/// Counts visible foreground observers (screens, windows, ...).
///
/// Only the 0↔1 boundaries are reported as transitions. A stop event while
/// already at zero is ignored rather than wrapping around.
#[derive(Debug, Default)]
pub struct LifecycleTracker {
    active: AtomicUsize,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) -> Transition {
        match self.active.fetch_add(1, Ordering::SeqCst) {
            0 => Transition::EnteredForeground,
            _ => Transition::Unchanged,
        }
    }

    pub fn exit(&self) -> Transition {
        let previous = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                count.checked_sub(1)
            });
        match previous {
            Ok(1) => Transition::EnteredBackground,
            _ => Transition::Unchanged,
        }
    }

    pub fn is_foreground(&self) -> bool {
        self.active.load(Ordering::SeqCst) > 0
    }

    pub fn count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn only_zero_one_edges_are_reported() {
        let tracker = LifecycleTracker::new();
        assert_eq!(tracker.enter(), Transition::EnteredForeground);
        assert_eq!(tracker.enter(), Transition::Unchanged);
        assert_eq!(tracker.enter(), Transition::Unchanged);
        assert_eq!(tracker.count(), 3);

        assert_eq!(tracker.exit(), Transition::Unchanged);
        assert_eq!(tracker.exit(), Transition::Unchanged);
        assert!(tracker.is_foreground());
        assert_eq!(tracker.exit(), Transition::EnteredBackground);
        assert!(!tracker.is_foreground());
    }

    #[test]
    fn exit_at_zero_is_ignored() {
        let tracker = LifecycleTracker::new();
        assert_eq!(tracker.exit(), Transition::Unchanged);
        assert_eq!(tracker.count(), 0);
        assert_eq!(tracker.enter(), Transition::EnteredForeground);
    }

    #[test]
    fn concurrent_observers_produce_one_edge_each_way() {
        let tracker = Arc::new(LifecycleTracker::new());
        let entered: usize = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || tracker.enter() == Transition::EnteredForeground)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| handle.join().unwrap() as usize)
            .sum();
        assert_eq!(entered, 1);

        let left: usize = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || tracker.exit() == Transition::EnteredBackground)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| handle.join().unwrap() as usize)
            .sum();
        assert_eq!(left, 1);
        assert_eq!(tracker.count(), 0);
    }
}
