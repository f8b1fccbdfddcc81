//! At-most-once admission of notifications within a time window.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Remembers admitted run ids for `window` after they were first seen.
#[derive(Debug)]
pub struct DedupWindow {
    window: Duration,
    seen: HashMap<String, Instant>,
}

impl DedupWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: HashMap::new(),
        }
    }

    /// Returns true the first time `run_id` is offered within the window.
    ///
    /// Expired entries are pruned on every call, so memory stays bounded by
    /// the number of distinct ids seen in one window.
    pub fn admit(&mut self, run_id: &str) -> bool {
        let now = Instant::now();
        let window = self.window;
        self.seen.retain(|_, first_seen| now.duration_since(*first_seen) < window);

        if self.seen.contains_key(run_id) {
            return false;
        }
        self.seen.insert(run_id.to_string(), now);
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_rejected_within_window() {
        let mut window = DedupWindow::new(Duration::from_secs(600));
        assert!(window.admit("a-123"));
        assert!(!window.admit("a-123"));
        assert!(window.admit("b-456"));
        assert_eq!(window.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_admitted_again_after_window() {
        let mut window = DedupWindow::new(Duration::from_secs(600));
        assert!(window.admit("a-123"));

        tokio::time::advance(Duration::from_secs(599)).await;
        assert!(!window.admit("a-123"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(window.admit("a-123"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_pruned() {
        let mut window = DedupWindow::new(Duration::from_secs(10));
        window.admit("a");
        window.admit("b");

        tokio::time::advance(Duration::from_secs(11)).await;
        window.admit("c");
        assert_eq!(window.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_window_never_deduplicates() {
        let mut window = DedupWindow::new(Duration::ZERO);
        assert!(window.admit("a"));
        assert!(window.admit("a"));
        assert!(!window.is_empty());
    }
}
