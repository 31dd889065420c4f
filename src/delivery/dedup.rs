//! Bounded memory of recently delivered notification IDs.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::identifiers::NotificationId;

// ============================================================================
// Constants
// ============================================================================

/// Default number of IDs remembered.
///
/// Comfortably spans the redelivery burst of one reconnect cycle.
pub const DEFAULT_DEDUP_WINDOW: usize = 256;

/// Largest window a channel accepts.
pub const MAX_DEDUP_WINDOW: usize = 1 << 20;

// ============================================================================
// DedupWindow
// ============================================================================

/// FIFO set of the last `capacity` IDs seen.
///
/// When full, the oldest ID is forgotten. A capacity of zero disables
/// de-duplication.
#[derive(Debug, Clone)]
pub struct DedupWindow {
    capacity: usize,
    seen: FxHashSet<NotificationId>,
    order: VecDeque<NotificationId>,
}

impl DedupWindow {
    /// Creates a window remembering up to `capacity` IDs.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: FxHashSet::default(),
            order: VecDeque::new(),
        }
    }

    /// Records `id`. Returns `false` if it is already in the window.
    pub fn insert(&mut self, id: &NotificationId) -> bool {
        if self.capacity == 0 {
            return true;
        }

        if self.seen.contains(id) {
            return false;
        }

        if self.order.len() == self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.seen.remove(&oldest);
        }

        self.seen.insert(id.clone());
        self.order.push_back(id.clone());
        true
    }

    /// Returns `true` if `id` is in the window.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &NotificationId) -> bool {
        self.seen.contains(id)
    }

    /// Number of IDs currently remembered.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no IDs are remembered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Maximum number of IDs remembered.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DedupWindow {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_WINDOW)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NotificationId {
        NotificationId::new(s)
    }

    #[test]
    fn test_rejects_repeat() {
        let mut window = DedupWindow::new(4);
        assert!(window.insert(&id("a")));
        assert!(!window.insert(&id("a")));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut window = DedupWindow::new(2);
        assert!(window.insert(&id("a")));
        assert!(window.insert(&id("b")));
        assert!(window.insert(&id("c")));

        assert!(!window.contains(&id("a")));
        assert!(window.contains(&id("b")));
        assert!(window.insert(&id("a")));
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_zero_capacity_disables() {
        let mut window = DedupWindow::new(0);
        assert!(window.insert(&id("a")));
        assert!(window.insert(&id("a")));
        assert!(window.is_empty());
    }

    #[test]
    fn test_huge_capacity_allocates_lazily() {
        let mut window = DedupWindow::new(usize::MAX);
        assert_eq!(window.capacity(), usize::MAX);
        assert!(window.insert(&id("a")));
        assert!(!window.insert(&id("a")));
        assert_eq!(window.len(), 1);
    }
}
