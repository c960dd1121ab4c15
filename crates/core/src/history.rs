//! Bounded single-step undo history
//!
//! Undo is snapshot-based: the session pushes a deep copy of the whole
//! annotation store immediately before each mutating action, and undo pops
//! the most recent copy back. The stack is capped at 20 entries; pushing
//! past the cap evicts the oldest snapshot. There is deliberately no redo
//! stack: a second undo keeps walking backwards, and redone work is gone.

use crate::store::AnnotationStore;

/// Maximum number of retained snapshots
pub const MAX_HISTORY_DEPTH: usize = 20;

#[derive(Debug, Default)]
pub struct HistoryManager {
    snapshots: Vec<AnnotationStore>,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot, evicting the oldest once the cap is exceeded
    pub fn push(&mut self, snapshot: AnnotationStore) {
        self.snapshots.push(snapshot);
        if self.snapshots.len() > MAX_HISTORY_DEPTH {
            self.snapshots.remove(0);
        }
    }

    /// Pop and return the most recent snapshot, or `None` when there is
    /// nothing to undo
    pub fn undo(&mut self) -> Option<AnnotationStore> {
        self.snapshots.pop()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Drop all snapshots; used when a different document is opened
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Annotation, AnnotationShape, Color};
    use crate::coords::ScreenPoint;

    fn store_with(n: usize) -> AnnotationStore {
        let mut store = AnnotationStore::new();
        for i in 0..n {
            store.insert(
                Annotation::new(
                    1,
                    ScreenPoint::new(i as f32, i as f32),
                    100.0,
                    Color::BLACK,
                    AnnotationShape::Check { size: 12.0 },
                )
                .unwrap(),
            );
        }
        store
    }

    #[test]
    fn test_undo_returns_snapshots_in_reverse() {
        let mut history = HistoryManager::new();
        history.push(store_with(0));
        history.push(store_with(1));
        history.push(store_with(2));

        assert_eq!(history.undo().unwrap().len(), 2);
        assert_eq!(history.undo().unwrap().len(), 1);
        assert_eq!(history.undo().unwrap().len(), 0);
        assert!(history.undo().is_none());
    }

    #[test]
    fn test_depth_is_bounded_and_evicts_oldest() {
        let mut history = HistoryManager::new();
        for i in 0..25 {
            history.push(store_with(i));
        }
        assert_eq!(history.len(), MAX_HISTORY_DEPTH);

        // The newest snapshot survives; the five oldest were evicted
        assert_eq!(history.undo().unwrap().len(), 24);
        let mut oldest = 0;
        while let Some(snapshot) = history.undo() {
            oldest = snapshot.len();
        }
        assert_eq!(oldest, 5);
    }

    #[test]
    fn test_clear_discards_everything() {
        let mut history = HistoryManager::new();
        history.push(store_with(1));
        history.clear();
        assert!(history.is_empty());
        assert!(history.undo().is_none());
    }
}
