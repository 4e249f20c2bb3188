use crate::runtime::types::{GcEvent, Snapshot};
use std::collections::VecDeque;

/// FIFO sequence that drops its oldest entries once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct Bounded<T: Clone> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> Bounded<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(item);
    }

    pub fn latest(&self) -> Option<&T> {
        self.buffer.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.buffer.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Snapshots and reconstructed events retained by a sampler.
#[derive(Debug, Clone)]
pub struct History {
    pub snapshots: Bounded<Snapshot>,
    pub events: Bounded<GcEvent>,
}

impl History {
    pub fn new(max_samples: usize) -> Self {
        Self {
            snapshots: Bounded::new(max_samples),
            events: Bounded::new(max_samples),
        }
    }

    pub fn record(&mut self, snapshot: Snapshot, events: &[GcEvent]) {
        self.snapshots.push(snapshot);
        for event in events {
            self.events.push(event.clone());
        }
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_keeps_insertion_order() {
        let mut buffer = Bounded::new(3);
        assert!(buffer.is_empty());

        buffer.push(1);
        buffer.push(2);
        buffer.push(3);

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.to_vec(), vec![1, 2, 3]);
        assert_eq!(buffer.latest(), Some(&3));
    }

    #[test]
    fn test_bounded_evicts_oldest() {
        let mut buffer = Bounded::new(3);
        for i in 1..=6 {
            buffer.push(i);
        }

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![4, 5, 6]);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut buffer = Bounded::new(0);
        buffer.push("first".to_string());
        buffer.push("second".to_string());

        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.to_vec(), vec!["second".to_string()]);
    }

    #[test]
    fn test_clear_empties_buffer() {
        let mut buffer = Bounded::new(2);
        buffer.push(1);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.latest(), None);
    }
}
