//! Insertion Order Module
//!
//! Tracks the order in which keys were first stored, for iteration and eviction tie-breaks.

use std::collections::VecDeque;

use crate::cache::Digest;

// == Insertion Order ==
/// Keys in first-insertion order.
///
/// - Front = Oldest insertion
/// - Back = Newest insertion
///
/// Overwriting an existing key does not move it.
#[derive(Debug, Default)]
pub struct InsertionOrder {
    order: VecDeque<Digest>,
}

impl InsertionOrder {
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Insert ==
    /// Appends a key that is not yet tracked.
    pub fn insert(&mut self, key: Digest) {
        self.order.push_back(key);
    }

    // == Remove ==
    pub fn remove(&mut self, key: &Digest) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }

    // == Iterate ==
    /// Keys from oldest to newest insertion.
    pub fn iter(&self) -> impl Iterator<Item = &Digest> {
        self.order.iter()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
