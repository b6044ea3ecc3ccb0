//! Insertion-ordered value set
//!
//! The values stored under one identifier. Iteration follows first
//! insertion; inserting a value that is already present is a no-op.
//! The order list and the membership index share one allocation per value.

use std::collections::HashSet;
use std::sync::Arc;

/// Duplicate-free list of values in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueSet {
    /// Values in the order they were first inserted
    order: Vec<Arc<str>>,

    /// Membership index over `order`
    members: HashSet<Arc<str>>,
}

impl ValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value; returns false if it was already present
    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        let value: String = value.into();
        if self.members.contains(value.as_str()) {
            return false;
        }
        let value: Arc<str> = Arc::from(value);
        self.members.insert(Arc::clone(&value));
        self.order.push(value);
        true
    }

    pub fn contains(&self, value: &str) -> bool {
        self.members.contains(value)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|value| &**value)
    }

    /// Copy the values out as an ordered list
    pub fn to_vec(&self) -> Vec<String> {
        self.order.iter().map(|value| value.to_string()).collect()
    }
}

impl FromIterator<String> for ValueSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = ValueSet::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

impl Extend<String> for ValueSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}
