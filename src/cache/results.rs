//! Cached result sets

use std::collections::HashSet;

use crate::types::Reference;

/// Kind of change applied to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeEvent {
    Insert,
    Update,
    Delete,
}

/// References produced by one query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedResults {
    references: HashSet<Reference>,
}

impl CachedResults {
    pub fn new(references: HashSet<Reference>) -> Self {
        Self { references }
    }

    /// Apply a change to one record; `matches` tells whether the record
    /// (after the change) satisfies the query
    pub fn apply(&mut self, reference: Reference, event: ChangeEvent, matches: bool) {
        match event {
            ChangeEvent::Delete => {
                self.references.remove(&reference);
            }
            ChangeEvent::Insert | ChangeEvent::Update if matches => {
                self.references.insert(reference);
            }
            // An update can move a record out of the result set
            ChangeEvent::Update => {
                self.references.remove(&reference);
            }
            ChangeEvent::Insert => {}
        }
    }

    pub fn contains(&self, reference: &Reference) -> bool {
        self.references.contains(reference)
    }

    pub fn references(&self) -> &HashSet<Reference> {
        &self.references
    }

    pub fn into_references(self) -> HashSet<Reference> {
        self.references
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

impl FromIterator<Reference> for CachedResults {
    fn from_iter<I: IntoIterator<Item = Reference>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
