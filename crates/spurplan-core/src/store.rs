//! # Element Store
//!
//! Owning container for the elements of one import run.
//!
//! The store is the single owner of element instances: the linker and the
//! relationship manager borrow it mutably for the duration of a pass, which
//! rules out shared concurrent mutation by construction. Hosts that
//! parallelize conversion across clients use one store per client and merge
//! results afterwards.

use crate::types::{Element, ElementId, SpurplanError};
use std::collections::BTreeMap;

/// Flat id -> element map with deterministic iteration order.
#[derive(Debug, Clone, Default)]
pub struct ElementStore {
    elements: BTreeMap<ElementId, Element>,
}

impl ElementStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an element, keyed by its own id. Returns the id for chaining.
    pub fn insert(&mut self, element: Element) -> ElementId {
        let id = element.id();
        self.elements.insert(id, element);
        id
    }

    /// O(log n) identity lookup.
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Mutable identity lookup (linking phase enrichment).
    #[must_use]
    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    /// Identity lookup that surfaces a missing element as an error.
    pub fn require(&self, id: ElementId) -> Result<&Element, SpurplanError> {
        self.elements
            .get(&id)
            .ok_or(SpurplanError::ElementNotFound(id))
    }

    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    /// Explicit external removal; the core itself never deletes elements.
    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        self.elements.remove(&id)
    }

    /// All elements in deterministic id order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// All element ids in deterministic order.
    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElementType;

    #[test]
    fn insert_and_lookup() {
        let mut store = ElementStore::new();
        let id = store.insert(Element::new(ElementType::Mast, vec![]));

        assert!(store.contains(id));
        assert_eq!(store.get(id).map(Element::id), Some(id));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn require_missing_element_fails() {
        let store = ElementStore::new();
        let result = store.require(ElementId::generate());
        assert!(matches!(result, Err(SpurplanError::ElementNotFound(_))));
    }

    #[test]
    fn iteration_is_ordered_by_id() {
        let mut store = ElementStore::new();
        for _ in 0..8 {
            store.insert(Element::new(ElementType::Track, vec![]));
        }

        let ids: Vec<ElementId> = store.ids().collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn remove_is_external_only() {
        let mut store = ElementStore::new();
        let id = store.insert(Element::new(ElementType::Drainage, vec![]));

        let removed = store.remove(id);
        assert!(removed.is_some());
        assert!(store.is_empty());
    }
}
