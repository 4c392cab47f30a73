//! # Relationship Closure Tests
//!
//! Bidirectional reconciliation over the store must converge to the same
//! relationship graph regardless of the order elements are handed to the
//! manager.

use proptest::prelude::*;
use spurplan_core::{
    Element, ElementId, ElementStore, ElementType, Reference, RelationshipManager,
};
use std::collections::BTreeSet;

fn bare(store: &mut ElementStore, element_type: ElementType) -> ElementId {
    store.insert(Element::new(element_type, vec![]))
}

fn link(store: &mut ElementStore, source: ElementId, target: ElementId) {
    let target_type = store.get(target).expect("target").element_type().clone();
    store
        .get_mut(source)
        .expect("source")
        .attach_reference(Reference::new(target, target_type, true))
        .expect("attach");
}

// =============================================================================
// ORDER INDEPENDENCE
// =============================================================================

/// Source processed before the target is even known to the manager: the
/// back-reference lands once the target arrives.
#[test]
fn late_target_still_receives_back_reference() {
    let mut store = ElementStore::new();
    let a = bare(&mut store, ElementType::Foundation);
    let b = bare(&mut store, ElementType::Mast);
    link(&mut store, a, b);

    let mut manager = RelationshipManager::new();
    manager.establish_bidirectional_ref_for(&mut store, a);
    assert!(!store.get(b).expect("b").has_reference_to(a));

    manager.establish_bidirectional_ref_for(&mut store, b);
    assert!(store.get(b).expect("b").has_reference_to(a));
    assert_eq!(manager.back_references_applied(), 1);
}

/// A chain of three elements reconciles fully whichever way the subset is
/// ordered.
#[test]
fn chain_closure_both_directions() {
    for reversed in [false, true] {
        let mut store = ElementStore::new();
        let a = bare(&mut store, ElementType::Foundation);
        let b = bare(&mut store, ElementType::Mast);
        let c = bare(&mut store, ElementType::Track);
        link(&mut store, a, b);
        link(&mut store, b, c);

        let mut ids = vec![a, b, c];
        if reversed {
            ids.reverse();
        }

        let mut manager = RelationshipManager::new();
        manager.establish_bidirectional_ref_for_subset(&mut store, &ids);

        assert!(store.get(b).expect("b").has_reference_to(a));
        assert!(store.get(c).expect("c").has_reference_to(b));
        assert_eq!(manager.back_references_applied(), 2);
    }
}

/// Reconciling the same subset again changes nothing.
#[test]
fn reconciliation_is_stable_under_repeats() {
    let mut store = ElementStore::new();
    let a = bare(&mut store, ElementType::Foundation);
    let b = bare(&mut store, ElementType::Mast);
    link(&mut store, a, b);

    let mut manager = RelationshipManager::new();
    manager.establish_bidirectional_ref_for_subset(&mut store, &[a, b]);
    manager.establish_bidirectional_ref_for_subset(&mut store, &[b, a]);

    assert_eq!(store.get(b).expect("b").references().len(), 1);
    assert_eq!(manager.back_references_applied(), 1);
}

// =============================================================================
// PERMUTATION INVARIANCE
// =============================================================================

proptest! {
    /// For a random bidirectional star graph, every A->B reference has a
    /// B->A back-reference after reconciliation, whatever the processing
    /// order.
    #[test]
    fn closure_is_permutation_invariant(
        spoke_count in 1usize..8,
        seed in 0usize..64
    ) {
        let mut store = ElementStore::new();
        let hub = bare(&mut store, ElementType::Mast);
        let mut ids = vec![hub];
        for _ in 0..spoke_count {
            let spoke = bare(&mut store, ElementType::Foundation);
            link(&mut store, spoke, hub);
            ids.push(spoke);
        }

        // Deterministic permutation derived from the seed.
        let mut order = Vec::with_capacity(ids.len());
        let mut remaining = ids.clone();
        let mut state = seed;
        while !remaining.is_empty() {
            state = (state * 31 + 7) % remaining.len().max(1);
            order.push(remaining.remove(state % remaining.len()));
        }

        let mut manager = RelationshipManager::new();
        manager.establish_bidirectional_ref_for_subset(&mut store, &order);

        // Hub must point back at every spoke exactly once.
        let hub_targets: BTreeSet<ElementId> = store
            .get(hub)
            .expect("hub")
            .references()
            .iter()
            .map(Reference::target)
            .collect();
        let spokes: BTreeSet<ElementId> =
            ids.iter().skip(1).copied().collect();
        prop_assert_eq!(hub_targets, spokes);
        prop_assert_eq!(manager.back_references_applied(), spoke_count as u64);
    }
}
