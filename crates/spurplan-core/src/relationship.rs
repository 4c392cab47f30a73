//! # Relationship Manager
//!
//! Bidirectional consistency of references, independent of processing order.
//!
//! Converters deliver elements in no guaranteed order, so a forward reference
//! may be seen before its target element exists in the run. The relationship
//! table queues synthesized back-references per target id until the target
//! instance arrives; the final relationship graph is therefore invariant
//! under permutation of the input order.

use crate::store::ElementStore;
use crate::types::{ElementId, Reference, SpurplanError};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Per-element entry in the relationship table.
///
/// An entry may exist with only pending references: the element itself has
/// not been seen yet. Once it is, the queue is drained onto it immediately.
#[derive(Debug, Clone, Default)]
struct RelationshipEntry {
    /// Whether this element has passed through the manager itself.
    instance_seen: bool,
    /// Queued back-references, keyed by the originating source element.
    pending: BTreeMap<ElementId, Reference>,
}

/// Establishes back-references for already-linked elements.
#[derive(Debug, Default)]
pub struct RelationshipManager {
    table: BTreeMap<ElementId, RelationshipEntry>,
    back_references_applied: u64,
}

impl RelationshipManager {
    /// Create a new manager with an empty relationship table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure bidirectional consistency for one element.
    ///
    /// Two phases:
    /// - **A**: every bidirectional reference this element holds gets a
    ///   synthesized back-reference (type = this element's type, target =
    ///   this element's id) delivered to the target — immediately when the
    ///   target has already been seen, queued otherwise.
    /// - **B**: back-references other elements queued for *this* id are
    ///   applied now, and the element is recorded as seen.
    ///
    /// Ids not present in the store are skipped with a debug log.
    pub fn establish_bidirectional_ref_for(&mut self, store: &mut ElementStore, id: ElementId) {
        let Some(element) = store.get(id) else {
            debug!(element = %id, "not an element of this run, skipping");
            return;
        };
        let element_type = element.element_type().clone();
        let outgoing: Vec<Reference> = element
            .references()
            .iter()
            .filter(|r| r.bidirectional())
            .cloned()
            .collect();

        // Phase A: propagate outgoing references to their targets.
        for reference in outgoing {
            let target_id = reference.target();
            let back = Reference::new(id, element_type.clone(), true);
            let entry = self.table.entry(target_id).or_default();
            if entry.instance_seen {
                self.back_references_applied += Self::apply(store, target_id, back);
            } else {
                entry.pending.insert(id, back);
            }
        }

        // Phase B: absorb back-references queued for this element.
        let entry = self.table.entry(id).or_default();
        entry.instance_seen = true;
        let queued: Vec<Reference> = std::mem::take(&mut entry.pending)
            .into_values()
            .filter(Reference::bidirectional)
            .collect();
        for back in queued {
            self.back_references_applied += Self::apply(store, id, back);
        }
    }

    /// Attach one back-reference; duplicates are non-events, other failures
    /// are logged and dropped. Returns the number of references applied.
    fn apply(store: &mut ElementStore, id: ElementId, back: Reference) -> u64 {
        let Some(element) = store.get_mut(id) else {
            debug!(element = %id, "back-reference target vanished, skipping");
            return 0;
        };
        match element.attach_reference(back) {
            Ok(()) => 1,
            Err(SpurplanError::DuplicateReference { source_id, target }) => {
                debug!(source = %source_id, %target, "back-reference already present");
                0
            }
            Err(e) => {
                warn!(element = %id, error = %e, "back-reference application failed");
                0
            }
        }
    }

    /// Apply the single-element routine to each member of a batch, in input
    /// order. Correctness does not depend on the order thanks to the queue.
    pub fn establish_bidirectional_ref_for_subset(
        &mut self,
        store: &mut ElementStore,
        ids: &[ElementId],
    ) {
        if ids.is_empty() {
            info!("empty element subset, nothing to reconcile");
            return;
        }
        for &id in ids {
            self.establish_bidirectional_ref_for(store, id);
        }
    }

    /// Total back-references applied so far (host summary metric).
    #[must_use]
    pub const fn back_references_applied(&self) -> u64 {
        self.back_references_applied
    }
}

// =============================================================================
// TESTS
// =============================================================================
