//! # Element Linker
//!
//! Cache and link resolution over independently converted elements.
//!
//! Elements are first registered into a two-level lookup cache (type name,
//! then `"name:value"` and bare `"value"` keys), link definitions are
//! registered in declaration order, and `process_element_links` resolves the
//! declared cross-type references per source element. Linking is best-effort
//! per (source, target) pair: a failed reference attachment is logged and the
//! remaining matches still get processed.

use crate::store::ElementStore;
use crate::types::{
    Element, ElementId, ElementType, LinkDefinition, ParamValue, Parameter, Reference,
    SpurplanError,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Inner cache bucket: lookup key -> element ids in registration order.
type ValueBuckets = BTreeMap<String, Vec<ElementId>>;

/// Resolves declarative link definitions between registered elements.
///
/// One linker instance serves exactly one import run; it borrows the run's
/// `ElementStore` for every operation and owns nothing but indexes.
#[derive(Debug, Default)]
pub struct ElementLinker {
    /// Link definitions in registration order.
    definitions: Vec<LinkDefinition>,
    /// Outer key: element type name. Inner keys: `"<name>:<value>"` plus the
    /// bare `"<value>"` fallback, both pointing at the same elements.
    cache: BTreeMap<String, ValueBuckets>,
    /// Ids already indexed; re-registration is a no-op.
    registered: BTreeSet<ElementId>,
    /// Ids already link-processed; repeated processing is a no-op.
    processed: BTreeSet<ElementId>,
    /// Running count of references created across the run.
    references_created: u64,
}

impl ElementLinker {
    /// Create a new linker with no definitions and empty caches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a link definition.
    ///
    /// Definitions may arrive before or after the elements they concern; no
    /// validation against registered elements happens here. Cache buckets for
    /// both involved types are initialized idempotently.
    pub fn register_link_definition(&mut self, definition: LinkDefinition) {
        self.cache
            .entry(definition.source_type().name().to_string())
            .or_default();
        self.cache
            .entry(definition.target_type().name().to_string())
            .or_default();
        debug!(
            source = %definition.source_type(),
            target = %definition.target_type(),
            param = definition.source_param_name(),
            "link definition registered"
        );
        self.definitions.push(definition);
    }

    /// Number of registered link definitions.
    #[must_use]
    pub fn link_definition_count(&self) -> usize {
        self.definitions.len()
    }

    /// Index an element for later lookup as a link target.
    ///
    /// Every parameter the element currently holds is indexed under both the
    /// qualified `"name:value"` key and the bare `"value"` key, scoped to the
    /// element's concrete type. Targets must be registered before their
    /// sources are processed; sources themselves need no registration.
    pub fn register_element(
        &mut self,
        store: &ElementStore,
        id: ElementId,
    ) -> Result<(), SpurplanError> {
        if self.registered.contains(&id) {
            debug!(element = %id, "element already registered, skipping");
            return Ok(());
        }
        let element = store.require(id)?;

        let buckets = self
            .cache
            .entry(element.element_type().name().to_string())
            .or_default();
        for param in element.parameters() {
            let rendered = param.value().render();
            let qualified = format!("{}:{}", param.name(), rendered);
            buckets.entry(qualified).or_default().push(id);
            buckets.entry(rendered).or_default().push(id);
        }

        self.registered.insert(id);
        Ok(())
    }

    /// Candidate targets for one definition: the qualified key wins when it
    /// has entries, otherwise the bare-value key is consulted. The two are
    /// never unioned.
    fn lookup_targets(
        &self,
        target_type: &ElementType,
        target_param_name: &str,
        rendered_value: &str,
    ) -> Vec<ElementId> {
        let Some(buckets) = self.cache.get(target_type.name()) else {
            return Vec::new();
        };
        let qualified = format!("{target_param_name}:{rendered_value}");
        if let Some(ids) = buckets.get(&qualified) {
            if !ids.is_empty() {
                return ids.clone();
            }
        }
        buckets.get(rendered_value).cloned().unwrap_or_default()
    }

    /// Resolve all registered link definitions for one source element.
    ///
    /// Idempotent per element: the processed-set guard makes repeated calls
    /// no-ops. Returns the number of references created by this call.
    pub fn process_element_links(
        &mut self,
        store: &mut ElementStore,
        id: ElementId,
    ) -> Result<usize, SpurplanError> {
        if self.processed.contains(&id) {
            debug!(element = %id, "element already link-processed, skipping");
            return Ok(0);
        }

        // Plan first: all lookups happen against the immutable cache and the
        // source element before any mutation starts.
        let mut planned: Vec<(LinkDefinition, Vec<ElementId>)> = Vec::new();
        {
            let element = store.require(id)?;
            for definition in &self.definitions {
                if definition.source_type() != element.element_type() {
                    continue;
                }
                let Some(param) = element.parameter_by_name(definition.source_param_name()) else {
                    debug!(
                        element = %id,
                        param = definition.source_param_name(),
                        "source parameter absent, definition skipped"
                    );
                    continue;
                };
                if param.value().is_empty_like() {
                    debug!(
                        element = %id,
                        param = definition.source_param_name(),
                        "source parameter empty, definition skipped"
                    );
                    continue;
                }
                let targets = self.lookup_targets(
                    definition.target_type(),
                    definition.target_param_name(),
                    &param.value().render(),
                );
                if !targets.is_empty() {
                    planned.push((definition.clone(), targets));
                }
            }
        }

        let mut created: u64 = 0;
        for (definition, targets) in planned {
            for target_id in targets {
                let Some(source) = store.get_mut(id) else {
                    return Err(SpurplanError::ElementNotFound(id));
                };
                let reference = Reference::new(
                    target_id,
                    definition.target_type().clone(),
                    definition.is_bidirectional(),
                );
                match source.attach_reference(reference) {
                    Ok(()) => {
                        created += 1;
                        if definition.is_bidirectional() {
                            Self::materialize_link(source, &definition, target_id);
                        }
                    }
                    Err(e) => {
                        // Best-effort linking: log both identities, keep going.
                        warn!(
                            source = %id,
                            target = %target_id,
                            error = %e,
                            "reference creation failed"
                        );
                    }
                }
            }
        }

        self.references_created += created;
        self.processed.insert(id);
        Ok(created as usize)
    }

    /// Store the resolved target id as a parameter on the source, under the
    /// definition's `source_uuid_param` tag. First write wins: an existing
    /// parameter under that tag is never overwritten.
    fn materialize_link(source: &mut Element, definition: &LinkDefinition, target_id: ElementId) {
        let Some(tag) = definition.source_uuid_param() else {
            return;
        };
        if source.parameter_by_tag(tag).is_some() {
            return;
        }
        source.append_parameter(Parameter::tagged(
            tag.as_str(),
            ParamValue::Text(target_id.to_string()),
            tag.clone(),
        ));
    }

    /// Finish the linking phase: log and return the reference count.
    #[must_use]
    pub fn finalize_links(&self) -> u64 {
        info!(
            references = self.references_created,
            definitions = self.definitions.len(),
            elements = self.registered.len(),
            "element linking finalized"
        );
        self.references_created
    }

    /// Drop all in-memory linker state and reset counters.
    ///
    /// Memory reclamation between large batches, not a semantic reset: the
    /// elements themselves keep whatever references were already created.
    pub fn clear_caches(&mut self) {
        self.definitions.clear();
        self.cache.clear();
        self.registered.clear();
        self.processed.clear();
        self.references_created = 0;
        info!("linker caches cleared");
    }
}

// =============================================================================
// TESTS
// =============================================================================
