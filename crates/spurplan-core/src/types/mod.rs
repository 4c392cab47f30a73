//! # Core Type Definitions
//!
//! This module contains all core types for the Spurplan element model:
//! - Identity and category tags (`ElementId`, `ElementType`, `ProcessTag`)
//! - Parameter representation (`Parameter`, `ParamValue`, `DataType`, `Unit`)
//! - Cross-element linking (`Reference`, `LinkDefinition`)
//! - Error types (`SpurplanError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module implement `Ord` where they are used as keys, so
//! every cache, relationship table and report iterates in a stable order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// IDENTITY & CATEGORY TAGS
// =============================================================================

/// Unique identifier of a canonical infrastructure element.
///
/// Generated exactly once when the element is created by a converter and
/// stable for the element's whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Generate a fresh element id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing id (used when a converter already assigned one).
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Category of an infrastructure element.
///
/// The built-in variants cover the object classes every supported client
/// delivers; `Other` carries client-specific categories verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Foundation,
    Mast,
    Track,
    Drainage,
    Cable,
    SignalPost,
    Other(String),
}

impl ElementType {
    /// The type name used as the outer cache key.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Foundation => "FOUNDATION",
            Self::Mast => "MAST",
            Self::Track => "TRACK",
            Self::Drainage => "DRAINAGE",
            Self::Cable => "CABLE",
            Self::SignalPost => "SIGNAL_POST",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Semantic key of a parameter, shared across client formats.
///
/// Converters may label the same quantity differently per client; the process
/// tag is the canonical handle used for lookups, linking and validation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessTag(String);

impl ProcessTag {
    /// Create a process tag from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// PARAMETER VALUES
// =============================================================================

/// Declared data type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DataType {
    String,
    Float,
    Integer,
    Boolean,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "String",
            Self::Float => "Float",
            Self::Integer => "Integer",
            Self::Boolean => "Boolean",
        };
        f.write_str(name)
    }
}

/// Physical unit of a parameter value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Unit {
    Unitless,
    Meter,
    Millimeter,
    Kilometer,
    Degree,
    Percent,
    Other(String),
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unitless => "-",
            Self::Meter => "m",
            Self::Millimeter => "mm",
            Self::Kilometer => "km",
            Self::Degree => "deg",
            Self::Percent => "%",
            Self::Other(name) => name,
        };
        f.write_str(name)
    }
}

/// A typed parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Whether this value counts as "empty" for link matching.
    ///
    /// Mirrors the falsiness test of the upstream converters: empty strings,
    /// zero numbers and `false` never participate in link resolution.
    #[must_use]
    pub fn is_empty_like(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Int(i) => *i == 0,
            Self::Float(f) => *f == 0.0,
            Self::Bool(b) => !*b,
        }
    }

    /// Canonical string rendering, used in cache keys and when a resolved
    /// link is materialized as a parameter.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }

    /// Numeric view for bounds constraints. Non-numeric values return `None`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            Self::Text(_) | Self::Bool(_) => None,
        }
    }

    /// Text view. Non-text values return `None`.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The data type this value actually carries.
    #[must_use]
    pub const fn actual_type(&self) -> DataType {
        match self {
            Self::Text(_) => DataType::String,
            Self::Float(_) => DataType::Float,
            Self::Int(_) => DataType::Integer,
            Self::Bool(_) => DataType::Boolean,
        }
    }
}

// =============================================================================
// PARAMETER
// =============================================================================

/// Opaque component attached to a parameter (e.g. a phase reference).
///
/// Components are carried through linking and validation untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component(pub String);

/// A named, typed, unit-bearing value attached to an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    name: String,
    value: ParamValue,
    data_type: DataType,
    unit: Unit,
    process_tag: Option<ProcessTag>,
    components: Vec<Component>,
}

impl Parameter {
    /// Create an untagged parameter; the declared data type is inferred from
    /// the value and the unit defaults to unitless.
    #[must_use]
    pub fn new(name: impl Into<String>, value: ParamValue) -> Self {
        let data_type = value.actual_type();
        Self {
            name: name.into(),
            value,
            data_type,
            unit: Unit::Unitless,
            process_tag: None,
            components: Vec::new(),
        }
    }

    /// Create a parameter carrying a process tag.
    #[must_use]
    pub fn tagged(name: impl Into<String>, value: ParamValue, tag: ProcessTag) -> Self {
        let mut param = Self::new(name, value);
        param.process_tag = Some(tag);
        param
    }

    /// Set the unit.
    #[must_use]
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// Override the declared data type (converters may declare a type that
    /// differs from what the raw value carries; validation reports that).
    #[must_use]
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// Attach an opaque component.
    #[must_use]
    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &ParamValue {
        &self.value
    }

    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    #[must_use]
    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    #[must_use]
    pub fn process_tag(&self) -> Option<&ProcessTag> {
        self.process_tag.as_ref()
    }

    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }
}

// =============================================================================
// REFERENCES & LINK DEFINITIONS
// =============================================================================

/// A typed cross-reference from one element to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    target: ElementId,
    target_type: ElementType,
    bidirectional: bool,
}

impl Reference {
    /// Create a new reference.
    #[must_use]
    pub const fn new(target: ElementId, target_type: ElementType, bidirectional: bool) -> Self {
        Self {
            target,
            target_type,
            bidirectional,
        }
    }

    #[must_use]
    pub const fn target(&self) -> ElementId {
        self.target
    }

    #[must_use]
    pub fn target_type(&self) -> &ElementType {
        &self.target_type
    }

    #[must_use]
    pub const fn bidirectional(&self) -> bool {
        self.bidirectional
    }
}

/// Declarative rule matching elements of one type to another via parameter
/// equality.
///
/// Immutable once constructed; the constructor rejects empty parameter names
/// so malformed definitions surface at registration time, not mid-run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDefinition {
    source_type: ElementType,
    target_type: ElementType,
    source_param_name: String,
    target_param_name: String,
    source_uuid_param: Option<ProcessTag>,
    bidirectional: bool,
}

impl LinkDefinition {
    /// Create a link definition. All four identifying fields are required.
    pub fn new(
        source_type: ElementType,
        target_type: ElementType,
        source_param_name: impl Into<String>,
        target_param_name: impl Into<String>,
    ) -> Result<Self, SpurplanError> {
        let source_param_name = source_param_name.into();
        let target_param_name = target_param_name.into();
        if source_param_name.is_empty() || target_param_name.is_empty() {
            return Err(SpurplanError::InvalidLinkDefinition(format!(
                "empty parameter name in {source_type} -> {target_type}"
            )));
        }
        Ok(Self {
            source_type,
            target_type,
            source_param_name,
            target_param_name,
            source_uuid_param: None,
            bidirectional: false,
        })
    }

    /// Materialize resolved links as a parameter under this process tag.
    #[must_use]
    pub fn with_source_uuid_param(mut self, tag: ProcessTag) -> Self {
        self.source_uuid_param = Some(tag);
        self
    }

    /// Mark the relationship as bidirectional.
    #[must_use]
    pub const fn bidirectional(mut self) -> Self {
        self.bidirectional = true;
        self
    }

    #[must_use]
    pub fn source_type(&self) -> &ElementType {
        &self.source_type
    }

    #[must_use]
    pub fn target_type(&self) -> &ElementType {
        &self.target_type
    }

    #[must_use]
    pub fn source_param_name(&self) -> &str {
        &self.source_param_name
    }

    #[must_use]
    pub fn target_param_name(&self) -> &str {
        &self.target_param_name
    }

    #[must_use]
    pub fn source_uuid_param(&self) -> Option<&ProcessTag> {
        self.source_uuid_param.as_ref()
    }

    #[must_use]
    pub const fn is_bidirectional(&self) -> bool {
        self.bidirectional
    }
}

// =============================================================================
// ELEMENT
// =============================================================================

/// Capabilities of an element, resolved once at construction.
///
/// Replaces per-call duck-typed probing: converters that deliver clothoid
/// geometry do so at creation time, so the capability never changes later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementCapabilities {
    /// Plain element: parameters and references only.
    Base,
    /// Element carrying clothoid transition geometry.
    WithClothoid { start_radius: f64, end_radius: f64 },
}

/// Process tag under which converters deliver the clothoid start radius.
pub const CLOTHOID_START_RADIUS: &str = "CLOTHOID_START_RADIUS";
/// Process tag under which converters deliver the clothoid end radius.
pub const CLOTHOID_END_RADIUS: &str = "CLOTHOID_END_RADIUS";

/// A canonical infrastructure element.
///
/// Elements are produced by format-specific converters, enriched with
/// references during the linking phase and persisted externally afterwards.
/// The parameter list keeps insertion order; tagged parameters are also
/// reachable in O(log n) through the tag index.
#[derive(Debug, Clone, Serialize)]
pub struct Element {
    id: ElementId,
    element_type: ElementType,
    parameters: Vec<Parameter>,
    #[serde(skip)]
    tag_index: BTreeMap<ProcessTag, usize>,
    references: Vec<Reference>,
    capabilities: ElementCapabilities,
}

impl Element {
    /// Create an element from its converter-supplied parameters.
    ///
    /// The id is generated here, exactly once. Capabilities are resolved from
    /// the initial parameter set and never re-probed.
    #[must_use]
    pub fn new(element_type: ElementType, parameters: Vec<Parameter>) -> Self {
        Self::with_id(ElementId::generate(), element_type, parameters)
    }

    /// Create an element with a converter-assigned id.
    #[must_use]
    pub fn with_id(id: ElementId, element_type: ElementType, parameters: Vec<Parameter>) -> Self {
        let mut element = Self {
            id,
            element_type,
            parameters: Vec::new(),
            tag_index: BTreeMap::new(),
            references: Vec::new(),
            capabilities: ElementCapabilities::Base,
        };
        for param in parameters {
            element.append_parameter(param);
        }
        element.capabilities = element.resolve_capabilities();
        element
    }

    fn resolve_capabilities(&self) -> ElementCapabilities {
        let radius = |tag: &str| {
            self.parameter_by_tag(&ProcessTag::new(tag))
                .and_then(|p| p.value().as_f64())
        };
        match (
            radius(CLOTHOID_START_RADIUS),
            radius(CLOTHOID_END_RADIUS),
        ) {
            (Some(start_radius), Some(end_radius)) => ElementCapabilities::WithClothoid {
                start_radius,
                end_radius,
            },
            _ => ElementCapabilities::Base,
        }
    }

    #[must_use]
    pub const fn id(&self) -> ElementId {
        self.id
    }

    #[must_use]
    pub fn element_type(&self) -> &ElementType {
        &self.element_type
    }

    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    #[must_use]
    pub fn capabilities(&self) -> &ElementCapabilities {
        &self.capabilities
    }

    /// O(log n) lookup of a tagged parameter.
    #[must_use]
    pub fn parameter_by_tag(&self, tag: &ProcessTag) -> Option<&Parameter> {
        self.tag_index
            .get(tag)
            .and_then(|&idx| self.parameters.get(idx))
    }

    /// First parameter with the given display name.
    #[must_use]
    pub fn parameter_by_name(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name() == name)
    }

    /// Append a parameter, keeping the tag index consistent.
    ///
    /// If the parameter carries a tag that is already indexed, the index keeps
    /// pointing at the first occurrence (first-write-wins).
    pub fn append_parameter(&mut self, parameter: Parameter) {
        let idx = self.parameters.len();
        if let Some(tag) = parameter.process_tag() {
            self.tag_index.entry(tag.clone()).or_insert(idx);
        }
        self.parameters.push(parameter);
    }

    /// Attach a typed reference to another element.
    ///
    /// Self-references and repeated (target, type) pairs are rejected; the
    /// linking layer treats both as recoverable non-events.
    pub fn attach_reference(&mut self, reference: Reference) -> Result<(), SpurplanError> {
        if reference.target() == self.id {
            return Err(SpurplanError::SelfReference(self.id));
        }
        let duplicate = self.references.iter().any(|existing| {
            existing.target() == reference.target()
                && existing.target_type() == reference.target_type()
        });
        if duplicate {
            return Err(SpurplanError::DuplicateReference {
                source_id: self.id,
                target: reference.target(),
            });
        }
        self.references.push(reference);
        Ok(())
    }

    #[must_use]
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Whether this element already references the given target.
    #[must_use]
    pub fn has_reference_to(&self, target: ElementId) -> bool {
        self.references.iter().any(|r| r.target() == target)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Spurplan core.
///
/// Per-reference failures during linking are recovered locally by the caller;
/// everything else surfaces to the host.
#[derive(Debug, Error)]
pub enum SpurplanError {
    /// The requested element is not in the store.
    #[error("Element not found: {0}")]
    ElementNotFound(ElementId),

    /// A reference would point at its own element.
    #[error("Self-reference rejected for element {0}")]
    SelfReference(ElementId),

    /// The element already holds a reference to this target.
    #[error("Duplicate reference from {source_id} to {target}")]
    DuplicateReference {
        // Named `source_id` rather than `source` because thiserror treats a
        // `source` field as the error's source, which must implement Error.
        source_id: ElementId,
        target: ElementId,
    },

    /// A link definition is structurally malformed.
    #[error("Invalid link definition: {0}")]
    InvalidLinkDefinition(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred (host boundary only).
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
