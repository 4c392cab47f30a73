//! # spurplan-core
//!
//! The deterministic linking and validation engine for Spurplan - THE LOGIC.
//!
//! This crate implements the CORE substrate - a minimal, deterministic engine
//! that resolves parameter-value references between converted infrastructure
//! elements, reconciles bidirectional relationships, and validates elements
//! against per-type schemas.
//!
//! ## Pipeline
//!
//! - `ElementLinker` indexes converted elements and materializes references
//!   from declarative `LinkDefinition`s
//! - `RelationshipManager` closes the bidirectional reference relation over
//!   the store, regardless of conversion order
//! - `ValidationService` runs registered validators per element type and
//!   aggregates batch reports
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Owns no persistence; the host hands in an `ElementStore` and keeps it
//! - Is deterministic: BTree collections only, no ambient randomness beyond
//!   freshly generated element ids
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod constraint;
pub mod linker;
pub mod relationship;
pub mod schema;
pub mod store;
pub mod types;
pub mod validation;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    CLOTHOID_END_RADIUS, CLOTHOID_START_RADIUS, Component, DataType, Element, ElementCapabilities,
    ElementId, ElementType, LinkDefinition, ParamValue, Parameter, ProcessTag, Reference,
    SpurplanError, Unit,
};

// =============================================================================
// RE-EXPORTS: Linking Engine
// =============================================================================

pub use linker::ElementLinker;
pub use relationship::RelationshipManager;
pub use store::ElementStore;

// =============================================================================
// RE-EXPORTS: Validation
// =============================================================================

pub use constraint::{Constraint, ParameterDefinition, parameter_definition, known_process_tags};
pub use schema::{
    FieldRule, FieldSchema, FieldSchemaValidator, RawRecord, SchemaDefinition, SchemaValidator,
    standard_schema,
};
pub use validation::{
    ErrorTypeSummary, Severity, ValidationError, ValidationReport, ValidationResult,
    ValidationService, ValidationWarning, Validator,
};
