//! # Schema Evaluation
//!
//! Per element-type aggregation of required tags and constraints, plus the
//! schema-backed validators plugged into the validation service.
//!
//! Two evaluators share the constraint machinery: `SchemaDefinition` runs
//! against canonical elements by process tag, `FieldSchema` runs against raw
//! converted records by field name (converters hand those over before the
//! canonical model exists).

use crate::constraint::{Constraint, ParameterDefinition, parameter_definition, type_matches};
use crate::types::{DataType, Element, ElementType, ParamValue, ProcessTag};
use crate::validation::{
    Severity, ValidationError, ValidationResult, ValidationWarning, Validator,
};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// ELEMENT SCHEMA
// =============================================================================

/// Required tags and per-tag rules for one element type.
#[derive(Debug, Clone)]
pub struct SchemaDefinition {
    element_type: ElementType,
    required_tags: BTreeSet<ProcessTag>,
    definitions: BTreeMap<ProcessTag, ParameterDefinition>,
}

impl SchemaDefinition {
    /// Create an empty schema for one element type.
    #[must_use]
    pub fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            required_tags: BTreeSet::new(),
            definitions: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn element_type(&self) -> &ElementType {
        &self.element_type
    }

    /// Mark a tag as required; its rules come from the static tag table.
    #[must_use]
    pub fn require(mut self, tag: ProcessTag) -> Self {
        let definition = parameter_definition(&tag);
        self.required_tags.insert(tag.clone());
        self.definitions.entry(tag).or_insert(definition);
        self
    }

    /// Check a tag with its table rules without requiring it.
    #[must_use]
    pub fn check(mut self, tag: ProcessTag) -> Self {
        let definition = parameter_definition(&tag);
        self.definitions.entry(tag).or_insert(definition);
        self
    }

    /// Check a tag with an explicit definition, overriding the table.
    #[must_use]
    pub fn check_with(mut self, tag: ProcessTag, definition: ParameterDefinition) -> Self {
        self.definitions.insert(tag, definition);
        self
    }

    /// Evaluate the schema against one element.
    ///
    /// A missing tag yields one error: CRITICAL when required, ERROR
    /// otherwise. A present parameter is checked against the expected data
    /// type (error), the expected unit (warning) and every constraint, one
    /// error per failing constraint.
    #[must_use]
    pub fn evaluate(&self, element: &Element) -> ValidationResult {
        let mut result = ValidationResult::new();
        let element_context = format!("{} {}", element.element_type(), element.id());

        for (tag, definition) in &self.definitions {
            let Some(param) = element.parameter_by_tag(tag) else {
                let severity = if self.required_tags.contains(tag) {
                    Severity::Critical
                } else {
                    Severity::Error
                };
                result.add_error(
                    ValidationError::new(severity, format!("missing parameter '{tag}'"))
                        .with_context(element_context.clone()),
                );
                continue;
            };

            let param_context = format!("{element_context}/{}", param.name());

            if !type_matches(param.value(), definition.data_type) {
                result.add_error(
                    ValidationError::new(
                        Severity::Error,
                        format!(
                            "parameter '{tag}' expected type {}, found {}",
                            definition.data_type,
                            param.value().actual_type()
                        ),
                    )
                    .with_context(param_context.clone()),
                );
            }

            if param.unit() != &definition.unit {
                result.add_warning(ValidationWarning {
                    message: format!(
                        "parameter '{tag}' declared in '{}', expected '{}'",
                        param.unit(),
                        definition.unit
                    ),
                    context: Some(param_context.clone()),
                });
            }

            for constraint in &definition.constraints {
                if !constraint.validate(Some(param.value())) {
                    result.add_error(
                        ValidationError::new(Severity::Error, constraint.message(tag.as_str()))
                            .with_context(param_context.clone()),
                    );
                }
            }
        }

        result
    }
}

/// The built-in schema for one element type.
#[must_use]
pub fn standard_schema(element_type: &ElementType) -> SchemaDefinition {
    let number = || ProcessTag::new("ELEMENT_NUMBER");
    let station = || ProcessTag::new("STATION_KM");
    match element_type {
        ElementType::Foundation => SchemaDefinition::new(element_type.clone())
            .require(number())
            .require(ProcessTag::new("FOUNDATION_TYPE"))
            .check(station()),
        ElementType::Mast => SchemaDefinition::new(element_type.clone())
            .require(number())
            .check(ProcessTag::new("MAST_HEIGHT"))
            .check(station()),
        ElementType::Track => SchemaDefinition::new(element_type.clone())
            .require(number())
            .check(ProcessTag::new("TRACK_GAUGE"))
            .check(ProcessTag::new("CANT")),
        ElementType::Drainage => SchemaDefinition::new(element_type.clone())
            .require(number())
            .check(ProcessTag::new("DRAINAGE_DIAMETER")),
        ElementType::Cable | ElementType::SignalPost => {
            SchemaDefinition::new(element_type.clone()).require(number())
        }
        ElementType::Other(_) => SchemaDefinition::new(element_type.clone()),
    }
}

/// Schema-backed validator over canonical elements.
pub struct SchemaValidator {
    supported: Vec<ElementType>,
    schemas: BTreeMap<ElementType, SchemaDefinition>,
}

impl SchemaValidator {
    /// Build a validator from explicit schemas.
    #[must_use]
    pub fn new(schemas: Vec<SchemaDefinition>) -> Self {
        let supported = schemas.iter().map(|s| s.element_type().clone()).collect();
        let schemas = schemas
            .into_iter()
            .map(|s| (s.element_type().clone(), s))
            .collect();
        Self { supported, schemas }
    }

    /// Validator carrying the standard schemas for all built-in types.
    #[must_use]
    pub fn with_standard_schemas() -> Self {
        let types = [
            ElementType::Foundation,
            ElementType::Mast,
            ElementType::Track,
            ElementType::Drainage,
            ElementType::Cable,
            ElementType::SignalPost,
        ];
        Self::new(types.iter().map(standard_schema).collect())
    }
}

impl Validator<Element> for SchemaValidator {
    fn supported_element_types(&self) -> &[ElementType] {
        &self.supported
    }

    fn validate(&self, item: &Element, element_type: &ElementType) -> ValidationResult {
        match self.schemas.get(element_type) {
            Some(schema) => schema.evaluate(item),
            None => ValidationResult::new(),
        }
    }
}

// =============================================================================
// RAW-RECORD SCHEMA
// =============================================================================

/// A raw converted record before canonicalization: field name -> value.
pub type RawRecord = BTreeMap<String, ParamValue>;

/// Rules for one raw field.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub data_type: DataType,
    pub required: bool,
    pub constraints: Vec<Constraint>,
}

/// Field-level schema for raw converted records.
#[derive(Debug, Clone, Default)]
pub struct FieldSchema {
    fields: BTreeMap<String, FieldRule>,
}

impl FieldSchema {
    /// Create an empty field schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an optional field of the given type.
    #[must_use]
    pub fn field(self, name: impl Into<String>, data_type: DataType) -> Self {
        self.add(name, data_type, false, Vec::new())
    }

    /// Declare a required field of the given type.
    #[must_use]
    pub fn required_field(self, name: impl Into<String>, data_type: DataType) -> Self {
        self.add(name, data_type, true, Vec::new())
    }

    /// Declare a field with explicit constraints.
    #[must_use]
    pub fn constrained_field(
        self,
        name: impl Into<String>,
        data_type: DataType,
        constraints: Vec<Constraint>,
    ) -> Self {
        self.add(name, data_type, false, constraints)
    }

    fn add(
        mut self,
        name: impl Into<String>,
        data_type: DataType,
        required: bool,
        constraints: Vec<Constraint>,
    ) -> Self {
        self.fields.insert(
            name.into(),
            FieldRule {
                data_type,
                required,
                constraints,
            },
        );
        self
    }

    /// Evaluate the schema against one raw record.
    #[must_use]
    pub fn evaluate(&self, record: &RawRecord) -> ValidationResult {
        let mut result = ValidationResult::new();

        for (name, rule) in &self.fields {
            let Some(value) = record.get(name) else {
                let severity = if rule.required {
                    Severity::Critical
                } else {
                    Severity::Error
                };
                result.add_error(ValidationError::new(
                    severity,
                    format!("missing field '{name}'"),
                ));
                continue;
            };

            if !type_matches(value, rule.data_type) {
                result.add_error(ValidationError::new(
                    Severity::Error,
                    format!(
                        "field '{name}' expected type {}, found {}",
                        rule.data_type,
                        value.actual_type()
                    ),
                ));
            }

            for constraint in &rule.constraints {
                if !constraint.validate(Some(value)) {
                    result.add_error(ValidationError::new(
                        Severity::Error,
                        constraint.message(name),
                    ));
                }
            }
        }

        result
    }
}

/// Field-schema validator over raw records, pluggable into the service.
pub struct FieldSchemaValidator {
    supported: Vec<ElementType>,
    schema: FieldSchema,
}

impl FieldSchemaValidator {
    /// Create a validator for the given types and schema.
    #[must_use]
    pub fn new(supported: Vec<ElementType>, schema: FieldSchema) -> Self {
        Self { supported, schema }
    }
}

impl Validator<RawRecord> for FieldSchemaValidator {
    fn supported_element_types(&self) -> &[ElementType] {
        &self.supported
    }

    fn validate(&self, item: &RawRecord, _element_type: &ElementType) -> ValidationResult {
        self.schema.evaluate(item)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Parameter, Unit};

    fn mast(parameters: Vec<Parameter>) -> Element {
        Element::new(ElementType::Mast, parameters)
    }

    #[test]
    fn missing_required_tag_is_critical() {
        let schema = standard_schema(&ElementType::Mast);
        let result = schema.evaluate(&mast(vec![]));

        assert!(!result.is_valid);
        let critical = result
            .errors
            .iter()
            .find(|e| e.severity == Severity::Critical)
            .expect("critical error");
        assert!(critical.message.contains("ELEMENT_NUMBER"));
    }

    #[test]
    fn missing_optional_tag_is_error_not_critical() {
        let schema = standard_schema(&ElementType::Mast);
        let result = schema.evaluate(&mast(vec![Parameter::tagged(
            "Nr",
            ParamValue::Text("M1".into()),
            ProcessTag::new("ELEMENT_NUMBER"),
        )]));

        assert!(!result.is_valid);
        assert!(result.errors.iter().all(|e| e.severity == Severity::Error));
    }

    #[test]
    fn out_of_range_height_is_one_error_per_constraint() {
        let schema = SchemaDefinition::new(ElementType::Mast)
            .check(ProcessTag::new("MAST_HEIGHT"))
            .check(ProcessTag::new("STATION_KM"));
        let element = mast(vec![
            Parameter::tagged(
                "Height",
                ParamValue::Float(45.0),
                ProcessTag::new("MAST_HEIGHT"),
            )
            .with_unit(Unit::Meter),
            Parameter::tagged(
                "Station",
                ParamValue::Float(-1.0),
                ProcessTag::new("STATION_KM"),
            )
            .with_unit(Unit::Kilometer),
        ]);

        let result = schema.evaluate(&element);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().any(|e| e.message.contains("MAST_HEIGHT")));
        assert!(result.errors.iter().any(|e| e.message.contains("STATION_KM")));
    }

    #[test]
    fn unit_mismatch_is_a_warning() {
        let schema = SchemaDefinition::new(ElementType::Mast).check(ProcessTag::new("MAST_HEIGHT"));
        let element = mast(vec![Parameter::tagged(
            "Height",
            ParamValue::Float(12.0),
            ProcessTag::new("MAST_HEIGHT"),
        )
        .with_unit(Unit::Millimeter)]);

        let result = schema.evaluate(&element);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn field_schema_reports_type_mismatch_by_field_name() {
        // {"id": 123, "name": "X"} against a schema requiring id as string.
        let schema = FieldSchema::new()
            .required_field("id", DataType::String)
            .field("name", DataType::String);
        let mut record = RawRecord::new();
        record.insert("id".into(), ParamValue::Int(123));
        record.insert("name".into(), ParamValue::Text("X".into()));

        let result = schema.evaluate(&record);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].severity, Severity::Error);
        assert!(result.errors[0].message.contains("'id'"));
    }

    #[test]
    fn field_schema_missing_required_field_is_critical() {
        let schema = FieldSchema::new().required_field("id", DataType::String);
        let result = schema.evaluate(&RawRecord::new());

        assert!(!result.is_valid);
        assert_eq!(result.errors[0].severity, Severity::Critical);
    }
}
