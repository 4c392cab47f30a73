//! # Constraint Engine
//!
//! Per-parameter validation rules and the static process-tag definition table.
//!
//! Constraints are pure predicates over an optional parameter value. Absence
//! is exclusively `Required`'s concern: every other kind passes vacuously on
//! a missing value, so one missing parameter never produces a pile of
//! secondary failures.

use crate::types::{DataType, ParamValue, ProcessTag, Unit};
use regex::Regex;

/// UUID text form, as written by the linker when materializing references.
const UUID_PATTERN: &str =
    "^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$";

/// A single testable rule on a parameter's value.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Value must be present and, for text, non-empty.
    Required,
    /// Numeric value must be >= the bound. Non-numeric values pass.
    MinValue(f64),
    /// Numeric value must be <= the bound. Non-numeric values pass.
    MaxValue(f64),
    /// Text value must have at least this many characters. Non-text passes.
    MinLength(usize),
    /// Text value must match the pattern. Non-text passes.
    Regex(Regex),
    /// Named custom predicate, called only for present values.
    Custom {
        name: &'static str,
        predicate: fn(&ParamValue) -> bool,
    },
}

impl Constraint {
    /// Evaluate the constraint. Pure and total: every value, including a
    /// missing one, yields a boolean.
    #[must_use]
    pub fn validate(&self, value: Option<&ParamValue>) -> bool {
        match self {
            Self::Required => match value {
                None => false,
                Some(ParamValue::Text(s)) => !s.is_empty(),
                Some(_) => true,
            },
            Self::MinValue(min) => value
                .and_then(ParamValue::as_f64)
                .is_none_or(|v| v >= *min),
            Self::MaxValue(max) => value
                .and_then(ParamValue::as_f64)
                .is_none_or(|v| v <= *max),
            Self::MinLength(len) => value
                .and_then(ParamValue::as_text)
                .is_none_or(|s| s.chars().count() >= *len),
            Self::Regex(pattern) => value
                .and_then(ParamValue::as_text)
                .is_none_or(|s| pattern.is_match(s)),
            Self::Custom { predicate, .. } => value.is_none_or(|v| predicate(v)),
        }
    }

    /// Human-readable failure message for the given subject (parameter name
    /// or process tag).
    #[must_use]
    pub fn message(&self, subject: &str) -> String {
        match self {
            Self::Required => format!("parameter '{subject}' is required"),
            Self::MinValue(min) => {
                format!("parameter '{subject}' must be at least {min}")
            }
            Self::MaxValue(max) => {
                format!("parameter '{subject}' must be at most {max}")
            }
            Self::MinLength(len) => {
                format!("parameter '{subject}' must have at least {len} characters")
            }
            Self::Regex(pattern) => {
                format!("parameter '{subject}' must match pattern '{pattern}'")
            }
            Self::Custom { name, .. } => {
                format!("parameter '{subject}' failed check '{name}'")
            }
        }
    }
}

/// Whether a value is compatible with a declared data type.
///
/// Integers are accepted where floats are declared: SQL dumps and Excel cells
/// routinely deliver whole numbers without a decimal point.
#[must_use]
pub fn type_matches(value: &ParamValue, declared: DataType) -> bool {
    match declared {
        DataType::Float => matches!(value, ParamValue::Float(_) | ParamValue::Int(_)),
        other => value.actual_type() == other,
    }
}

// =============================================================================
// PROCESS-TAG DEFINITION TABLE
// =============================================================================

/// Fixed definition of one process tag: expected type, unit and rules.
#[derive(Debug, Clone)]
pub struct ParameterDefinition {
    pub data_type: DataType,
    pub unit: Unit,
    pub constraints: Vec<Constraint>,
}

impl ParameterDefinition {
    fn new(data_type: DataType, unit: Unit, constraints: Vec<Constraint>) -> Self {
        Self {
            data_type,
            unit,
            constraints,
        }
    }
}

/// Definition for a process tag from the static per-tag table.
///
/// Unknown tags fall back to a generic unconstrained string definition,
/// except coordinate-suffixed tags which default to float in meters.
#[must_use]
pub fn parameter_definition(tag: &ProcessTag) -> ParameterDefinition {
    match tag.as_str() {
        "ELEMENT_NUMBER" => ParameterDefinition::new(
            DataType::String,
            Unit::Unitless,
            vec![Constraint::Required, Constraint::MinLength(1)],
        ),
        "STATION_KM" => ParameterDefinition::new(
            DataType::Float,
            Unit::Kilometer,
            vec![Constraint::MinValue(0.0)],
        ),
        "MAST_HEIGHT" => ParameterDefinition::new(
            DataType::Float,
            Unit::Meter,
            vec![Constraint::MinValue(0.0), Constraint::MaxValue(30.0)],
        ),
        "MAST_REF" | "FOUNDATION_REF" | "TRACK_REF" => {
            let mut constraints = vec![Constraint::Required];
            if let Ok(pattern) = Regex::new(UUID_PATTERN) {
                constraints.push(Constraint::Regex(pattern));
            }
            ParameterDefinition::new(DataType::String, Unit::Unitless, constraints)
        }
        "FOUNDATION_TYPE" => ParameterDefinition::new(
            DataType::String,
            Unit::Unitless,
            vec![Constraint::Required, Constraint::MinLength(2)],
        ),
        "TRACK_GAUGE" => ParameterDefinition::new(
            DataType::Float,
            Unit::Millimeter,
            vec![Constraint::MinValue(1000.0), Constraint::MaxValue(1700.0)],
        ),
        "CANT" => ParameterDefinition::new(
            DataType::Float,
            Unit::Millimeter,
            vec![Constraint::MinValue(-200.0), Constraint::MaxValue(200.0)],
        ),
        "DRAINAGE_DIAMETER" => ParameterDefinition::new(
            DataType::Float,
            Unit::Millimeter,
            vec![Constraint::MinValue(0.0)],
        ),
        "CLOTHOID_START_RADIUS" | "CLOTHOID_END_RADIUS" => ParameterDefinition::new(
            DataType::Float,
            Unit::Meter,
            vec![Constraint::MinValue(0.0)],
        ),
        other if other.ends_with("_COORDINATE") => {
            ParameterDefinition::new(DataType::Float, Unit::Meter, Vec::new())
        }
        _ => ParameterDefinition::new(DataType::String, Unit::Unitless, Vec::new()),
    }
}

/// The tags the static table knows explicitly (host introspection).
#[must_use]
pub fn known_process_tags() -> Vec<ProcessTag> {
    [
        "ELEMENT_NUMBER",
        "STATION_KM",
        "MAST_HEIGHT",
        "MAST_REF",
        "FOUNDATION_REF",
        "TRACK_REF",
        "FOUNDATION_TYPE",
        "TRACK_GAUGE",
        "CANT",
        "DRAINAGE_DIAMETER",
        "CLOTHOID_START_RADIUS",
        "CLOTHOID_END_RADIUS",
    ]
    .into_iter()
    .map(ProcessTag::new)
    .collect()
}

// =============================================================================
// TESTS
// =============================================================================
