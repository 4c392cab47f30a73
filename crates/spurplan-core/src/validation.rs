//! # Validation Service
//!
//! Multi-validator orchestration, result aggregation and reporting.
//!
//! Validation failures are never exceptions: they are first-class error and
//! warning values with a severity. The service runs every registered
//! validator that claims an element type, merges results in registration
//! order, and condenses batches into a structured report. Whether an invalid
//! element is persisted anyway is host policy, not decided here.

use crate::types::ElementType;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

// =============================================================================
// SEVERITY & RESULT VALUES
// =============================================================================

/// Severity of a validation finding, ascending. `Error` and `Critical` flip
/// a result to invalid; `Info` and `Warning` never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub severity: Severity,
    pub message: String,
    /// Where the failure occurred, e.g. `"MAST 7f00.../MAST_HEIGHT"`.
    pub context: Option<String>,
}

impl ValidationError {
    /// Create an error with the given severity.
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            context: None,
        }
    }

    /// Attach a context string.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// A non-blocking validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationWarning {
    pub message: String,
    pub context: Option<String>,
}

impl ValidationWarning {
    /// Create a warning.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
        }
    }
}

/// Outcome of validating one element or record.
///
/// Valid until an `Error`- or `Critical`-severity error is added.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    /// A fresh, valid, empty result.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Record an error. Only `Error` and `Critical` severities invalidate.
    pub fn add_error(&mut self, error: ValidationError) {
        if error.severity >= Severity::Error {
            self.is_valid = false;
        }
        self.errors.push(error);
    }

    /// Record a warning. Never affects validity.
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Combine two results: validity is the conjunction, error and warning
    /// lists concatenate in order.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.is_valid = self.is_valid && other.is_valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self
    }
}

// =============================================================================
// VALIDATOR TRAIT & SERVICE
// =============================================================================

/// A pluggable validator over items of type `T`.
///
/// The service treats implementations as opaque and order-stable.
pub trait Validator<T> {
    /// The element types this validator covers.
    fn supported_element_types(&self) -> &[ElementType];

    /// Whether this validator applies to the given type.
    fn can_validate(&self, element_type: &ElementType) -> bool {
        self.supported_element_types()
            .iter()
            .any(|t| t == element_type)
    }

    /// Validate one item of the given element type.
    fn validate(&self, item: &T, element_type: &ElementType) -> ValidationResult;
}

/// Coordinates registered validators over single items and collections.
pub struct ValidationService<T> {
    validators: Vec<Box<dyn Validator<T>>>,
}

impl<T> Default for ValidationService<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ValidationService<T> {
    /// Create a service with no validators.
    #[must_use]
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// Append a validator. No deduplication: registering twice runs twice.
    pub fn register_validator(&mut self, validator: impl Validator<T> + 'static) {
        self.validators.push(Box::new(validator));
    }

    /// Number of registered validators.
    #[must_use]
    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    /// Validate one item with every validator that claims its type.
    ///
    /// Missing coverage is a warning, not a failure: the result stays valid
    /// and carries a single "no validator" warning.
    #[must_use]
    pub fn validate_element(&self, item: &T, element_type: &ElementType) -> ValidationResult {
        let matching: Vec<&dyn Validator<T>> = self
            .validators
            .iter()
            .filter(|v| v.can_validate(element_type))
            .map(|v| v.as_ref())
            .collect();

        if matching.is_empty() {
            warn!(element_type = %element_type, "no validator registered for element type");
            let mut result = ValidationResult::new();
            result.add_warning(ValidationWarning::new(format!(
                "no validator registered for element type '{element_type}'"
            )));
            return result;
        }

        matching
            .into_iter()
            .map(|v| v.validate(item, element_type))
            .fold(ValidationResult::new(), ValidationResult::merge)
    }

    /// Validate each item independently, preserving input order.
    ///
    /// One invalid item never short-circuits its siblings.
    #[must_use]
    pub fn validate_collection(
        &self,
        items: &[T],
        element_type: &ElementType,
    ) -> Vec<ValidationResult> {
        let mut results = Vec::with_capacity(items.len());
        let mut valid = 0usize;
        for (index, item) in items.iter().enumerate() {
            let result = self.validate_element(item, element_type);
            if result.is_valid {
                valid += 1;
            }
            debug!(
                element_type = %element_type,
                valid,
                seen = index + 1,
                "collection validation progress"
            );
            results.push(result);
        }
        info!(
            element_type = %element_type,
            valid,
            total = items.len(),
            "collection validated"
        );
        results
    }

    /// Condense a batch of results into a summary report.
    #[must_use]
    pub fn create_validation_report(
        &self,
        element_type: &ElementType,
        results: &[ValidationResult],
    ) -> ValidationReport {
        ValidationReport::from_results(element_type, results)
    }
}

// =============================================================================
// REPORTING
// =============================================================================

/// Cap on example contexts kept per distinct error message.
const MAX_ERROR_EXAMPLES: usize = 5;

/// One distinct error message aggregated across a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorTypeSummary {
    pub message: String,
    pub count: usize,
    /// Worst severity observed for this message.
    pub severity: Severity,
    /// Up to [`MAX_ERROR_EXAMPLES`] contexts where the message occurred.
    pub examples: Vec<String>,
}

/// Summary of one validated batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub element_type: String,
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    /// `valid / total`; an empty batch reports 0.
    pub validation_rate: f64,
    /// Distinct error messages, most frequent first.
    pub error_types: Vec<ErrorTypeSummary>,
}

impl ValidationReport {
    /// Build the report for a batch of per-item results.
    #[must_use]
    pub fn from_results(element_type: &ElementType, results: &[ValidationResult]) -> Self {
        let total = results.len();
        let valid = results.iter().filter(|r| r.is_valid).count();
        let validation_rate = if total == 0 {
            0.0
        } else {
            valid as f64 / total as f64
        };

        struct Aggregate {
            count: usize,
            severity: Severity,
            examples: Vec<String>,
        }

        let mut by_message: BTreeMap<String, Aggregate> = BTreeMap::new();
        for error in results.iter().flat_map(|r| &r.errors) {
            let entry = by_message
                .entry(error.message.clone())
                .or_insert_with(|| Aggregate {
                    count: 0,
                    severity: error.severity,
                    examples: Vec::new(),
                });
            entry.count += 1;
            entry.severity = entry.severity.max(error.severity);
            if entry.examples.len() < MAX_ERROR_EXAMPLES {
                if let Some(context) = &error.context {
                    entry.examples.push(context.clone());
                }
            }
        }

        let mut error_types: Vec<ErrorTypeSummary> = by_message
            .into_iter()
            .map(|(message, agg)| ErrorTypeSummary {
                message,
                count: agg.count,
                severity: agg.severity,
                examples: agg.examples,
            })
            .collect();
        error_types.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.message.cmp(&b.message))
        });

        Self {
            element_type: element_type.name().to_string(),
            total,
            valid,
            invalid: total - valid,
            validation_rate,
            error_types,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysFails;

    impl Validator<i64> for AlwaysFails {
        fn supported_element_types(&self) -> &[ElementType] {
            std::slice::from_ref(&ElementType::Mast)
        }

        fn validate(&self, _item: &i64, _element_type: &ElementType) -> ValidationResult {
            let mut result = ValidationResult::new();
            result.add_error(ValidationError::new(Severity::Error, "always fails"));
            result
        }
    }

    #[test]
    fn severity_ordering_is_ascending() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn warnings_do_not_invalidate() {
        let mut result = ValidationResult::new();
        result.add_warning(ValidationWarning::new("heads up"));
        result.add_error(ValidationError::new(Severity::Info, "just a note"));
        assert!(result.is_valid);

        result.add_error(ValidationError::new(Severity::Error, "broken"));
        assert!(!result.is_valid);
    }

    #[test]
    fn merge_preserves_order_and_ands_validity() {
        let mut a = ValidationResult::new();
        a.add_error(ValidationError::new(Severity::Error, "first"));
        let mut b = ValidationResult::new();
        b.add_error(ValidationError::new(Severity::Info, "second"));

        let merged = a.merge(b);
        assert!(!merged.is_valid);
        let messages: Vec<&str> = merged.errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn missing_validator_is_a_warning_not_a_failure() {
        let service: ValidationService<i64> = ValidationService::new();
        let result = service.validate_element(&1, &ElementType::Track);

        assert!(result.is_valid);
        assert_eq!(result.errors.len(), 0);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn registered_validator_runs_for_supported_type_only() {
        let mut service = ValidationService::new();
        service.register_validator(AlwaysFails);

        let mast = service.validate_element(&1, &ElementType::Mast);
        assert!(!mast.is_valid);

        let track = service.validate_element(&1, &ElementType::Track);
        assert!(track.is_valid);
        assert_eq!(track.warnings.len(), 1);
    }

    #[test]
    fn report_aggregates_and_caps_examples() {
        let mut results = Vec::new();
        for i in 0..8 {
            let mut result = ValidationResult::new();
            result.add_error(
                ValidationError::new(Severity::Error, "gauge out of range")
                    .with_context(format!("TRACK {i}")),
            );
            results.push(result);
        }
        let mut rare = ValidationResult::new();
        rare.add_error(ValidationError::new(Severity::Critical, "missing number"));
        results.push(rare);

        let report = ValidationReport::from_results(&ElementType::Track, &results);
        assert_eq!(report.total, 9);
        assert_eq!(report.valid, 0);
        assert_eq!(report.error_types.len(), 2);

        // Most frequent first, examples capped at 5.
        assert_eq!(report.error_types[0].message, "gauge out of range");
        assert_eq!(report.error_types[0].count, 8);
        assert_eq!(report.error_types[0].examples.len(), 5);
        assert_eq!(report.error_types[1].severity, Severity::Critical);
    }

    #[test]
    fn empty_batch_reports_zero_rate() {
        let report = ValidationReport::from_results(&ElementType::Mast, &[]);
        assert_eq!(report.total, 0);
        assert_eq!(report.validation_rate, 0.0);
    }
}
