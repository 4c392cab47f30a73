//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::input::{ElementDto, LinkConfig};
use serde::Serialize;
use spurplan_core::{
    Element, ElementLinker, ElementStore, ElementType, LinkDefinition, RelationshipManager,
    SchemaValidator, SpurplanError, ValidationReport, ValidationResult, ValidationService,
    known_process_tags, parameter_definition,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for element batches (100 MB).
///
/// This prevents memory exhaustion from malicious or accidental large files.
const MAX_BATCH_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum file size for link configurations (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), SpurplanError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| SpurplanError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(SpurplanError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an input file path.
///
/// Canonicalizes the path to resolve symlinks and "..", which also validates
/// existence, and ensures the path is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, SpurplanError> {
    let canonical = path.canonicalize().map_err(|e| {
        SpurplanError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(SpurplanError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate an output path: the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, SpurplanError> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        SpurplanError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    let filename = path
        .file_name()
        .ok_or_else(|| SpurplanError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// INPUT LOADING
// =============================================================================

/// Load and convert an element batch from a JSON file.
fn load_elements(path: &Path) -> Result<Vec<Element>, SpurplanError> {
    let validated_path = validate_file_path(path)?;
    validate_file_size(&validated_path, MAX_BATCH_FILE_SIZE)?;

    let contents = std::fs::read(&validated_path)
        .map_err(|e| SpurplanError::IoError(format!("Read file: {}", e)))?;
    let dtos: Vec<ElementDto> = serde_json::from_slice(&contents)
        .map_err(|e| SpurplanError::SerializationError(format!("Parse element batch: {}", e)))?;

    tracing::info!(elements = dtos.len(), file = %path.display(), "element batch loaded");
    Ok(dtos.into_iter().map(Element::from).collect())
}

/// Load and convert a link configuration from a TOML file.
fn load_link_definitions(path: &Path) -> Result<Vec<LinkDefinition>, SpurplanError> {
    let validated_path = validate_file_path(path)?;
    validate_file_size(&validated_path, MAX_CONFIG_FILE_SIZE)?;

    let contents = std::fs::read_to_string(&validated_path)
        .map_err(|e| SpurplanError::IoError(format!("Read file: {}", e)))?;
    let config: LinkConfig = toml::from_str(&contents).map_err(|e| {
        SpurplanError::SerializationError(format!("Parse link configuration: {}", e))
    })?;

    config
        .link
        .into_iter()
        .map(LinkDefinition::try_from)
        .collect()
}

/// Write JSON either to a validated output path or to stdout.
fn emit_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<(), SpurplanError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| SpurplanError::SerializationError(format!("Render JSON: {}", e)))?;
    match output {
        Some(path) => {
            let validated = validate_output_path(path)?;
            std::fs::write(&validated, rendered)
                .map_err(|e| SpurplanError::IoError(format!("Write file: {}", e)))?;
            tracing::info!(file = %validated.display(), "report written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

// =============================================================================
// LINK COMMAND
// =============================================================================

/// Summary of one linking run.
#[derive(Debug, Serialize)]
struct LinkRunSummary {
    elements: usize,
    link_definitions: usize,
    references_created: u64,
    back_references_applied: u64,
    reports: Vec<ValidationReport>,
}

/// Link an element batch, reconcile bidirectional references and validate
/// the result. Returns the process exit code.
pub fn cmd_link(
    file: &Path,
    links: &Path,
    strict: bool,
    output: Option<&Path>,
    elements_out: Option<&Path>,
) -> Result<i32, SpurplanError> {
    let definitions = load_link_definitions(links)?;
    let elements = load_elements(file)?;

    let mut store = ElementStore::new();
    let ids: Vec<_> = elements.into_iter().map(|e| store.insert(e)).collect();

    // Phase 1: index everything, then resolve per element.
    let mut linker = ElementLinker::new();
    for definition in definitions {
        linker.register_link_definition(definition);
    }
    for &id in &ids {
        linker.register_element(&store, id)?;
    }
    for &id in &ids {
        linker.process_element_links(&mut store, id)?;
    }
    let references_created = linker.finalize_links();

    // Phase 2: close the bidirectional relation over the whole batch.
    let mut manager = RelationshipManager::new();
    manager.establish_bidirectional_ref_for_subset(&mut store, &ids);

    // Phase 3: validate the linked elements per type.
    let mut service: ValidationService<Element> = ValidationService::new();
    service.register_validator(SchemaValidator::with_standard_schemas());

    let mut results_by_type: BTreeMap<ElementType, Vec<ValidationResult>> = BTreeMap::new();
    for element in store.iter() {
        let result = service.validate_element(element, element.element_type());
        results_by_type
            .entry(element.element_type().clone())
            .or_default()
            .push(result);
    }

    let mut invalid = 0usize;
    let reports: Vec<ValidationReport> = results_by_type
        .iter()
        .map(|(element_type, results)| {
            let report = service.create_validation_report(element_type, results);
            invalid += report.invalid;
            report
        })
        .collect();

    let summary = LinkRunSummary {
        elements: store.len(),
        link_definitions: linker.link_definition_count(),
        references_created,
        back_references_applied: manager.back_references_applied(),
        reports,
    };
    emit_json(&summary, output)?;

    if let Some(path) = elements_out {
        let linked: Vec<&Element> = store.iter().collect();
        emit_json(&linked, Some(path))?;
    }

    if strict && invalid > 0 {
        tracing::error!(invalid, "strict mode: batch rejected");
        return Ok(2);
    }
    Ok(0)
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Validate an element batch against the built-in schemas, without linking.
pub fn cmd_validate(file: &Path, output: Option<&Path>) -> Result<(), SpurplanError> {
    let elements = load_elements(file)?;

    let mut by_type: BTreeMap<ElementType, Vec<Element>> = BTreeMap::new();
    for element in elements {
        by_type
            .entry(element.element_type().clone())
            .or_default()
            .push(element);
    }

    let mut service: ValidationService<Element> = ValidationService::new();
    service.register_validator(SchemaValidator::with_standard_schemas());

    let reports: Vec<ValidationReport> = by_type
        .iter()
        .map(|(element_type, group)| {
            let results = service.validate_collection(group, element_type);
            service.create_validation_report(element_type, &results)
        })
        .collect();

    emit_json(&reports, output)
}

// =============================================================================
// TAGS COMMAND
// =============================================================================

/// List the known process tags and their rules.
pub fn cmd_tags(json_mode: bool) {
    let tags = known_process_tags();

    if json_mode {
        let rows: Vec<serde_json::Value> = tags
            .iter()
            .map(|tag| {
                let definition = parameter_definition(tag);
                serde_json::json!({
                    "tag": tag.as_str(),
                    "data_type": definition.data_type.to_string(),
                    "unit": definition.unit.to_string(),
                    "constraints": definition.constraints.len(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
        );
        return;
    }

    println!("Known process tags:");
    println!();
    for tag in &tags {
        let definition = parameter_definition(tag);
        println!(
            "  {:<24} {:<8} {:<4} {} constraint(s)",
            tag.as_str(),
            definition.data_type.to_string(),
            definition.unit.to_string(),
            definition.constraints.len()
        );
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(contents.as_bytes()).expect("write");
        path
    }

    #[test]
    fn link_run_end_to_end() {
        let dir = tempfile::tempdir().expect("tempdir");
        let elements = write_temp(
            &dir,
            "elements.json",
            r#"[
                {"element_type": "MAST", "parameters": [
                    {"name": "ID", "value": "M1"},
                    {"name": "Nr", "value": "M1", "process_tag": "ELEMENT_NUMBER"}
                ]},
                {"element_type": "FOUNDATION", "parameters": [
                    {"name": "MastID", "value": "M1"},
                    {"name": "Nr", "value": "F1", "process_tag": "ELEMENT_NUMBER"},
                    {"name": "Type", "value": "block", "process_tag": "FOUNDATION_TYPE"}
                ]}
            ]"#,
        );
        let links = write_temp(
            &dir,
            "links.toml",
            r#"
            [[link]]
            source_type = "FOUNDATION"
            target_type = "MAST"
            source_param = "MastID"
            target_param = "ID"
            bidirectional = true
            source_uuid_param = "MAST_REF"
            "#,
        );
        let report_path = dir.path().join("report.json");

        let code = cmd_link(&elements, &links, false, Some(&report_path), None).expect("run");
        assert_eq!(code, 0);

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report_path).expect("read"))
                .expect("parse");
        assert_eq!(report["elements"], 2);
        assert_eq!(report["references_created"], 1);
        assert_eq!(report["back_references_applied"], 1);
    }

    #[test]
    fn strict_mode_rejects_invalid_batches() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Mast without its required ELEMENT_NUMBER.
        let elements = write_temp(
            &dir,
            "elements.json",
            r#"[{"element_type": "MAST", "parameters": [{"name": "ID", "value": "M1"}]}]"#,
        );
        let links = write_temp(&dir, "links.toml", "");
        let report_path = dir.path().join("report.json");

        let code = cmd_link(&elements, &links, true, Some(&report_path), None).expect("run");
        assert_eq!(code, 2);
    }

    #[test]
    fn malformed_batch_is_a_serialization_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let elements = write_temp(&dir, "elements.json", "{not json");

        let result = load_elements(&elements);
        assert!(matches!(
            result,
            Err(SpurplanError::SerializationError(_))
        ));
    }

    #[test]
    fn missing_input_file_is_an_io_error() {
        let result = load_elements(Path::new("/nonexistent/elements.json"));
        assert!(matches!(result, Err(SpurplanError::IoError(_))));
    }
}
