//! # Input DTOs
//!
//! Serde-facing shapes for element batches (JSON) and link configurations
//! (TOML), plus their conversion into core types. Malformed definitions are
//! rejected here, at load time, so the linking run itself never sees them.

use serde::Deserialize;
use spurplan_core::{
    Component, Element, ElementType, LinkDefinition, ParamValue, Parameter, ProcessTag,
    SpurplanError, Unit,
};

// =============================================================================
// ELEMENT BATCH (JSON)
// =============================================================================

/// One converted element as delivered by an upstream converter.
#[derive(Debug, Deserialize)]
pub struct ElementDto {
    pub element_type: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDto>,
}

/// One parameter row of a converted element.
#[derive(Debug, Deserialize)]
pub struct ParameterDto {
    pub name: String,
    pub value: ParamValue,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub process_tag: Option<String>,
    #[serde(default)]
    pub components: Vec<String>,
}

/// Map a converter's type name onto the core element type.
///
/// Unknown names are preserved as-is rather than rejected: converters for
/// exotic element catalogs must still round-trip.
#[must_use]
pub fn element_type_from_name(name: &str) -> ElementType {
    match name {
        "FOUNDATION" => ElementType::Foundation,
        "MAST" => ElementType::Mast,
        "TRACK" => ElementType::Track,
        "DRAINAGE" => ElementType::Drainage,
        "CABLE" => ElementType::Cable,
        "SIGNAL_POST" => ElementType::SignalPost,
        other => ElementType::Other(other.to_string()),
    }
}

/// Map a unit string onto the core unit.
#[must_use]
pub fn unit_from_name(name: &str) -> Unit {
    match name {
        "" | "-" => Unit::Unitless,
        "m" => Unit::Meter,
        "mm" => Unit::Millimeter,
        "km" => Unit::Kilometer,
        "deg" => Unit::Degree,
        "%" => Unit::Percent,
        other => Unit::Other(other.to_string()),
    }
}

impl From<ParameterDto> for Parameter {
    fn from(dto: ParameterDto) -> Self {
        let mut parameter = match dto.process_tag {
            Some(tag) => Parameter::tagged(dto.name, dto.value, ProcessTag::new(tag)),
            None => Parameter::new(dto.name, dto.value),
        };
        if let Some(unit) = dto.unit {
            parameter = parameter.with_unit(unit_from_name(&unit));
        }
        for component in dto.components {
            parameter = parameter.with_component(Component(component));
        }
        parameter
    }
}

impl From<ElementDto> for Element {
    fn from(dto: ElementDto) -> Self {
        let element_type = element_type_from_name(&dto.element_type);
        let parameters = dto.parameters.into_iter().map(Parameter::from).collect();
        Element::new(element_type, parameters)
    }
}

// =============================================================================
// LINK CONFIGURATION (TOML)
// =============================================================================

/// Top-level link configuration file: a list of `[[link]]` tables.
#[derive(Debug, Deserialize)]
pub struct LinkConfig {
    #[serde(default)]
    pub link: Vec<LinkDto>,
}

/// One declarative link rule.
#[derive(Debug, Deserialize)]
pub struct LinkDto {
    pub source_type: String,
    pub target_type: String,
    pub source_param: String,
    pub target_param: String,
    #[serde(default)]
    pub bidirectional: bool,
    #[serde(default)]
    pub source_uuid_param: Option<String>,
}

impl TryFrom<LinkDto> for LinkDefinition {
    type Error = SpurplanError;

    fn try_from(dto: LinkDto) -> Result<Self, Self::Error> {
        let mut definition = LinkDefinition::new(
            element_type_from_name(&dto.source_type),
            element_type_from_name(&dto.target_type),
            dto.source_param,
            dto.target_param,
        )?;
        if dto.bidirectional {
            definition = definition.bidirectional();
        }
        if let Some(tag) = dto.source_uuid_param {
            definition = definition.with_source_uuid_param(ProcessTag::new(tag));
        }
        Ok(definition)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use spurplan_core::DataType;

    #[test]
    fn element_batch_parses_with_tagged_parameters() {
        let json = r#"[
            {
                "element_type": "MAST",
                "parameters": [
                    {"name": "Nr", "value": "M1", "process_tag": "ELEMENT_NUMBER"},
                    {"name": "Height", "value": 12.5, "unit": "m", "process_tag": "MAST_HEIGHT"}
                ]
            }
        ]"#;

        let dtos: Vec<ElementDto> = serde_json::from_str(json).expect("parse");
        let element = Element::from(dtos.into_iter().next().expect("one element"));

        assert_eq!(element.element_type(), &ElementType::Mast);
        let height = element
            .parameter_by_tag(&ProcessTag::new("MAST_HEIGHT"))
            .expect("height");
        assert_eq!(height.unit(), &Unit::Meter);
        assert_eq!(height.data_type(), DataType::Float);
    }

    #[test]
    fn whole_numbers_deserialize_as_integers() {
        let json = r#"{"name": "Count", "value": 3}"#;
        let dto: ParameterDto = serde_json::from_str(json).expect("parse");
        assert_eq!(dto.value, ParamValue::Int(3));
    }

    #[test]
    fn unknown_type_names_are_preserved() {
        assert_eq!(
            element_type_from_name("NOISE_BARRIER"),
            ElementType::Other("NOISE_BARRIER".to_string())
        );
    }

    #[test]
    fn link_config_parses_toml_tables() {
        let config: LinkConfig = toml::from_str(
            r#"
            [[link]]
            source_type = "FOUNDATION"
            target_type = "MAST"
            source_param = "MastID"
            target_param = "ID"
            bidirectional = true
            source_uuid_param = "MAST_REF"

            [[link]]
            source_type = "MAST"
            target_type = "TRACK"
            source_param = "TrackID"
            target_param = "ID"
            "#,
        )
        .expect("parse");

        assert_eq!(config.link.len(), 2);
        let first = LinkDefinition::try_from(config.link.into_iter().next().expect("first"))
            .expect("convert");
        assert!(first.is_bidirectional());
        assert_eq!(
            first.source_uuid_param(),
            Some(&ProcessTag::new("MAST_REF"))
        );
    }

    #[test]
    fn empty_param_names_are_rejected_at_load() {
        let dto = LinkDto {
            source_type: "FOUNDATION".into(),
            target_type: "MAST".into(),
            source_param: String::new(),
            target_param: "ID".into(),
            bidirectional: false,
            source_uuid_param: None,
        };
        assert!(LinkDefinition::try_from(dto).is_err());
    }
}
