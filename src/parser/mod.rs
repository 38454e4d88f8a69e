//! Component parser
//!
//! Turns an [`AddressInput`] into a normalized [`ParsedRecord`]. No I/O.

pub mod normalize;

use address_types::{AddressComponents, AddressId, AddressInput, ComponentMap, CoordinateInput};

use crate::error::{AddressError, AddressResult};
use normalize::{clean_component, clean_raw, join_lines, locality_line, street_line};

/// Longest country code the store accepts (ISO 3166-1 alpha-2)
pub const COUNTRY_CODE_MAX_LEN: usize = 2;
/// Longest state code the store accepts
pub const STATE_CODE_MAX_LEN: usize = 3;

/// Result of parsing an assignment value
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedInput {
    Existing(AddressId),
    Record(ParsedRecord),
}

/// What kind of information a component record carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// Nothing but `raw` (and possibly `formatted`)
    RawOnly,
    /// Structured fields with a complete hierarchy, or none at all
    Structured,
    /// Some but not all of country/state/locality; stored raw-only
    Inconsistent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub components: AddressComponents,
    pub shape: RecordShape,
}

impl ParsedRecord {
    pub fn has_hierarchy(&self) -> bool {
        let c = &self.components;
        c.country.is_some() && c.state.is_some() && c.locality.is_some()
    }
}

/// Parse an assignment value into a normalized component record
pub fn parse_input(input: AddressInput) -> AddressResult<ParsedInput> {
    match input {
        AddressInput::Existing(id) => Ok(ParsedInput::Existing(id)),
        AddressInput::Raw(raw) => {
            let raw = clean_raw(Some(&raw))
                .ok_or_else(|| AddressError::invalid("address string is blank"))?;
            Ok(ParsedInput::Record(ParsedRecord {
                components: AddressComponents {
                    raw,
                    ..Default::default()
                },
                shape: RecordShape::RawOnly,
            }))
        }
        AddressInput::Components(map) => parse_components(map).map(ParsedInput::Record),
    }
}

/// Interpret a dynamic JSON value as an assignment: strings are raw
/// addresses, objects are component maps, anything else is rejected.
pub fn input_from_json(value: serde_json::Value) -> AddressResult<AddressInput> {
    match value {
        serde_json::Value::String(raw) => Ok(AddressInput::Raw(raw)),
        serde_json::Value::Object(_) => serde_json::from_value::<ComponentMap>(value)
            .map(AddressInput::Components)
            .map_err(|e| AddressError::invalid(format!("malformed component map: {}", e))),
        other => Err(AddressError::invalid(format!(
            "expected an address string or component map, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn parse_components(map: ComponentMap) -> AddressResult<ParsedRecord> {
    let latitude = parse_coordinate("latitude", map.latitude.as_ref())?;
    let longitude = parse_coordinate("longitude", map.longitude.as_ref())?;

    // Boroughs come back from geocoders as sublocality with no locality
    let locality =
        clean_component(map.locality.as_deref()).or_else(|| clean_component(map.sublocality.as_deref()));

    let mut components = AddressComponents {
        raw: clean_raw(map.raw.as_deref()).unwrap_or_default(),
        street_number: clean_component(map.street_number.as_deref()),
        route: clean_component(map.route.as_deref()),
        subpremise: clean_component(map.subpremise.as_deref()),
        locality,
        postal_code: clean_component(map.postal_code.as_deref()),
        state: clean_component(map.state.as_deref()),
        state_code: clean_component(map.state_code.as_deref()),
        country: clean_component(map.country.as_deref()),
        country_code: clean_component(map.country_code.as_deref()),
        formatted: clean_component(map.formatted.as_deref()),
        latitude,
        longitude,
    };

    if components.raw.is_empty() {
        components.raw = compose_address(&components);
    }
    if components.raw.is_empty() {
        return Err(AddressError::invalid(
            "no raw address and not enough components to form one",
        ));
    }

    let shape = classify(&components);
    if shape == RecordShape::Structured {
        components.country_code = check_code(
            "country",
            components.country.as_deref(),
            components.country_code.take(),
            COUNTRY_CODE_MAX_LEN,
        )?;
        components.state_code = check_code(
            "state",
            components.state.as_deref(),
            components.state_code.take(),
            STATE_CODE_MAX_LEN,
        )?;
    }

    Ok(ParsedRecord { components, shape })
}

fn classify(c: &AddressComponents) -> RecordShape {
    let hierarchy = [c.country.is_some(), c.state.is_some(), c.locality.is_some()];
    let present = hierarchy.iter().filter(|p| **p).count();
    if present != 0 && present != hierarchy.len() {
        return RecordShape::Inconsistent;
    }

    let structured = c.street_number.is_some()
        || c.route.is_some()
        || c.subpremise.is_some()
        || present > 0
        || c.postal_code.is_some()
        || c.state_code.is_some()
        || c.country_code.is_some()
        || c.latitude.is_some()
        || c.longitude.is_some();
    if structured {
        RecordShape::Structured
    } else {
        RecordShape::RawOnly
    }
}

/// Over-long codes are dropped when they merely repeat the name (some
/// geocoders echo "Australia" as the short name), rejected otherwise.
fn check_code(
    kind: &str,
    name: Option<&str>,
    code: Option<String>,
    max_len: usize,
) -> AddressResult<Option<String>> {
    match code {
        Some(code) if code.chars().count() > max_len => {
            if Some(code.as_str()) == name {
                Ok(None)
            } else {
                Err(AddressError::invalid(format!(
                    "invalid {} code (too long): {}",
                    kind, code
                )))
            }
        }
        other => Ok(other),
    }
}

fn parse_coordinate(field: &str, value: Option<&CoordinateInput>) -> AddressResult<Option<f64>> {
    let parsed = match value {
        None => return Ok(None),
        Some(CoordinateInput::Number(n)) => *n,
        Some(CoordinateInput::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<f64>()
                .map_err(|_| AddressError::invalid(format!("invalid value for {}", field)))?
        }
    };
    if parsed.is_finite() {
        Ok(Some(parsed))
    } else {
        Err(AddressError::invalid(format!("invalid value for {}", field)))
    }
}

/// Single-line address built from structured components, subpremise included
pub fn compose_address(c: &AddressComponents) -> String {
    let street = street_line(
        c.street_number.as_deref(),
        c.route.as_deref(),
        c.subpremise.as_deref(),
    );
    let locality = locality_line(
        c.locality.as_deref(),
        c.state.as_deref().or(c.state_code.as_deref()),
        c.postal_code.as_deref(),
        c.country.as_deref().or(c.country_code.as_deref()),
    );
    join_lines(&street, &locality)
}

/// Query string for a geocoder lookup: the structured address when there is
/// one, the raw string otherwise.
pub fn geocode_query(c: &AddressComponents) -> String {
    if c.street_number.is_some() || c.route.is_some() {
        compose_address(c)
    } else {
        c.raw.clone()
    }
}

/// Classify components that came back from a geocoder. Over-long codes are
/// dropped rather than rejected: the caller never supplied them.
pub fn settle_geocoded(mut components: AddressComponents) -> ParsedRecord {
    let shape = classify(&components);
    if shape == RecordShape::Structured {
        components.country_code = components
            .country_code
            .filter(|code| code.chars().count() <= COUNTRY_CODE_MAX_LEN);
        components.state_code = components
            .state_code
            .filter(|code| code.chars().count() <= STATE_CODE_MAX_LEN);
    }
    ParsedRecord { components, shape }
}
