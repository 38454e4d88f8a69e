//! Text normalization for address components
//!
//! - Field cleanup: trim, collapse whitespace, blank to absent
//! - Comparison keys for street fields and subpremise designators
//! - Address line composition for queries and display

use unicode_normalization::UnicodeNormalization;

/// Unit designators that carry no identity of their own ("Suite 300" == "#300")
const SUBPREMISE_DESIGNATORS: &[&str] = &[
    "apartment", "apt", "unit", "suite", "ste", "flat", "room", "rm", "no", "number",
];

/// Trim a component and collapse internal whitespace; blank becomes `None`.
pub fn clean_component(value: Option<&str>) -> Option<String> {
    let collapsed = value?.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Trim only. `raw` is kept as submitted apart from surrounding whitespace.
pub fn clean_raw(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Comparison key for street numbers and routes: NFKC, lowercase,
/// punctuation dropped, whitespace collapsed.
pub fn comparison_key(s: &str) -> String {
    let folded: String = s
        .nfkc()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comparison key for a subpremise: designator words and `#` are ignored.
///
/// ```
/// use address_resolver::parser::normalize::subpremise_key;
///
/// assert_eq!(subpremise_key("Suite 300"), "300");
/// assert_eq!(subpremise_key("#300"), "300");
/// assert_eq!(subpremise_key("Apt. 4B"), "4b");
/// ```
pub fn subpremise_key(s: &str) -> String {
    let key = comparison_key(s);
    let tokens: Vec<&str> = key
        .split_whitespace()
        .filter(|t| !SUBPREMISE_DESIGNATORS.contains(t))
        .collect();
    if tokens.is_empty() {
        // A bare designator ("Unit") is its own identity
        key
    } else {
        tokens.join(" ")
    }
}

pub fn same_subpremise(a: &str, b: &str) -> bool {
    subpremise_key(a) == subpremise_key(b)
}

/// Whether a unit already names its own designator ("Suite 300", "#300")
pub fn has_designator(unit: &str) -> bool {
    let unit = unit.trim_start();
    if unit.starts_with('#') {
        return true;
    }
    unit.split_whitespace()
        .next()
        .map(|first| first.trim_end_matches('.').to_lowercase())
        .is_some_and(|first| SUBPREMISE_DESIGNATORS.contains(&first.as_str()))
}

/// " #300", or " Suite 300" when the unit carries its own designator
pub fn unit_suffix(unit: &str) -> String {
    if has_designator(unit) {
        format!(" {}", unit)
    } else {
        format!(" #{}", unit)
    }
}

/// "1 Some Street #300". Empty when neither number nor route is known.
pub fn street_line(
    street_number: Option<&str>,
    route: Option<&str>,
    subpremise: Option<&str>,
) -> String {
    let mut line = String::new();
    if let Some(number) = street_number {
        line.push_str(number);
    }
    if let Some(route) = route {
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(route);
    }
    if let Some(subpremise) = subpremise {
        // USPS prefers STE/APT but accepts '#' when the unit type is unknown
        if !line.is_empty() {
            line.push_str(&unit_suffix(subpremise));
        }
    }
    line
}

/// "Melbourne, Victoria 3000, Australia", skipping whatever is absent.
pub fn locality_line(
    locality: Option<&str>,
    state: Option<&str>,
    postal_code: Option<&str>,
    country: Option<&str>,
) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(locality) = locality {
        parts.push(locality.to_string());
    }
    let region = match (state, postal_code) {
        (Some(state), Some(postal)) => Some(format!("{} {}", state, postal)),
        (Some(state), None) => Some(state.to_string()),
        (None, Some(postal)) => Some(postal.to_string()),
        (None, None) => None,
    };
    if let Some(region) = region {
        parts.push(region);
    }
    if let Some(country) = country {
        parts.push(country.to_string());
    }
    parts.join(", ")
}

/// Join a street line and a locality line with ", ", skipping empties.
pub fn join_lines(street: &str, locality: &str) -> String {
    match (street.is_empty(), locality.is_empty()) {
        (false, false) => format!("{}, {}", street, locality),
        (false, true) => street.to_string(),
        (true, false) => locality.to_string(),
        (true, true) => String::new(),
    }
}
