//! Subpremise substitution in formatted address text

use regex::{Captures, Regex};

use crate::parser::normalize::{has_designator, unit_suffix};

/// Replace the unit designator of `formatted` with `wanted`.
///
/// `current` is the subpremise the geocoder reported. Its occurrence is found
/// as `#4`, `# 4` or a designator word followed by it (`Suite 4`, `Apt. 4`).
/// When there is none, `#wanted` is appended to the street line (the text
/// before the first comma). A `wanted` that names its own designator
/// ("Suite 300") replaces the matched one instead of following it.
pub fn substitute_subpremise(formatted: &str, current: Option<&str>, wanted: &str) -> String {
    if let Some(current) = current {
        if let Some(replaced) = replace_designated(formatted, current, wanted) {
            return replaced;
        }
    }
    insert_after_street_line(formatted, wanted)
}

/// The unit written in free text: the token after `#` or a designator word.
///
/// "10 Main St #300, Springfield" gives "300"; "Apt. 4-B, 10 Main St" gives
/// "4-B".
pub fn find_subpremise(text: &str) -> Option<String> {
    let re = Regex::new(
        r"(?i)(?:#\s*|\b(?:apartment|apt|unit|suite|ste|flat|room|rm)\.?\s+)([0-9a-z][0-9a-z-]*)\b",
    )
    .map_err(|e| tracing::debug!(error = %e, "Unusable subpremise pattern"))
    .ok()?;
    re.captures(text).map(|caps| caps[1].to_string())
}

fn replace_designated(formatted: &str, current: &str, wanted: &str) -> Option<String> {
    let pattern = format!(
        r"(?i)(#\s*|\b(?:apartment|apt|unit|suite|ste|flat|room|rm)\.?\s+){}\b",
        regex::escape(current)
    );
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            tracing::debug!(error = %e, "Unusable subpremise pattern");
            return None;
        }
    };
    if !re.is_match(formatted) {
        return None;
    }
    let own_designator = has_designator(wanted);
    Some(
        re.replacen(formatted, 1, |caps: &Captures| {
            if own_designator {
                wanted.to_string()
            } else {
                format!("{}{}", &caps[1], wanted)
            }
        })
        .into_owned(),
    )
}

fn insert_after_street_line(formatted: &str, wanted: &str) -> String {
    let suffix = unit_suffix(wanted);
    match formatted.split_once(',') {
        Some((street, rest)) => format!("{}{},{}", street.trim_end(), suffix, rest),
        None if formatted.trim().is_empty() => suffix.trim_start().to_string(),
        None => format!("{}{}", formatted.trim_end(), suffix),
    }
}
