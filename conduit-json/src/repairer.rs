//! Best-effort repair of a possibly-partial JSON text (`spec.md §4.6`).

use crate::completer::complete;

/// Default nesting depth the repairer will track before giving up.
const DEFAULT_MAX_DEPTH: usize = 256;

/// Returns `text` unchanged if it already parses as JSON, otherwise attempts
/// to complete it into something that does. Returns `None` if completion
/// itself fails (depth exceeded) or the completed text still does not parse.
#[must_use]
pub fn repair(text: &str) -> Option<String> {
    if serde_json::from_str::<serde_json::Value>(text).is_ok() {
        return Some(text.to_string());
    }

    let completed = complete(text, DEFAULT_MAX_DEPTH).ok()?;
    serde_json::from_str::<serde_json::Value>(&completed).ok()?;
    Some(completed)
}
