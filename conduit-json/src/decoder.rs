//! Incremental decoding of a growing JSON buffer (`spec.md §4.6`).

use crate::completer::{complete, CompleterError};

/// Default nesting depth the decoder will track before giving up.
const DEFAULT_MAX_DEPTH: usize = 256;

/// The result of attempting to decode a possibly-partial JSON buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    /// The buffer parsed exactly as given; no completion was needed.
    Exact(serde_json::Value),
    /// The buffer needed completion before it would parse; the value is a
    /// best-effort snapshot and may still change as more input arrives.
    Partial(serde_json::Value),
    /// Nothing parseable yet (e.g. an empty or all-whitespace buffer that
    /// completed to `{}` — still reported as partial rather than exact,
    /// since it carries no information from the caller's input).
    Empty,
}

impl DecodeOutcome {
    /// The decoded value, regardless of whether it was exact or partial.
    #[must_use]
    pub fn value(&self) -> Option<&serde_json::Value> {
        match self {
            DecodeOutcome::Exact(v) | DecodeOutcome::Partial(v) => Some(v),
            DecodeOutcome::Empty => None,
        }
    }

    /// Whether this decode reflects the buffer's final, complete form.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, DecodeOutcome::Exact(_))
    }
}

/// Decodes `buf`, a possibly-partial JSON text, reporting whether the
/// result came from an exact parse or from best-effort completion.
///
/// Returns `Err` only when the bracket nesting in `buf` exceeds
/// `max_depth`; a buffer that completes but still fails to parse (e.g. a
/// dangling unmatched closing bracket sequence) reports [`DecodeOutcome::Empty`].
pub fn decode_incremental(buf: &str, max_depth: usize) -> Result<DecodeOutcome, CompleterError> {
    if buf.trim().is_empty() {
        return Ok(DecodeOutcome::Empty);
    }

    if let Ok(value) = serde_json::from_str(buf) {
        return Ok(DecodeOutcome::Exact(value));
    }

    let completed = complete(buf, max_depth)?;
    match serde_json::from_str(&completed) {
        Ok(value) => Ok(DecodeOutcome::Partial(value)),
        Err(_) => Ok(DecodeOutcome::Empty),
    }
}

/// [`decode_incremental`] with the default depth limit.
pub fn decode(buf: &str) -> Result<DecodeOutcome, CompleterError> {
    decode_incremental(buf, DEFAULT_MAX_DEPTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_is_empty_outcome() {
        assert_eq!(decode("").unwrap(), DecodeOutcome::Empty);
        assert_eq!(decode("   ").unwrap(), DecodeOutcome::Empty);
    }

    #[test]
    fn exact_json_is_reported_exact_and_complete() {
        let outcome = decode(r#"{"a":1}"#).unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.value().unwrap()["a"], 1);
    }

    #[test]
    fn truncated_object_is_reported_partial_and_incomplete() {
        let outcome = decode(r#"{"a": 1, "b": "tex"#).unwrap();
        assert!(!outcome.is_complete());
        assert_eq!(outcome.value().unwrap()["a"], 1);
        assert_eq!(outcome.value().unwrap()["b"], "tex");
    }

    #[test]
    fn growing_buffer_eventually_becomes_exact() {
        let chunks = [r#"{"name": "Bo"#, r#"{"name": "Bob"}"#];
        let first = decode(chunks[0]).unwrap();
        assert!(!first.is_complete());
        let second = decode(chunks[1]).unwrap();
        assert!(second.is_complete());
        assert_eq!(second.value().unwrap()["name"], "Bob");
    }

    #[test]
    fn depth_exceeded_surfaces_as_error() {
        let deeply_nested = "[".repeat(10);
        assert!(decode_incremental(&deeply_nested, 5).is_err());
    }
}
