//! Turns an in-flight, possibly truncated JSON string into a parseable one.
//!
//! Implements `spec.md §4.6`: a single forward scan tracks string/escape
//! state and a bracket stack; completion then closes dangling strings,
//! drops incomplete escapes, completes bare atoms/numbers, and closes open
//! brackets in LIFO order.

use std::fmt;

/// Errors from the partial-JSON completer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompleterError {
    /// The input's bracket nesting exceeded the caller-supplied depth limit.
    #[error("nesting depth exceeded limit of {limit}")]
    DepthExceeded {
        /// The configured limit.
        limit: usize,
    },
}

/// Whether an object frame (on the bracket stack) is currently positioned
/// to receive a key or a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectPosition {
    /// Expecting a key (start of object, or just after a comma).
    Key,
    /// Expecting a value (just after a colon).
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Object(ObjectPosition),
    Array,
}

/// Complete a possibly-truncated JSON string into one guaranteed to parse.
///
/// `max_depth` bounds the bracket nesting this function will track; nesting
/// deeper than that is reported as an error rather than silently truncated,
/// per `spec.md §4.6`.
pub fn complete(input: &str, max_depth: usize) -> Result<String, CompleterError> {
    if input.trim().is_empty() {
        return Ok("{}".to_string());
    }

    let mut out: Vec<char> = input.chars().collect();
    let mut stack: Vec<Frame> = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;
    // Index into `out` of the start of an in-progress `\uXXXX` escape, and
    // how many hex digits have been consumed so far.
    let mut unicode_escape: Option<(usize, u8)> = None;

    // True only when the most recent non-whitespace token was a complete
    // string that closed while the enclosing object was awaiting a key —
    // i.e. a dangling key with no colon typed yet.
    let mut dangling_key = false;

    let mut i = 0;
    while i < out.len() {
        let ch = out[i];

        if !ch.is_whitespace() {
            dangling_key = false;
        }

        if let Some((_, digits)) = unicode_escape {
            if ch.is_ascii_hexdigit() {
                unicode_escape = unicode_escape.map(|(start, d)| (start, d + 1));
                if digits + 1 == 4 {
                    unicode_escape = None;
                }
                i += 1;
                continue;
            }
            // Non-hex character ends the escape early; fall through to
            // normal processing below (the escape is already incomplete
            // and will be dropped at end-of-input if we never closed it).
            unicode_escape = None;
        }

        if escape_next {
            escape_next = false;
            if in_string && ch == 'u' {
                unicode_escape = Some((i - 1, 0));
            }
            i += 1;
            continue;
        }

        if in_string {
            match ch {
                '\\' => escape_next = true,
                '"' => {
                    in_string = false;
                    if matches!(stack.last(), Some(Frame::Object(ObjectPosition::Key))) {
                        dangling_key = true;
                    }
                }
                _ => {}
            }
            i += 1;
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => stack.push(Frame::Object(ObjectPosition::Key)),
            '[' => stack.push(Frame::Array),
            '}' => {
                if matches!(stack.last(), Some(Frame::Object(_))) {
                    stack.pop();
                }
                // unmatched closes are already-valid tokens in the input; ignore
            }
            ']' => {
                if matches!(stack.last(), Some(Frame::Array)) {
                    stack.pop();
                }
            }
            ':' => {
                if let Some(Frame::Object(pos)) = stack.last_mut() {
                    *pos = ObjectPosition::Value;
                }
            }
            ',' => {
                if let Some(Frame::Object(pos)) = stack.last_mut() {
                    *pos = ObjectPosition::Key;
                }
            }
            _ => {}
        }

        if stack.len() > max_depth {
            return Err(CompleterError::DepthExceeded { limit: max_depth });
        }

        i += 1;
    }

    if in_string {
        // Drop a dangling `\` or a dangling partial `\uXXXX` escape rather
        // than try to close it.
        if let Some((start, _)) = unicode_escape {
            out.truncate(start); // start is already the backslash's index
        } else if escape_next {
            out.pop();
        }
        out.push('"');

        if matches!(stack.last(), Some(Frame::Object(ObjectPosition::Key))) {
            out.extend(":null".chars());
        }
    } else {
        trim_trailing_whitespace(&mut out);
        if out.last() == Some(&',') {
            out.pop();
            trim_trailing_whitespace(&mut out);
        }
        if dangling_key && matches!(stack.last(), Some(Frame::Object(ObjectPosition::Key))) {
            out.extend(":null".chars());
        } else {
            complete_trailing_atom(&mut out);
            if out.last() == Some(&':') {
                out.extend("null".chars());
            }
        }
    }

    for frame in stack.into_iter().rev() {
        match frame {
            Frame::Object(_) => out.push('}'),
            Frame::Array => out.push(']'),
        }
    }

    Ok(out.into_iter().collect())
}

fn trim_trailing_whitespace(buf: &mut Vec<char>) {
    while matches!(buf.last(), Some(c) if c.is_whitespace()) {
        buf.pop();
    }
}

/// Completes a dangling bare literal (`true`/`false`/`null`) or number at
/// the end of `buf`, in place.
fn complete_trailing_atom(buf: &mut Vec<char>) {
    let tail_alpha_start = buf
        .iter()
        .rposition(|c| !c.is_ascii_lowercase())
        .map_or(0, |idx| idx + 1);
    let tail_alpha: String = buf[tail_alpha_start..].iter().collect();

    // `e`/`E` is both a lowercase letter and a number's exponent marker; only
    // treat the trailing run as a literal prefix when it is not just a bare
    // exponent marker sitting after digits (e.g. "1.23e" falls through to
    // the number-completion logic below instead of being swallowed here).
    if !tail_alpha.is_empty() && tail_alpha != "e" {
        for atom in ["true", "false", "null"] {
            if atom != tail_alpha && atom.starts_with(tail_alpha.as_str()) {
                buf.truncate(tail_alpha_start);
                buf.extend(atom.chars());
                return;
            }
        }
        return;
    }

    let is_num_char = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E');
    let tail_num_start = buf
        .iter()
        .rposition(|&c| !is_num_char(c))
        .map_or(0, |idx| idx + 1);
    if tail_num_start == buf.len() {
        return;
    }

    // "-." has no digit between the sign and the decimal point; insert one.
    if buf.len() - tail_num_start == 2 && buf[tail_num_start] == '-' && buf[tail_num_start + 1] == '.'
    {
        buf.insert(tail_num_start + 1, '0');
    }

    match buf.last().copied() {
        Some('-') => buf.push('0'),
        Some('.') => buf.push('0'),
        Some('e') | Some('E') => buf.push('0'),
        Some('+') | Some('-') if buf.len() >= 2 && matches!(buf[buf.len() - 2], 'e' | 'E') => {
            buf.push('0');
        }
        _ => {}
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Object(_) => write!(f, "{{"),
            Frame::Array => write!(f, "["),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_completes_to(input: &str, expected: &str) {
        assert_eq!(complete(input, 64).unwrap(), expected, "input: {input:?}");
    }

    #[test]
    fn spec_scenarios() {
        assert_completes_to(r#"{"a": 1"#, r#"{"a": 1}"#);
        assert_completes_to("[1, 2,", "[1, 2]");
        assert_completes_to("\"hel", "\"hel\"");
        assert_completes_to("tr", "true");
        assert_completes_to("fal", "false");
        assert_completes_to("nu", "null");
        assert_completes_to("3.", "3.0");
        assert_completes_to("-", "-0");
        assert_completes_to("", "{}");
        assert_completes_to("   ", "{}");
        assert_completes_to(r#"{"name""#, r#"{"name":null}"#);
        assert_completes_to(
            r#"{"user": {"name": "Bob""#,
            r#"{"user": {"name": "Bob"}}"#,
        );
    }

    #[test]
    fn dash_dot_becomes_negative_zero_point_zero() {
        assert_completes_to("-.", "-0.0");
    }

    #[test]
    fn exponent_without_digits_gets_zero() {
        assert_completes_to("1.23e", "1.23e0");
    }

    #[test]
    fn already_valid_json_is_unchanged_in_structure() {
        let input = r#"{"a":1,"b":[1,2,3]}"#;
        let completed = complete(input, 64).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&completed).unwrap();
        assert_eq!(parsed["a"], 1);
    }

    #[test]
    fn value_string_does_not_get_key_completion() {
        // "Bob" here is a *value*, not a dangling key, so no `:null` is added.
        let completed = complete(r#"{"name": "Bob"#, 64).unwrap();
        assert_eq!(completed, r#"{"name": "Bob"}"#);
    }

    #[test]
    fn dangling_escape_is_dropped() {
        let completed = complete(r#""hello\"#, 64).unwrap();
        assert_eq!(completed, "\"hello\"");
    }

    #[test]
    fn incomplete_unicode_escape_is_dropped() {
        let completed = complete(r#""hi \u00"#, 64).unwrap();
        assert_eq!(completed, "\"hi \"");
    }

    #[test]
    fn depth_limit_is_enforced() {
        let deeply_nested = "[".repeat(10);
        assert_eq!(
            complete(&deeply_nested, 5),
            Err(CompleterError::DepthExceeded { limit: 5 })
        );
    }

    #[test]
    fn unmatched_close_is_ignored_not_erroring() {
        // already a valid token sequence from the parser's perspective
        let completed = complete("[1, 2]]", 64).unwrap();
        assert_eq!(completed, "[1, 2]]");
    }
}
