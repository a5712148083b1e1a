//! SSE field parsing and event dispatch.
//!
//! Field handling follows the Server-Sent Events wire format: `data`
//! accumulates across lines (joined with `\n`), `event` names the dispatched
//! event type (default `"message"`), `id` persists across dispatches until
//! re-set, and `retry` carries a reconnection-delay hint in milliseconds.
//! Lines starting with `:` are comments; lines without a `:` are a field
//! name with an empty value; unknown field names are ignored.

/// One dispatched SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type, defaulting to `"message"` when the source never sets one.
    pub event: String,
    /// Accumulated `data` lines, joined with `\n`. Empty if no `data` field
    /// was set.
    pub data: String,
    /// The last `id` seen on or before this event, if any has ever been set.
    pub id: Option<String>,
    /// Reconnection delay in milliseconds, if this event's source set one.
    pub retry: Option<u64>,
}

const DEFAULT_EVENT_TYPE: &str = "message";

/// Incrementally parses SSE-framed lines into dispatched [`SseEvent`]s.
#[derive(Debug, Default)]
pub struct SseParser {
    persistent_id: Option<String>,
    event_type: Option<String>,
    data_lines: Vec<String>,
    data_set: bool,
    id_set_this_event: bool,
    retry: Option<u64>,
}

impl SseParser {
    /// Creates an empty parser with no persisted `id`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line (terminator already stripped). A blank line
    /// dispatches the in-progress event, provided at least one of
    /// `data`/`event`/`id` was set on it; a `retry`-only event does not
    /// dispatch.
    pub fn feed_line(&mut self, line: &[u8]) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch_on_blank();
        }

        let line = String::from_utf8_lossy(line);

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.find(':') {
            Some(idx) => {
                let field = &line[..idx];
                let mut value = &line[idx + 1..];
                if let Some(stripped) = value.strip_prefix(' ') {
                    value = stripped;
                }
                (field, value)
            }
            None => (line.as_ref(), ""),
        };

        self.apply_field(field, value);
        None
    }

    fn apply_field(&mut self, field: &str, value: &str) {
        match field {
            "data" => {
                self.data_lines.push(value.to_string());
                self.data_set = true;
            }
            "event" => self.event_type = Some(value.to_string()),
            "id" => {
                self.persistent_id = Some(value.to_string());
                self.id_set_this_event = true;
            }
            "retry" => {
                if let Ok(ms) = value.parse::<u64>() {
                    self.retry = Some(ms);
                }
            }
            _ => {}
        }
    }

    fn has_dispatchable_fields(&self) -> bool {
        self.event_type.is_some() || self.data_set || self.id_set_this_event
    }

    fn dispatch_on_blank(&mut self) -> Option<SseEvent> {
        if !self.has_dispatchable_fields() {
            self.reset_event();
            return None;
        }
        Some(self.take_event())
    }

    /// Call once the underlying byte source is exhausted. Flushes an
    /// in-progress event that has at least one field set, but not one
    /// consisting only of an empty `data` field (distinguishing "stream
    /// ended mid-event" from "stream ended right after a blank line").
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.has_dispatchable_fields() {
            return None;
        }
        let only_empty_data = self.data_set
            && self.data_lines.iter().all(String::is_empty)
            && self.event_type.is_none()
            && !self.id_set_this_event;
        if only_empty_data {
            self.reset_event();
            return None;
        }
        Some(self.take_event())
    }

    fn take_event(&mut self) -> SseEvent {
        let event = SseEvent {
            event: self
                .event_type
                .take()
                .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string()),
            data: self.data_lines.join("\n"),
            id: self.persistent_id.clone(),
            retry: self.retry.take(),
        };
        self.reset_event();
        event
    }

    fn reset_event(&mut self) {
        self.event_type = None;
        self.data_lines.clear();
        self.data_set = false;
        self.id_set_this_event = false;
        self.retry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_lines(parser: &mut SseParser, lines: &[&str]) -> Vec<SseEvent> {
        lines.iter().filter_map(|l| parser.feed_line(l.as_bytes())).collect()
    }

    #[test]
    fn simple_data_event_dispatches_on_blank_line() {
        let mut parser = SseParser::new();
        let events = feed_lines(&mut parser, &["data: hello", ""]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
        assert_eq!(events[0].event, "message");
    }

    #[test]
    fn multiline_data_joins_with_newline() {
        let mut parser = SseParser::new();
        let events = feed_lines(&mut parser, &["data: line one", "data: line two", ""]);
        assert_eq!(events[0].data, "line one\nline two");
    }

    #[test]
    fn named_event_type_is_preserved() {
        let mut parser = SseParser::new();
        let events = feed_lines(&mut parser, &["event: ping", "data: {}", ""]);
        assert_eq!(events[0].event, "ping");
    }

    #[test]
    fn id_persists_across_dispatches_until_re_set() {
        let mut parser = SseParser::new();
        let events = feed_lines(
            &mut parser,
            &["id: 1", "data: a", "", "data: b", "", "id: 2", "data: c", ""],
        );
        assert_eq!(events[0].id.as_deref(), Some("1"));
        assert_eq!(events[1].id.as_deref(), Some("1"));
        assert_eq!(events[2].id.as_deref(), Some("2"));
    }

    #[test]
    fn retry_only_event_does_not_dispatch() {
        let mut parser = SseParser::new();
        let events = feed_lines(&mut parser, &["retry: 3000", ""]);
        assert!(events.is_empty());
    }

    #[test]
    fn retry_accompanies_next_dispatched_event_with_data() {
        let mut parser = SseParser::new();
        let events = feed_lines(&mut parser, &["retry: 3000", "data: x", ""]);
        assert_eq!(events[0].retry, Some(3000));
    }

    #[test]
    fn lone_empty_data_line_does_dispatch_on_blank() {
        let mut parser = SseParser::new();
        let events = feed_lines(&mut parser, &["data:", ""]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "");
    }

    #[test]
    fn comment_lines_are_ignored() {
        let mut parser = SseParser::new();
        let events = feed_lines(&mut parser, &[": this is a comment", "data: x", ""]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
    }

    #[test]
    fn unknown_field_is_ignored() {
        let mut parser = SseParser::new();
        let events = feed_lines(&mut parser, &["foo: bar", "data: x", ""]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
    }

    #[test]
    fn line_without_colon_is_field_with_empty_value() {
        let mut parser = SseParser::new();
        let events = feed_lines(&mut parser, &["data", ""]);
        assert_eq!(events[0].data, "");
    }

    #[test]
    fn consecutive_blank_lines_do_not_dispatch_twice() {
        let mut parser = SseParser::new();
        let events = feed_lines(&mut parser, &["data: x", "", ""]);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn finish_flushes_event_missing_trailing_blank_line() {
        let mut parser = SseParser::new();
        parser.feed_line(b"data: partial");
        let event = parser.finish().expect("event should flush at eof");
        assert_eq!(event.data, "partial");
    }

    #[test]
    fn finish_does_not_flush_only_empty_data() {
        let mut parser = SseParser::new();
        parser.feed_line(b"data:");
        assert!(parser.finish().is_none());
    }

    #[test]
    fn finish_is_a_no_op_with_nothing_in_progress() {
        let mut parser = SseParser::new();
        assert!(parser.finish().is_none());
    }
}
