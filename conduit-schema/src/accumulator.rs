//! Streaming structured-output accumulation (`spec.md §4.5`).
//!
//! Wraps a raw text-delta stream with an accumulator that assembles partial
//! JSON into snapshots of a [`Generable`] type's [`PartiallyGenerated`]
//! counterpart, yielding a new snapshot only when it differs structurally
//! from the last one emitted.

use conduit_core::ConduitError;
use futures::stream::{Stream, StreamExt};

use crate::content::GeneratedContent;
use crate::generable::{Generable, PartiallyGenerated};

/// Hard cap on accumulated text before the stream fails with `ParseFailed`.
const MAX_ACCUMULATED_BYTES: usize = 1024 * 1024;

/// A snapshot yielded by [`accumulate_structured`].
#[derive(Debug, Clone)]
pub struct StructuredChunk<P> {
    /// The best-effort partial value decoded from the text seen so far.
    pub partial: P,
    /// Whether the underlying text parsed as complete, valid JSON.
    pub is_complete: bool,
}

/// Whether `chunk` could plausibly change what the accumulated buffer parses
/// as. A cheap pre-filter so plain prose chunks skip a parse attempt.
fn might_change_parseability(chunk: &str) -> bool {
    chunk.bytes().any(|b| {
        matches!(
            b,
            b'{' | b'}' | b'[' | b']' | b'"' | b':' | b',' | b'-' | b't' | b'f' | b'n'
        ) || b.is_ascii_digit()
    })
}

enum ParseAttempt {
    Exact(GeneratedContent),
    Partial(GeneratedContent),
    None,
}

fn try_parse(buffer: &str) -> ParseAttempt {
    if let Ok(content) = GeneratedContent::from_json_str(buffer) {
        return ParseAttempt::Exact(content);
    }
    if let Ok((content, is_complete)) = GeneratedContent::from_partial_json_str(buffer) {
        return if is_complete {
            ParseAttempt::Exact(content)
        } else {
            ParseAttempt::Partial(content)
        };
    }
    if let Some(repaired) = conduit_json::repair(buffer) {
        if let Ok(content) = GeneratedContent::from_json_str(&repaired) {
            return ParseAttempt::Partial(content);
        }
    }
    ParseAttempt::None
}

struct AccumulatorState<S> {
    deltas: S,
    buffer: String,
    ever_parsed: bool,
    last_snapshot: Option<(GeneratedContent, bool)>,
    finished: bool,
}

/// Wrap a stream of raw text deltas into a stream of `T::Partial` snapshots.
///
/// # Errors
///
/// The returned stream yields `Err(ConduitError::ParseFailed)` if the
/// accumulated text exceeds 1 MB, or if the stream ends with non-empty text
/// that never parsed as JSON at all.
pub fn accumulate_structured<T, S>(
    deltas: S,
) -> impl Stream<Item = Result<StructuredChunk<T::Partial>, ConduitError>>
where
    T: Generable,
    S: Stream<Item = Result<String, ConduitError>> + Unpin,
{
    let initial = AccumulatorState {
        deltas,
        buffer: String::new(),
        ever_parsed: false,
        last_snapshot: None,
        finished: false,
    };

    futures::stream::unfold(initial, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            let Some(next) = state.deltas.next().await else {
                state.finished = true;
                if !state.buffer.is_empty() && !state.ever_parsed {
                    return Some((
                        Err(ConduitError::ParseFailed(
                            "stream ended without ever producing parseable JSON".to_string(),
                        )),
                        state,
                    ));
                }
                return None;
            };

            let delta = match next {
                Ok(delta) => delta,
                Err(e) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
            };

            state.buffer.push_str(&delta);

            if state.buffer.len() > MAX_ACCUMULATED_BYTES {
                state.finished = true;
                return Some((
                    Err(ConduitError::ParseFailed(format!(
                        "accumulated structured-output text exceeded {MAX_ACCUMULATED_BYTES} bytes"
                    ))),
                    state,
                ));
            }

            if !might_change_parseability(&delta) {
                continue;
            }

            let (content, is_complete) = match try_parse(&state.buffer) {
                ParseAttempt::Exact(content) => (content, true),
                ParseAttempt::Partial(content) => (content, false),
                ParseAttempt::None => continue,
            };
            state.ever_parsed = true;

            let unchanged = state
                .last_snapshot
                .as_ref()
                .is_some_and(|(prev, prev_complete)| *prev_complete == is_complete && *prev == content);
            if unchanged {
                continue;
            }

            let partial = match T::Partial::from_partial_content(&content) {
                Ok(partial) => partial,
                Err(e) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
            };

            state.last_snapshot = Some((content, is_complete));
            return Some((Ok(StructuredChunk { partial, is_complete }), state));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{GenerationSchema, SchemaNode};
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq)]
    struct Summary {
        score: i64,
    }

    #[derive(Debug, Clone, PartialEq, Default)]
    struct PartialSummary {
        score: Option<i64>,
    }

    impl Generable for Summary {
        type Partial = PartialSummary;

        fn generation_schema() -> GenerationSchema {
            let mut properties = BTreeMap::new();
            properties.insert("score".to_string(), SchemaNode::integer());
            GenerationSchema::single("Summary", SchemaNode::object(properties, vec!["score".to_string()]))
        }

        fn from_content(content: &GeneratedContent) -> Result<Self, ConduitError> {
            let score = content
                .get("score")
                .and_then(GeneratedContent::as_i64)
                .ok_or_else(|| ConduitError::ConversionFailed("missing `score`".to_string()))?;
            Ok(Self { score })
        }

        fn to_content(&self) -> GeneratedContent {
            GeneratedContent::object([("score", GeneratedContent::int(self.score))])
        }
    }

    impl PartiallyGenerated for PartialSummary {
        fn from_partial_content(content: &GeneratedContent) -> Result<Self, ConduitError> {
            Ok(Self {
                score: content.get("score").and_then(GeneratedContent::as_i64),
            })
        }
    }

    fn delta_stream(deltas: Vec<&'static str>) -> impl Stream<Item = Result<String, ConduitError>> + Unpin {
        futures::stream::iter(deltas.into_iter().map(|d| Ok(d.to_string())))
    }

    #[tokio::test]
    async fn yields_a_snapshot_once_the_field_becomes_parseable() {
        let stream = delta_stream(vec!["{\"sc", "ore\": 9", "0}"]);
        let snapshots: Vec<_> = accumulate_structured::<Summary, _>(stream)
            .collect::<Vec<_>>()
            .await;
        let snapshots: Vec<_> = snapshots.into_iter().map(Result::unwrap).collect();
        assert!(!snapshots.is_empty());
        let last = snapshots.last().unwrap();
        assert!(last.is_complete);
        assert_eq!(last.partial.score, Some(90));
    }

    #[tokio::test]
    async fn does_not_re_yield_an_unchanged_snapshot() {
        let stream = delta_stream(vec!["{\"score\": 1}", ""]);
        let snapshots: Vec<_> = accumulate_structured::<Summary, _>(stream)
            .collect::<Vec<_>>()
            .await;
        assert_eq!(snapshots.len(), 1);
    }

    #[tokio::test]
    async fn fails_with_parse_failed_when_nothing_ever_parses() {
        let stream = delta_stream(vec!["not json at all, just prose"]);
        let snapshots: Vec<_> = accumulate_structured::<Summary, _>(stream)
            .collect::<Vec<_>>()
            .await;
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots[0].is_err());
    }

    #[tokio::test]
    async fn fails_when_accumulated_text_exceeds_the_cap() {
        let huge = "x".repeat(MAX_ACCUMULATED_BYTES + 1);
        let stream = futures::stream::iter(vec![Ok(huge)]);
        let snapshots: Vec<_> = accumulate_structured::<Summary, _>(stream)
            .collect::<Vec<_>>()
            .await;
        assert_eq!(snapshots.len(), 1);
        match &snapshots[0] {
            Err(ConduitError::ParseFailed(_)) => {}
            other => panic!("expected ParseFailed, got {other:?}"),
        }
    }
}
