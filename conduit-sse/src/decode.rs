//! Wires [`LineBuffer`] and [`SseParser`] to a `futures::Stream` of raw
//! bytes, producing a `Stream` of [`SseEvent`]s.

use bytes::Bytes;
use futures::Stream;

use crate::event::{SseEvent, SseParser};
use crate::line_buffer::{LineBuffer, LineOutcome};

/// No line may exceed this many bytes; providers that send larger single
/// lines than this are producing malformed SSE.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// An error surfaced while decoding an SSE byte stream.
#[derive(Debug, thiserror::Error)]
pub enum SseDecodeError<E> {
    /// A single line exceeded [`MAX_LINE_BYTES`].
    #[error("SSE line exceeded {MAX_LINE_BYTES} bytes without a terminator")]
    LineTooLong,
    /// The underlying byte stream produced an error.
    #[error(transparent)]
    Source(E),
}

/// Decodes a `Stream` of byte chunks (e.g. `reqwest::Response::bytes_stream`)
/// into a `Stream` of [`SseEvent`]s.
pub fn decode_sse_stream<S, E>(
    byte_stream: S,
) -> impl Stream<Item = Result<SseEvent, SseDecodeError<E>>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Send + 'static,
{
    async_stream::stream! {
        let mut parser = SseParser::new();
        let mut line_buf = LineBuffer::new();
        let mut source = std::pin::pin!(byte_stream);

        use futures::StreamExt;
        while let Some(chunk) = source.next().await {
            let chunk = match chunk {
                Ok(b) => b,
                Err(e) => {
                    yield Err(SseDecodeError::Source(e));
                    return;
                }
            };
            line_buf.extend(&chunk);

            loop {
                match line_buf.next_line(MAX_LINE_BYTES) {
                    LineOutcome::Line(line) => {
                        if let Some(event) = parser.feed_line(&line) {
                            yield Ok(event);
                        }
                    }
                    LineOutcome::NeedMore => break,
                    LineOutcome::Overflow { .. } => {
                        yield Err(SseDecodeError::LineTooLong);
                        return;
                    }
                }
            }
        }

        loop {
            match line_buf.next_line_at_eof(MAX_LINE_BYTES) {
                LineOutcome::Line(line) => {
                    if let Some(event) = parser.feed_line(&line) {
                        yield Ok(event);
                    }
                }
                LineOutcome::NeedMore => break,
                LineOutcome::Overflow { .. } => {
                    yield Err(SseDecodeError::LineTooLong);
                    return;
                }
            }
        }

        if let Some(event) = parser.finish() {
            yield Ok(event);
        }
    }
}
