//! Wires a decoder to a byte stream, producing the
//! [`conduit_core::ChunkStream`] every streaming capability contract
//! returns.

use bytes::Bytes;
use conduit_core::{ChunkStream, ConduitError};
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::assembler::ChunkAssembler;
use crate::delta::ChunkDecoder;

/// Drives `byte_stream` through SSE decoding and chunk assembly, honoring
/// `cancellation` between events so an in-flight stream stops within one
/// event's worth of latency of being cancelled.
pub fn assemble_chunk_stream<S, D, E>(
    byte_stream: S,
    decoder: D,
    cancellation: CancellationToken,
) -> ChunkStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    D: ChunkDecoder + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let token = cancellation.clone();
    let sse_stream = conduit_sse::decode_sse_stream(byte_stream);

    let stream = async_stream::stream! {
        let mut assembler = ChunkAssembler::new(decoder);
        let mut sse_stream = std::pin::pin!(sse_stream);

        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    yield Err(ConduitError::Cancelled);
                    return;
                }
                next = sse_stream.next() => {
                    match next {
                        Some(Ok(event)) => {
                            for chunk in assembler.feed(&event) {
                                yield Ok(chunk);
                            }
                        }
                        Some(Err(err)) => {
                            yield Err(ConduitError::NetworkError(Box::new(err)));
                            return;
                        }
                        None => {
                            if let Some(terminal) = assembler.finish() {
                                yield Ok(terminal);
                            }
                            return;
                        }
                    }
                }
            }
        }
    };

    ChunkStream::new(Box::pin(stream), cancellation)
}
