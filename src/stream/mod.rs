//! Stream decoding: raw SSE bytes to [`StreamEvent`]s.

mod assistant;
mod completions;
pub mod decoder;
mod reader;

pub use decoder::{Events, Framing, StreamDecoder, DATA_PREFIX};
pub use reader::EventReader;

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};

use crate::error::{CourierError, Result};
use crate::types::StreamEvent;

/// Boxed stream of decoded events, as returned by backends.
pub type EventStream = BoxStream<'static, Result<StreamEvent>>;

/// Decode a byte stream (typically `reqwest::Response::bytes_stream`).
///
/// Transport errors are yielded once and end the stream. If the bytes run out
/// before the decoder produced a terminal event, a final `StreamEnd` is yielded.
pub fn decode_byte_stream<S, B, E>(bytes: S, mut decoder: StreamDecoder) -> EventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<CourierError> + Send + 'static,
{
    let stream = async_stream::stream! {
        futures::pin_mut!(bytes);

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            };

            for event in decoder.decode(chunk.as_ref()) {
                yield Ok(event);
            }
            if decoder.is_finished() {
                return;
            }
        }

        decoder.finish();
        yield Ok(StreamEvent::StreamEnd);
    };

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StreamFault;

    fn chunks(parts: &[&str]) -> Vec<std::result::Result<Vec<u8>, CourierError>> {
        parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect()
    }

    #[tokio::test]
    async fn yields_stream_end_when_bytes_run_out() {
        let source = futures::stream::iter(chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"par\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"tial\"}}]}",
        ]));
        let events: Vec<_> = decode_byte_stream(source, StreamDecoder::chat_completions())
            .collect()
            .await;
        let events: Vec<StreamEvent> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta { text: "par".into() },
                StreamEvent::StreamEnd
            ]
        );
    }

    #[tokio::test]
    async fn stops_after_terminal_event() {
        let source = futures::stream::iter(chunks(&[
            "data: not-json\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n",
        ]));
        let events: Vec<_> = decode_byte_stream(source, StreamDecoder::chat_completions())
            .collect()
            .await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            Ok(StreamEvent::StreamError {
                cause: StreamFault::Malformed { .. }
            })
        ));
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let source = futures::stream::iter(vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n".to_vec()),
            Err(CourierError::Stream("connection reset".into())),
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n".to_vec()),
        ]);
        let events: Vec<_> = decode_byte_stream(source, StreamDecoder::chat_completions())
            .collect()
            .await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Err(CourierError::Stream(_))));
    }
}
