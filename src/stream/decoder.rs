//! Line-buffered SSE decoder.

use std::collections::VecDeque;

use tracing::debug;

use crate::types::{StreamEvent, StreamFault};

use super::{assistant, completions};

/// Prefix of the only lines that carry payloads.
pub const DATA_PREFIX: &str = "data: ";

const DONE_MARKER: &str = "[DONE]";

/// Payload dialect carried by the `data:` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `{choices: [{delta, finish_reason}]}` chunks from a completions endpoint.
    ChatCompletions,
    /// Thread/run/message objects from a managed assistant run.
    AssistantRun,
}

/// Turns arbitrarily split byte fragments into ordered [`StreamEvent`]s.
///
/// Only complete lines are parsed; the trailing partial line stays buffered until
/// the next fragment. Once a terminal event (`StreamEnd` or `StreamError`) has been
/// produced the decoder ignores everything else.
#[derive(Debug)]
pub struct StreamDecoder {
    framing: Framing,
    buffer: Vec<u8>,
    /// Events of the current line not yet handed out.
    pending: VecDeque<StreamEvent>,
    finished: bool,
}

impl StreamDecoder {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            buffer: Vec::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    pub fn chat_completions() -> Self {
        Self::new(Framing::ChatCompletions)
    }

    pub fn assistant_run() -> Self {
        Self::new(Framing::AssistantRun)
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// A terminal event has been produced.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Append a fragment and lazily yield the events of every line it completes.
    pub fn decode(&mut self, chunk: &[u8]) -> Events<'_> {
        if !self.finished {
            self.buffer.extend_from_slice(chunk);
        }
        Events { decoder: self }
    }

    /// Drop an unterminated trailing line; a partial line never yields an event.
    pub fn finish(&mut self) {
        if !self.finished && !self.buffer.is_empty() {
            debug!(bytes = self.buffer.len(), "discarding unterminated stream line");
        }
        self.buffer.clear();
    }

    fn next_line(&mut self) -> Option<String> {
        let end = self.buffer.iter().position(|b| *b == b'\n')?;
        let raw: Vec<u8> = self.buffer.drain(..=end).collect();
        let mut line = String::from_utf8_lossy(&raw[..end]).into_owned();
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }

    fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                if event.is_terminal() {
                    self.finished = true;
                    self.buffer.clear();
                    self.pending.clear();
                }
                return Some(event);
            }
            if self.finished {
                return None;
            }
            let line = self.next_line()?;
            self.parse_line(&line);
        }
    }

    /// Queue the events of one complete line.
    fn parse_line(&mut self, line: &str) {
        let Some(data) = line.strip_prefix(DATA_PREFIX) else {
            return;
        };
        if data.trim() == DONE_MARKER {
            self.pending.push_back(StreamEvent::StreamEnd);
            return;
        }

        let value: serde_json::Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => {
                self.pending.push_back(StreamEvent::StreamError {
                    cause: StreamFault::Malformed {
                        line: line.to_string(),
                        message: e.to_string(),
                    },
                });
                return;
            }
        };

        match self.framing {
            Framing::ChatCompletions => self.pending.extend(completions::interpret(&value)),
            Framing::AssistantRun => self.pending.extend(assistant::interpret(&value)),
        }
    }
}

/// Lazy iterator over the events completed by one [`StreamDecoder::decode`] call.
pub struct Events<'a> {
    decoder: &'a mut StreamDecoder,
}

impl Iterator for Events<'_> {
    type Item = StreamEvent;

    fn next(&mut self) -> Option<StreamEvent> {
        self.decoder.next_event()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn delta(text: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": text}, "finish_reason": null}]})
        )
    }

    const STOP: &str = "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n";

    fn decode_all(decoder: &mut StreamDecoder, chunks: &[&[u8]]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(decoder.decode(chunk));
        }
        decoder.finish();
        events
    }

    fn prose(events: &[StreamEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::TextDelta { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn assembles_hello_world() {
        let wire = format!("{}{}{}{}", delta("Hel"), delta("lo wor"), delta("ld"), STOP);
        let events = decode_all(&mut StreamDecoder::chat_completions(), &[wire.as_bytes()]);
        assert_eq!(prose(&events), "Hello world");
        assert_eq!(events.last(), Some(&StreamEvent::StreamEnd));
    }

    #[test]
    fn every_split_point_yields_same_events() {
        let wire = format!(
            "{}: keep-alive\n{}{}{}",
            delta("Grüße "),
            delta("⁙ and more"),
            delta("tail"),
            STOP
        );
        let bytes = wire.as_bytes();
        let expected = decode_all(&mut StreamDecoder::chat_completions(), &[bytes]);
        assert_eq!(expected.len(), 4);

        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            let events = decode_all(&mut StreamDecoder::chat_completions(), &[a, b]);
            assert_eq!(events, expected, "split at {split}");
        }

        let single_bytes: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(
            decode_all(&mut StreamDecoder::chat_completions(), &single_bytes),
            expected
        );
    }

    #[test]
    fn stop_terminates_even_with_buffered_lines() {
        let wire = format!("{}{}{}", delta("a"), STOP, delta("never"));
        let mut decoder = StreamDecoder::chat_completions();
        let events: Vec<_> = decoder.decode(wire.as_bytes()).collect();
        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta { text: "a".into() },
                StreamEvent::StreamEnd
            ]
        );
        assert!(decoder.is_finished());
        assert_eq!(decoder.decode(delta("late").as_bytes()).count(), 0);
    }

    #[test]
    fn stop_line_content_precedes_stream_end() {
        let last = "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":\"stop\"}]}\n";
        let wire = format!("{}{last}{}", delta("Hel"), delta("never"));
        let mut decoder = StreamDecoder::chat_completions();
        let events: Vec<_> = decoder.decode(wire.as_bytes()).collect();
        assert_eq!(prose(&events), "Hello");
        assert_eq!(events.last(), Some(&StreamEvent::StreamEnd));
        assert_eq!(events.len(), 3);
        assert!(decoder.is_finished());
    }

    #[test]
    fn error_finish_reason_carries_message() {
        let wire = "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"error\",\"error\":{\"message\":\"device unavailable\"}}]}\n";
        let events: Vec<_> = StreamDecoder::chat_completions()
            .decode(wire.as_bytes())
            .collect();
        assert_eq!(
            events,
            vec![StreamEvent::StreamError {
                cause: StreamFault::Remote {
                    message: "device unavailable".into()
                }
            }]
        );
    }

    #[test]
    fn malformed_data_line_is_fatal() {
        let wire = format!("data: {{\"choices\": [\n{}", delta("after"));
        let events: Vec<_> = StreamDecoder::chat_completions()
            .decode(wire.as_bytes())
            .collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::StreamError {
                cause: StreamFault::Malformed { line, .. },
            } => assert_eq!(line, "data: {\"choices\": ["),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn ignores_blank_and_foreign_lines() {
        let wire = "\n: comment\nevent: thread.message.delta\nid: 7\ndata: {\"id\":\"x\"}\ndata:{\"choices\":[]}\n";
        let events: Vec<_> = StreamDecoder::chat_completions()
            .decode(wire.as_bytes())
            .collect();
        assert!(events.is_empty());
    }

    #[test]
    fn partial_line_never_yields() {
        let mut decoder = StreamDecoder::chat_completions();
        let line = delta("half");
        let without_newline = line.trim_end();
        assert_eq!(decoder.decode(without_newline.as_bytes()).count(), 0);
        decoder.finish();
        assert_eq!(decoder.decode(b"\n").count(), 0);
    }

    #[test]
    fn crlf_lines_and_done_marker() {
        let wire = "data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\r\n\r\ndata: [DONE]\r\n";
        let events: Vec<_> = StreamDecoder::chat_completions()
            .decode(wire.as_bytes())
            .collect();
        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta { text: "hi".into() },
                StreamEvent::StreamEnd
            ]
        );
    }
}
