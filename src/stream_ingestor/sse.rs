// Server-Sent Events transport for the log stream.

use std::collections::VecDeque;
use std::fmt::Display;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use reqwest::Client;
use reqwest::header::{ACCEPT, CACHE_CONTROL};

use super::{LogEvents, LogSource, TransportEvent};
use crate::error::TelemetryError;

/// Incremental `text/event-stream` decoder. Feed raw chunks, get event payloads.
///
/// Only `data` fields are kept; multiple `data` lines in one event are joined
/// with `\n`. Comments and other fields are skipped. Lines may end in `\n` or `\r\n`.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes a chunk; returns every event completed by it, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.process_line(&line) {
                out.push(event);
            }
        }
        out
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.data.take();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            match self.data.as_mut() {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            }
        }
        None
    }
}

/// Turns an SSE body into `Line` events. A body error yields one `Failed`
/// and ends the stream; a clean end just ends it.
pub fn decode_body<B, E>(body: B) -> impl Stream<Item = TransportEvent> + Send + 'static
where
    B: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Display + Send + 'static,
{
    let state = (body, SseDecoder::new(), VecDeque::<String>::new(), false);
    stream::unfold(
        state,
        |(mut body, mut decoder, mut ready, failed)| async move {
            loop {
                if let Some(line) = ready.pop_front() {
                    return Some((TransportEvent::Line(line), (body, decoder, ready, failed)));
                }
                if failed {
                    return None;
                }
                match body.next().await {
                    Some(Ok(chunk)) => ready.extend(decoder.feed(&chunk)),
                    Some(Err(e)) => {
                        let event = TransportEvent::Failed(TelemetryError::Transport(e.to_string()));
                        return Some((event, (body, decoder, ready, true)));
                    }
                    None => return None,
                }
            }
        },
    )
}

/// `LogSource` over HTTP Server-Sent Events.
#[derive(Debug, Clone)]
pub struct SseLogSource {
    client: Client,
}

impl SseLogSource {
    /// Only a connect timeout is set: the body stays open for the life of the stream.
    pub fn new(connect_timeout: Duration) -> Result<Self, TelemetryError> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl LogSource for SseLogSource {
    fn subscribe(&self, endpoint: &str) -> LogEvents {
        let client = self.client.clone();
        let url = endpoint.to_string();
        let connect = async move {
            let response = client
                .get(&url)
                .header(ACCEPT, "text/event-stream")
                .header(CACHE_CONTROL, "no-cache")
                .send()
                .await
                .and_then(|r| r.error_for_status());
            match response {
                Ok(response) => {
                    tracing::debug!(url = %url, status = %response.status(), "log stream response");
                    let body = response.bytes_stream().boxed();
                    stream::once(async { TransportEvent::Opened })
                        .chain(decode_body(body))
                        .left_stream()
                }
                Err(e) => stream::once(async move {
                    TransportEvent::Failed(TelemetryError::Transport(e.to_string()))
                })
                .right_stream(),
            }
        };
        stream::once(connect).flatten().boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_single_data_event() {
        let mut d = SseDecoder::new();
        assert_eq!(d.feed(b"data: hello\n\n"), vec!["hello".to_string()]);
    }

    #[test]
    fn joins_multi_line_data() {
        let mut d = SseDecoder::new();
        assert_eq!(d.feed(b"data: a\ndata: b\n\n"), vec!["a\nb".to_string()]);
    }

    #[test]
    fn skips_comments_and_other_fields() {
        let mut d = SseDecoder::new();
        let out = d.feed(b": keepalive\nevent: log\nid: 7\ndata: x\n\n");
        assert_eq!(out, vec!["x".to_string()]);
    }

    #[test]
    fn accepts_crlf_line_endings() {
        let mut d = SseDecoder::new();
        assert_eq!(d.feed(b"data: one\r\n\r\n"), vec!["one".to_string()]);
    }

    #[test]
    fn chunk_split_mid_line_decodes_same() {
        let mut d = SseDecoder::new();
        assert!(d.feed(b"da").is_empty());
        assert!(d.feed(b"ta: spl").is_empty());
        assert!(d.feed(b"it\n").is_empty());
        assert_eq!(d.feed(b"\n"), vec!["split".to_string()]);
    }

    #[test]
    fn blank_line_without_data_dispatches_nothing() {
        let mut d = SseDecoder::new();
        assert!(d.feed(b"\n\n: c\n\n").is_empty());
    }

    #[test]
    fn data_without_space_and_empty_data() {
        let mut d = SseDecoder::new();
        assert_eq!(
            d.feed(b"data:tight\n\ndata\n\n"),
            vec!["tight".to_string(), String::new()]
        );
    }

    #[tokio::test]
    async fn decode_body_emits_lines_then_failure() {
        let chunks: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"data: a\n\ndata: ")),
            Ok(Bytes::from_static(b"b\n\n")),
            Err("reset".to_string()),
            Ok(Bytes::from_static(b"data: never\n\n")),
        ];
        let events: Vec<TransportEvent> = decode_body(stream::iter(chunks)).collect().await;
        assert_eq!(
            events,
            vec![
                TransportEvent::Line("a".into()),
                TransportEvent::Line("b".into()),
                TransportEvent::Failed(TelemetryError::Transport("reset".into())),
            ]
        );
    }
}
