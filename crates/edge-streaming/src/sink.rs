//! Ordered response sink.

use std::fmt::Display;

use edge_core::{TimingContext, WorkerError};
use edge_ipc::{ErrorReport, OutgoingMessage, ResponseHeaders};
use futures::{Sink, SinkExt, StreamExt};

use crate::result::{RenderBody, RenderResult};

/// State of the response sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkState {
    /// Nothing sent for this request yet.
    Initial,
    /// Headers are out, body chunks may follow.
    HeadersSent,
    /// `bodyEnd` has been sent.
    Completed,
}

/// Counters for one streamed response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Number of `bodyChunk` messages sent.
    pub chunks: usize,
    /// Total body bytes sent.
    pub bytes: usize,
}

/// Response sink that enforces `headers → bodyChunk* → bodyEnd`.
///
/// Generic over the outbound message sink so any `Sink<OutgoingMessage>`
/// works, including the framed channel from `edge_ipc::sender`. Every send
/// waits for the underlying sink to flush before returning.
pub struct ResponseSink<'a, S, E>
where
    S: Sink<OutgoingMessage, Error = E> + Unpin,
    E: Display,
{
    inner: &'a mut S,
    state: SinkState,
    timing: &'a mut TimingContext,
    summary: StreamSummary,
}

impl<'a, S, E> ResponseSink<'a, S, E>
where
    S: Sink<OutgoingMessage, Error = E> + Unpin,
    E: Display,
{
    /// Create a new response sink for one request.
    pub fn new(sink: &'a mut S, timing: &'a mut TimingContext) -> Self {
        Self {
            inner: sink,
            state: SinkState::Initial,
            timing,
            summary: StreamSummary::default(),
        }
    }

    /// Send status and headers. Must come first.
    pub async fn send_headers(
        &mut self,
        status: u16,
        headers: Vec<(String, String)>,
    ) -> Result<(), WorkerError> {
        if self.state != SinkState::Initial {
            return Err(WorkerError::Stream(
                "Headers already sent or response completed".to_string(),
            ));
        }

        self.send(OutgoingMessage::Headers(ResponseHeaders { status, headers }))
            .await?;
        self.timing.mark("headers_sent");
        self.state = SinkState::HeadersSent;
        Ok(())
    }

    /// Send one body chunk. Headers must be sent first.
    pub async fn send_chunk(&mut self, bytes: Vec<u8>) -> Result<(), WorkerError> {
        match self.state {
            SinkState::Initial => {
                return Err(WorkerError::Stream("Body chunk before headers".to_string()))
            }
            SinkState::Completed => {
                return Err(WorkerError::Stream("Response already completed".to_string()))
            }
            SinkState::HeadersSent => {}
        }

        let len = bytes.len();
        self.send(OutgoingMessage::BodyChunk(bytes)).await?;
        self.summary.chunks += 1;
        self.summary.bytes += len;
        tracing::trace!(len, index = self.summary.chunks, "body chunk sent");
        Ok(())
    }

    /// Complete the response with `bodyEnd`.
    pub async fn end(&mut self) -> Result<StreamSummary, WorkerError> {
        if self.state != SinkState::HeadersSent {
            return Err(WorkerError::Stream(
                "Response not started or already completed".to_string(),
            ));
        }

        self.send(OutgoingMessage::BodyEnd).await?;
        self.timing.mark("body_end");
        self.state = SinkState::Completed;
        Ok(self.summary)
    }

    /// Report a failure in place of the rest of the response.
    pub async fn fail(&mut self, err: &WorkerError) -> Result<(), WorkerError> {
        self.send(OutgoingMessage::Error(ErrorReport::from(err))).await?;
        self.state = SinkState::Completed;
        Ok(())
    }

    /// Stream a render result: headers, then the body, then `bodyEnd`.
    ///
    /// A dynamic body is forwarded chunk by chunk in production order and
    /// the next chunk is only pulled once the previous send completed. A
    /// static body goes out as a single chunk.
    pub async fn stream(&mut self, result: RenderResult) -> Result<StreamSummary, WorkerError> {
        let headers = vec![("Content-Type".to_string(), result.content_type().to_string())];
        self.send_headers(200, headers).await?;

        match result.into_body() {
            RenderBody::Dynamic(mut body) => {
                while let Some(chunk) = body.next().await {
                    self.send_chunk(chunk?).await?;
                }
            }
            RenderBody::Static(html) => self.send_chunk(html.into_bytes()).await?,
        }

        self.end().await
    }

    async fn send(&mut self, msg: OutgoingMessage) -> Result<(), WorkerError> {
        self.inner
            .send(msg)
            .await
            .map_err(|e| WorkerError::Channel(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;
    use futures::stream;

    fn collect(rx: mpsc::UnboundedReceiver<OutgoingMessage>) -> Vec<OutgoingMessage> {
        let mut rx = rx;
        let mut out = Vec::new();
        while let Ok(Some(msg)) = rx.try_next() {
            out.push(msg);
        }
        out
    }

    fn headers(content_type: &str) -> OutgoingMessage {
        OutgoingMessage::Headers(ResponseHeaders {
            status: 200,
            headers: vec![("Content-Type".into(), content_type.into())],
        })
    }

    #[tokio::test]
    async fn test_static_result_single_chunk() {
        let (mut tx, rx) = mpsc::unbounded();
        let mut timing = TimingContext::new();
        let mut sink = ResponseSink::new(&mut tx, &mut timing);

        let summary = sink.stream(RenderResult::complete("<p>hi</p>")).await.unwrap();
        drop(sink);
        drop(tx);

        assert_eq!(summary, StreamSummary { chunks: 1, bytes: 9 });
        assert_eq!(
            collect(rx),
            vec![
                headers(crate::MIME_TEXT_HTML_UTF8),
                OutgoingMessage::BodyChunk(b"<p>hi</p>".to_vec()),
                OutgoingMessage::BodyEnd,
            ]
        );
        assert!(timing.time_to_headers().is_some());
    }

    #[tokio::test]
    async fn test_dynamic_result_preserves_order() {
        let (mut tx, rx) = mpsc::unbounded();
        let mut timing = TimingContext::new();
        let body = stream::iter(vec![
            Ok::<_, WorkerError>(b"a".to_vec()),
            Ok(b"b".to_vec()),
            Ok(b"c".to_vec()),
        ]);
        let result = RenderResult::dynamic(Box::pin(body)).with_content_type("text/x-component");

        let summary = ResponseSink::new(&mut tx, &mut timing)
            .stream(result)
            .await
            .unwrap();
        drop(tx);

        assert_eq!(summary.chunks, 3);
        assert_eq!(
            collect(rx),
            vec![
                headers("text/x-component"),
                OutgoingMessage::BodyChunk(b"a".to_vec()),
                OutgoingMessage::BodyChunk(b"b".to_vec()),
                OutgoingMessage::BodyChunk(b"c".to_vec()),
                OutgoingMessage::BodyEnd,
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_dynamic_result() {
        let (mut tx, rx) = mpsc::unbounded();
        let mut timing = TimingContext::new();
        let result = RenderResult::dynamic(Box::pin(stream::empty::<Result<Vec<u8>, WorkerError>>()));

        ResponseSink::new(&mut tx, &mut timing).stream(result).await.unwrap();
        drop(tx);

        let messages = collect(rx);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1], OutgoingMessage::BodyEnd);
    }

    #[tokio::test]
    async fn test_stream_error_stops_body() {
        let (mut tx, rx) = mpsc::unbounded();
        let mut timing = TimingContext::new();
        let body = stream::iter(vec![
            Ok(b"a".to_vec()),
            Err(WorkerError::Engine("boom".into())),
            Ok(b"never".to_vec()),
        ]);

        let err = ResponseSink::new(&mut tx, &mut timing)
            .stream(RenderResult::dynamic(Box::pin(body)))
            .await
            .unwrap_err();
        drop(tx);

        assert!(matches!(err, WorkerError::Engine(_)));
        let messages = collect(rx);
        assert_eq!(messages.len(), 2);
        assert!(!messages.contains(&OutgoingMessage::BodyEnd));
    }

    #[tokio::test]
    async fn test_ordering_enforced() {
        let (mut tx, _rx) = mpsc::unbounded();
        let mut timing = TimingContext::new();
        let mut sink = ResponseSink::new(&mut tx, &mut timing);

        assert!(matches!(
            sink.send_chunk(b"x".to_vec()).await,
            Err(WorkerError::Stream(_))
        ));
        assert!(matches!(sink.end().await, Err(WorkerError::Stream(_))));

        sink.send_headers(200, Vec::new()).await.unwrap();
        assert!(sink.send_headers(200, Vec::new()).await.is_err());
        sink.end().await.unwrap();
        assert!(sink.send_chunk(b"late".to_vec()).await.is_err());
    }

    #[tokio::test]
    async fn test_closed_channel_is_channel_error() {
        let (mut tx, rx) = mpsc::unbounded::<OutgoingMessage>();
        drop(rx);
        let mut timing = TimingContext::new();

        let err = ResponseSink::new(&mut tx, &mut timing)
            .send_headers(200, Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Channel(_)));
    }

    #[tokio::test]
    async fn test_fail_sends_error_report() {
        let (mut tx, rx) = mpsc::unbounded();
        let mut timing = TimingContext::new();

        ResponseSink::new(&mut tx, &mut timing)
            .fail(&WorkerError::EmptyRenderResult)
            .await
            .unwrap();
        drop(tx);

        let messages = collect(rx);
        assert!(matches!(
            &messages[..],
            [OutgoingMessage::Error(report)] if report.name == "EmptyRenderResult"
        ));
    }
}
