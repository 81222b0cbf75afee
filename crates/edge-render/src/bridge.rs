//! Request loop between the IPC channel and the rendering engine.

use std::sync::Arc;

use edge_core::{
    BuildMetadata, RenderRequest, RequestId, ResponseShim, TimingContext, WorkerError, WorkerState,
};
use edge_ipc::{IncomingMessage, IpcError, OutgoingMessage};
use edge_observability::StructuredLogger;
use edge_streaming::{ResponseSink, StreamSummary};
use futures::{Sink, Stream, StreamExt};

use crate::engine::RenderEngine;
use crate::options::RenderInputs;

/// Serves render requests one at a time until the channel closes.
///
/// Each request moves through `AwaitRequest → Rendering → Streaming` and
/// back. Any failure ends the loop: reportable errors are sent to the host
/// as a single error message first, protocol violations and channel
/// failures are not.
pub struct RenderBridge<In, Out, E> {
    incoming: In,
    outgoing: Out,
    engine: E,
    metadata: Arc<BuildMetadata>,
    logger: StructuredLogger,
    state: WorkerState,
}

impl<In, Out, E> RenderBridge<In, Out, E>
where
    In: Stream<Item = Result<IncomingMessage, IpcError>> + Unpin,
    Out: Sink<OutgoingMessage, Error = IpcError> + Unpin,
    E: RenderEngine,
{
    /// Create a bridge over both halves of the channel.
    pub fn new(incoming: In, outgoing: Out, engine: E, metadata: Arc<BuildMetadata>) -> Self {
        Self {
            incoming,
            outgoing,
            engine,
            metadata,
            logger: StructuredLogger::new(),
            state: WorkerState::AwaitRequest,
        }
    }

    /// Set the worker-scoped logger.
    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Current state.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Run until the inbound channel ends cleanly or a request fails.
    ///
    /// Returns the number of requests served. Any error returned has already
    /// been written to the structured log.
    pub async fn run(&mut self) -> Result<u64, WorkerError> {
        let mut served = 0;

        loop {
            self.transition(WorkerState::AwaitRequest);

            let request = match self.next_request().await {
                Ok(Some(request)) => request,
                Ok(None) => {
                    self.logger
                        .info_builder("channel closed")
                        .field_u64("served", served)
                        .emit();
                    return Ok(served);
                }
                Err(err) => {
                    self.logger
                        .error_builder(err.to_string())
                        .field("code", err.code())
                        .emit();
                    return Err(err);
                }
            };

            self.handle(request).await?;
            served += 1;
        }
    }

    async fn next_request(&mut self) -> Result<Option<RenderRequest>, WorkerError> {
        match self.incoming.next().await {
            None => Ok(None),
            Some(message) => match message? {
                IncomingMessage::Headers(request) => Ok(Some(request)),
                IncomingMessage::Unknown(kind) => Err(WorkerError::ProtocolViolation(kind)),
            },
        }
    }

    async fn handle(&mut self, request: RenderRequest) -> Result<(), WorkerError> {
        let logger = self.logger.for_request(RequestId::generate(), &request.path);
        let mut timing = TimingContext::new();
        timing.mark("request_received");
        logger
            .debug_builder("request received")
            .field("method", &request.method)
            .field("url", &request.url)
            .emit();

        match self.render_and_stream(&request, &mut timing).await {
            Ok(summary) => {
                logger
                    .info_builder("request complete")
                    .field_u64("chunks", summary.chunks as u64)
                    .field_u64("bytes", summary.bytes as u64)
                    .maybe_duration_ms("render_ms", timing.render_time())
                    .maybe_duration_ms("ttfb_ms", timing.time_to_headers())
                    .duration_ms("total_ms", timing.elapsed())
                    .emit();
                Ok(())
            }
            Err(err) => {
                logger
                    .error_builder(err.to_string())
                    .field("code", err.code())
                    .field("state", self.state.to_string())
                    .duration_ms("total_ms", timing.elapsed())
                    .emit();

                if err.is_reportable() {
                    if let Err(send_err) =
                        ResponseSink::new(&mut self.outgoing, &mut timing).fail(&err).await
                    {
                        logger
                            .warn_builder("failed to report error")
                            .field("cause", send_err.to_string())
                            .emit();
                    }
                }
                Err(err)
            }
        }
    }

    async fn render_and_stream(
        &mut self,
        request: &RenderRequest,
        timing: &mut TimingContext,
    ) -> Result<StreamSummary, WorkerError> {
        self.transition(WorkerState::Rendering);

        let inputs = RenderInputs::build(&self.metadata)?;
        let options = inputs.options(&request.params);
        let shim = request.to_shim();
        let query = request.query();
        let mut response = ResponseShim::new();

        timing.mark("render_start");
        let result = self
            .engine
            .render(&shim, &mut response, &request.path, &query, &options)
            .await?
            .ok_or(WorkerError::EmptyRenderResult)?;
        timing.mark("render_done");

        self.transition(WorkerState::Streaming);
        tracing::debug!(
            dynamic = result.is_dynamic(),
            content_type = result.content_type(),
            "streaming result"
        );
        ResponseSink::new(&mut self.outgoing, timing).stream(result).await
    }

    fn transition(&mut self, next: WorkerState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "state transition");
            self.state = next;
        }
    }
}
