//! Rendering engine backed by an external command.

use std::collections::BTreeMap;
use std::process::Stdio;

use anyhow::{bail, Result};
use async_trait::async_trait;
use edge_core::{Query, RequestShim, ResponseShim, WorkerError};
use edge_render::{RenderEngine, RenderOptions};
use edge_streaming::RenderResult;
use futures::{stream, StreamExt};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};

use crate::config::EngineConfig;

/// Bytes read from the renderer per body chunk.
const READ_CHUNK: usize = 16 * 1024;

/// Runs the configured renderer once per request.
///
/// The renderer reads one JSON document from stdin and writes the page to
/// stdout. Output is forwarded as it arrives. A renderer that exits cleanly
/// without writing anything produced no result.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    content_type: Option<String>,
}

impl CommandEngine {
    /// Create an engine running `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            content_type: None,
        }
    }

    /// Create an engine from the `[engine]` config section.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let Some(program) = &config.command else {
            bail!("No renderer configured: set [engine].command");
        };

        let mut engine = Self::new(program.clone()).with_args(config.args.clone());
        engine.env = config.env.clone();
        engine.content_type = config.content_type.clone();
        Ok(engine)
    }

    /// Set program arguments.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Report a fixed content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    fn spawn(&self) -> Result<Child, WorkerError> {
        Command::new(&self.program)
            .args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WorkerError::Engine(format!("failed to start {}: {e}", self.program)))
    }
}

/// Request fields the renderer sees.
#[derive(Serialize)]
struct RequestPayload<'a> {
    url: &'a str,
    method: &'a str,
    headers: Vec<(&'a str, &'a str)>,
}

impl<'a> From<&'a RequestShim> for RequestPayload<'a> {
    fn from(request: &'a RequestShim) -> Self {
        Self {
            url: &request.url,
            method: &request.method,
            headers: request
                .headers
                .iter()
                .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)))
                .collect(),
        }
    }
}

/// Document written to the renderer's stdin.
#[derive(Serialize)]
struct EnginePayload<'a, 'o> {
    request: RequestPayload<'a>,
    path: &'a str,
    query: &'a Query,
    options: &'a RenderOptions<'o>,
}

async fn read_chunk<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, WorkerError> {
    let mut buf = vec![0u8; READ_CHUNK];
    let n = reader
        .read(&mut buf)
        .await
        .map_err(|e| WorkerError::Engine(format!("failed to read renderer output: {e}")))?;
    buf.truncate(n);
    Ok(buf)
}

async fn check_exit(child: &mut Child) -> Result<(), WorkerError> {
    let status = child
        .wait()
        .await
        .map_err(|e| WorkerError::Engine(format!("failed to wait for renderer: {e}")))?;
    if status.success() {
        Ok(())
    } else {
        Err(WorkerError::Engine(format!("renderer exited with {status}")))
    }
}

#[async_trait]
impl RenderEngine for CommandEngine {
    async fn render(
        &self,
        request: &RequestShim,
        _response: &mut ResponseShim,
        path: &str,
        query: &Query,
        options: &RenderOptions<'_>,
    ) -> Result<Option<RenderResult>, WorkerError> {
        let payload = serde_json::to_vec(&EnginePayload {
            request: RequestPayload::from(request),
            path,
            query,
            options,
        })
        .map_err(|e| WorkerError::Engine(format!("failed to encode render payload: {e}")))?;

        let mut child = self.spawn()?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| WorkerError::Engine("renderer stdin unavailable".to_string()))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerError::Engine("renderer stdout unavailable".to_string()))?;

        tracing::debug!(program = %self.program, bytes = payload.len(), "renderer started");

        // The renderer may start writing before it has read the whole payload,
        // so stdin is fed alongside the stdout reads.
        let writer = tokio::spawn(async move {
            let written = stdin.write_all(&payload).await;
            drop(stdin);
            if let Err(e) = &written {
                tracing::debug!(error = %e, "renderer did not take the full payload");
            }
            written
        });

        let first = read_chunk(&mut stdout).await?;
        if first.is_empty() {
            if let Err(err) = check_exit(&mut child).await {
                return Err(match (err, writer.await) {
                    (WorkerError::Engine(msg), Ok(Err(e))) => {
                        WorkerError::Engine(format!("{msg} (payload write failed: {e})"))
                    }
                    (err, _) => err,
                });
            }
            return Ok(None);
        }

        let rest = stream::try_unfold((stdout, child), |(mut stdout, mut child)| async move {
            let chunk = read_chunk(&mut stdout).await?;
            if chunk.is_empty() {
                check_exit(&mut child).await?;
                return Ok(None);
            }
            Ok::<_, WorkerError>(Some((chunk, (stdout, child))))
        });
        let body = stream::once(async move { Ok::<_, WorkerError>(first) })
            .chain(rest)
            .boxed();

        let result = RenderResult::dynamic(body);
        Ok(Some(match &self.content_type {
            Some(content_type) => result.with_content_type(content_type.clone()),
            None => result,
        }))
    }
}
