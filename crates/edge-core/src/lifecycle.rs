//! Worker lifecycle tracking.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

/// States of the render bridge loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Blocked on the channel, waiting for the next request.
    AwaitRequest,
    /// Building render inputs and waiting for the engine.
    Rendering,
    /// Forwarding the render result over the channel.
    Streaming,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitRequest => write!(f, "await_request"),
            Self::Rendering => write!(f, "rendering"),
            Self::Streaming => write!(f, "streaming"),
        }
    }
}

/// Timing context for one request.
#[derive(Debug, Clone)]
pub struct TimingContext {
    start: Instant,
    marks: HashMap<String, Instant>,
}

impl TimingContext {
    /// Create a new timing context.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            marks: HashMap::new(),
        }
    }

    /// Record a timing mark.
    pub fn mark(&mut self, name: &str) {
        self.marks.insert(name.to_string(), Instant::now());
    }

    /// Get elapsed time since start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time from start to a recorded mark.
    pub fn since_start(&self, name: &str) -> Option<Duration> {
        self.marks.get(name).map(|t| t.duration_since(self.start))
    }

    /// Time between two recorded marks.
    pub fn between(&self, from: &str, to: &str) -> Option<Duration> {
        let from = self.marks.get(from)?;
        let to = self.marks.get(to)?;
        Some(to.saturating_duration_since(*from))
    }

    /// Time until the engine returned a result.
    pub fn render_time(&self) -> Option<Duration> {
        self.between("render_start", "render_done")
    }

    /// Time until the headers message went out.
    pub fn time_to_headers(&self) -> Option<Duration> {
        self.since_start("headers_sent")
    }
}

impl Default for TimingContext {
    fn default() -> Self {
        Self::new()
    }
}
