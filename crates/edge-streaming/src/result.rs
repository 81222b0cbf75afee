//! Render results as produced by the rendering engine.

use std::fmt;

use edge_core::WorkerError;
use futures::stream::BoxStream;

/// Content type used when the result does not name one.
pub const MIME_TEXT_HTML_UTF8: &str = "text/html; charset=utf-8";

/// Body chunks of a dynamic result, in production order.
pub type BodyStream = BoxStream<'static, Result<Vec<u8>, WorkerError>>;

/// Body of a render result.
pub enum RenderBody {
    /// Produced incrementally.
    Dynamic(BodyStream),
    /// Already complete.
    Static(String),
}

impl fmt::Debug for RenderBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
            Self::Static(s) => f.debug_tuple("Static").field(&s.len()).finish(),
        }
    }
}

/// Output of one render.
#[derive(Debug)]
pub struct RenderResult {
    content_type: Option<String>,
    body: RenderBody,
}

impl RenderResult {
    /// A result whose body is still being produced.
    pub fn dynamic(body: BodyStream) -> Self {
        Self {
            content_type: None,
            body: RenderBody::Dynamic(body),
        }
    }

    /// A fully materialized result.
    pub fn complete(html: impl Into<String>) -> Self {
        Self {
            content_type: None,
            body: RenderBody::Static(html.into()),
        }
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Content type, defaulting to UTF-8 HTML.
    pub fn content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or(MIME_TEXT_HTML_UTF8)
    }

    /// Whether the body is produced incrementally.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.body, RenderBody::Dynamic(_))
    }

    /// Take the body.
    pub fn into_body(self) -> RenderBody {
        self.body
    }
}
