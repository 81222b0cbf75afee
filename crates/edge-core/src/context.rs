//! Render request payload and the request/response shims built from it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

/// Unique request identifier for log correlation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

impl RequestId {
    /// Generate a new request ID.
    ///
    /// IDs are unique within one worker process: a process start stamp
    /// followed by a monotonically increasing sequence number.
    pub fn generate() -> Self {
        let seq = NEXT_REQUEST.fetch_add(1, Ordering::Relaxed);
        Self(format!("{:x}-{}-{:06}", process_stamp(), std::process::id(), seq))
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

fn process_stamp() -> u64 {
    use std::sync::OnceLock;

    static STAMP: OnceLock<u64> = OnceLock::new();
    *STAMP.get_or_init(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    })
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extracted route parameters (e.g. `slug` from `/blog/[slug]`).
pub type RouteParams = BTreeMap<String, String>;

/// Inbound render request, as carried by a `headers` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    /// Original request URL.
    pub url: String,
    /// HTTP method.
    pub method: String,
    /// Header entries in arrival order.
    #[serde(default)]
    pub raw_headers: Vec<(String, String)>,
    /// Raw query string, without the leading `?`.
    #[serde(default)]
    pub raw_query: String,
    /// Route path to render.
    pub path: String,
    /// Route parameters.
    #[serde(default)]
    pub params: RouteParams,
}

impl RenderRequest {
    /// Create a GET request for a path.
    pub fn get(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            url: path.clone(),
            method: "GET".to_string(),
            path,
            ..Self::default()
        }
    }

    /// Add a raw header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.raw_headers.push((name.into(), value.into()));
        self
    }

    /// Set the raw query string.
    pub fn with_query(mut self, raw_query: impl Into<String>) -> Self {
        self.raw_query = raw_query.into();
        self
    }

    /// Add a route parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Build the request shim handed to the rendering engine.
    pub fn to_shim(&self) -> RequestShim {
        RequestShim {
            url: self.url.clone(),
            method: self.method.clone(),
            headers: headers_from_entries(&self.raw_headers),
        }
    }

    /// Parse the raw query and overlay route parameters on top of it.
    pub fn query(&self) -> Query {
        build_query(&self.raw_query, &self.params)
    }
}

/// Rebuild a header map from raw entries. Repeated names append.
pub fn headers_from_entries(entries: &[(String, String)]) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(entries.len());
    for (name, value) in entries {
        let parsed = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        );
        match parsed {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => tracing::warn!(header = %name, "skipping invalid request header"),
        }
    }
    headers
}

/// Plain request record for the rendering engine.
#[derive(Debug, Clone)]
pub struct RequestShim {
    /// Original request URL.
    pub url: String,
    /// HTTP method.
    pub method: String,
    /// Request headers.
    pub headers: HeaderMap,
}

impl RequestShim {
    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Plain response record the rendering engine may write to.
#[derive(Debug, Clone)]
pub struct ResponseShim {
    /// Status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
}

impl ResponseShim {
    /// Create a response shim with status 200.
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: HeaderMap::new(),
        }
    }
}

impl Default for ResponseShim {
    fn default() -> Self {
        Self::new()
    }
}

/// A query parameter value. Repeated keys collect into a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Multiple(Vec<String>),
}

impl QueryValue {
    /// First value.
    pub fn first(&self) -> &str {
        match self {
            Self::Single(v) => v,
            Self::Multiple(vs) => vs.first().map(String::as_str).unwrap_or_default(),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            Self::Single(first) => {
                *self = Self::Multiple(vec![std::mem::take(first), value]);
            }
            Self::Multiple(vs) => vs.push(value),
        }
    }
}

/// Query passed to the rendering engine.
pub type Query = BTreeMap<String, QueryValue>;

/// Parse `raw_query` and overlay `params`; params win on key collision.
pub fn build_query(raw_query: &str, params: &RouteParams) -> Query {
    let raw = raw_query.strip_prefix('?').unwrap_or(raw_query);
    let mut query = Query::new();

    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        let value = value.into_owned();
        match query.get_mut(key.as_ref()) {
            Some(existing) => existing.push(value),
            None => {
                query.insert(key.into_owned(), QueryValue::Single(value));
            }
        }
    }

    for (key, value) in params {
        query.insert(key.clone(), QueryValue::Single(value.clone()));
    }

    query
}
