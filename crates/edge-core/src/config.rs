//! Static build metadata supplied once at worker startup.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of component a route segment can provide.
///
/// Declaration order is the order components of one record are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileType {
    Layout,
    Template,
    Error,
    Loading,
    NotFound,
    Head,
    Page,
}

impl FileType {
    /// Name used in chunk keys and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Layout => "layout",
            Self::Template => "template",
            Self::Error => "error",
            Self::Loading => "loading",
            Self::NotFound => "not-found",
            Self::Head => "head",
            Self::Page => "page",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque handle of a server module, understood only by the rendering engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleHandle(pub String);

impl ModuleHandle {
    /// Create a handle from a module identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The module identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A component module and the build chunks it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleEntry {
    /// Module handle.
    pub module: ModuleHandle,
    /// Chunk paths, in load order.
    #[serde(default)]
    pub chunks: Vec<String>,
    /// Page configuration exported by the module, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

impl ModuleEntry {
    /// Create a new module entry.
    pub fn new(module: impl Into<String>, chunks: Vec<&str>) -> Self {
        Self {
            module: ModuleHandle::new(module),
            chunks: chunks.into_iter().map(String::from).collect(),
            config: None,
        }
    }

    /// Attach a page configuration.
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }
}

/// Metadata for one route segment.
///
/// On the wire every component sits beside `segment`, e.g.
/// `{"segment": "blog", "layout": {"module": "...", "chunks": [...]}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutRecord {
    /// Segment name.
    #[serde(default)]
    pub segment: String,
    /// Components provided by this segment.
    #[serde(flatten)]
    pub components: BTreeMap<FileType, ModuleEntry>,
}

impl LayoutRecord {
    /// Create a record with no components.
    pub fn new(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            components: BTreeMap::new(),
        }
    }

    /// Add a component.
    pub fn with(mut self, file_type: FileType, entry: ModuleEntry) -> Self {
        self.components.insert(file_type, entry);
        self
    }

    /// The page component, if this record is a routing leaf.
    pub fn page(&self) -> Option<&ModuleEntry> {
        self.components.get(&FileType::Page)
    }
}

/// Process-wide, read-only render inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildMetadata {
    /// Layout records from the route root down to the page.
    #[serde(default)]
    pub layout: Vec<LayoutRecord>,
    /// Chunks of the client bootstrap script.
    #[serde(default)]
    pub bootstrap: Vec<String>,
}

impl BuildMetadata {
    /// Create build metadata.
    pub fn new(layout: Vec<LayoutRecord>, bootstrap: Vec<String>) -> Self {
        Self { layout, bootstrap }
    }
}
