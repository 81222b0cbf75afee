//! Chunk index keyed by component chunk key.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Build chunks per chunk key, in insertion order.
///
/// Keys are `"page"` for the routing leaf and `"{fileType}{recordIndex}"`
/// for every other component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkIndex {
    entries: Vec<(String, Vec<String>)>,
}

impl ChunkIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert chunks for a key, replacing any previous entry in place.
    pub fn insert(&mut self, key: impl Into<String>, chunks: Vec<String>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = chunks,
            None => self.entries.push((key, chunks)),
        }
    }

    /// Chunks for a key.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, chunks)| chunks.as_slice())
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, chunks)| (k.as_str(), chunks.as_slice()))
    }

    /// All chunk paths, entry by entry.
    pub fn flatten(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .flat_map(|(_, chunks)| chunks.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ChunkIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, chunks) in &self.entries {
            map.serialize_entry(key, chunks)?;
        }
        map.end()
    }
}

/// Whether a chunk path is a stylesheet.
pub fn is_css(path: &str) -> bool {
    path.ends_with(".css")
}

/// Whether a chunk path is a script.
pub fn is_script(path: &str) -> bool {
    path.ends_with(".js")
}

/// Scripts the client loads on startup.
///
/// Every indexed chunk in index order, then the bootstrap chunks, keeping
/// only scripts. Duplicates are kept.
pub fn root_main_files(index: &ChunkIndex, bootstrap: &[String]) -> Vec<String> {
    index
        .flatten()
        .chain(bootstrap.iter().map(String::as_str))
        .filter(|path| is_script(path))
        .map(String::from)
        .collect()
}
