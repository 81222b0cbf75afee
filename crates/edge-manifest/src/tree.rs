//! Loader tree reconstruction from ordered layout metadata.

use std::collections::BTreeMap;

use edge_core::{FileType, LayoutRecord, ModuleEntry, ModuleHandle, WorkerError};
use serde::ser::{SerializeTuple, Serializer};
use serde::Serialize;

use crate::chunks::ChunkIndex;

/// Key under which each node stores its single child.
pub const CHILDREN_KEY: &str = "children";

/// Chunk key of the routing leaf.
pub const PAGE_CHUNK_KEY: &str = "page";

/// A component module paired with its synthetic id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRef {
    /// Module handle.
    pub handle: ModuleHandle,
    /// JSON `[chunkKey, chunks]` pair, resolvable without a lookup table.
    pub synthetic_id: String,
}

impl ComponentRef {
    fn new(handle: &ModuleHandle, chunk_key: &str, chunks: &[String]) -> Self {
        Self {
            handle: handle.clone(),
            synthetic_id: synthetic_id(chunk_key, chunks),
        }
    }
}

/// Encode a synthetic id for a chunk key and its chunks.
pub fn synthetic_id(chunk_key: &str, chunks: &[String]) -> String {
    serde_json::json!([chunk_key, chunks]).to_string()
}

/// One route segment of the loader tree.
///
/// Serializes as the `[segment, children, components]` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderTree {
    /// Segment name.
    pub segment: String,
    /// Nested segments by child key.
    pub children: BTreeMap<String, LoaderTree>,
    /// Components rendered at this depth.
    pub components: BTreeMap<FileType, ComponentRef>,
}

impl LoaderTree {
    /// Number of levels from this node down to the leaf.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .values()
            .map(LoaderTree::depth)
            .max()
            .unwrap_or(0)
    }

    /// The routing leaf reached through `children`.
    pub fn leaf(&self) -> &LoaderTree {
        let mut node = self;
        while let Some(child) = node.children.get(CHILDREN_KEY) {
            node = child;
        }
        node
    }

    /// Find the module handle registered under a synthetic id.
    pub fn resolve(&self, synthetic_id: &str) -> Option<&ModuleHandle> {
        self.components
            .values()
            .find(|c| c.synthetic_id == synthetic_id)
            .map(|c| &c.handle)
            .or_else(|| self.children.values().find_map(|c| c.resolve(synthetic_id)))
    }
}

impl Serialize for LoaderTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.segment)?;
        tuple.serialize_element(&self.children)?;
        tuple.serialize_element(&self.components)?;
        tuple.end()
    }
}

/// Output of `build_loader_tree`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderTreeBuild {
    /// Root of the tree (outermost layout).
    pub tree: LoaderTree,
    /// Chunks per chunk key.
    pub chunks: ChunkIndex,
    /// The page module entry.
    pub page: ModuleEntry,
}

/// Fold ordered layout metadata into a loader tree and chunk index.
///
/// The last record is the routing leaf and must carry a page. The walk
/// goes from the page's parent up to the route root, wrapping the tree
/// built so far as the sole child of each record's node.
pub fn build_loader_tree(layout: &[LayoutRecord]) -> Result<LoaderTreeBuild, WorkerError> {
    let (leaf, parents) = layout.split_last().ok_or(WorkerError::MissingPageModule)?;
    let page = leaf.page().ok_or(WorkerError::MissingPageModule)?;

    let mut chunks = ChunkIndex::new();
    chunks.insert(PAGE_CHUNK_KEY, page.chunks.clone());

    let mut tree = LoaderTree {
        segment: String::new(),
        children: BTreeMap::new(),
        components: BTreeMap::from([(
            FileType::Page,
            ComponentRef::new(&page.module, PAGE_CHUNK_KEY, &page.chunks),
        )]),
    };

    for (i, record) in parents.iter().enumerate().rev() {
        let mut components = BTreeMap::new();
        for (file_type, entry) in &record.components {
            let key = format!("{file_type}{i}");
            components.insert(
                *file_type,
                ComponentRef::new(&entry.module, &key, &entry.chunks),
            );
            chunks.insert(key, entry.chunks.clone());
        }

        tree = LoaderTree {
            segment: record.segment.clone(),
            children: BTreeMap::from([(CHILDREN_KEY.to_string(), tree)]),
            components,
        };
    }

    Ok(LoaderTreeBuild {
        tree,
        chunks,
        page: page.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blog_layout() -> Vec<LayoutRecord> {
        vec![
            LayoutRecord::new("")
                .with(FileType::Layout, ModuleEntry::new("root/layout", vec!["root.js", "root.css"]))
                .with(FileType::NotFound, ModuleEntry::new("root/not-found", vec!["nf.js"])),
            LayoutRecord::new("blog")
                .with(FileType::Layout, ModuleEntry::new("blog/layout", vec!["blog.js"]))
                .with(FileType::Loading, ModuleEntry::new("blog/loading", vec!["loading.js"])),
            LayoutRecord::new("[slug]")
                .with(FileType::Page, ModuleEntry::new("blog/page", vec!["page.js", "page.css"])),
        ]
    }

    // === Shape Tests ===

    #[test]
    fn test_depth_matches_metadata_length() {
        let layout = blog_layout();
        let build = build_loader_tree(&layout).unwrap();

        assert_eq!(build.tree.depth(), layout.len());
        assert_eq!(build.tree.segment, "");
        assert_eq!(build.tree.children[CHILDREN_KEY].segment, "blog");
    }

    #[test]
    fn test_leaf_holds_exactly_page() {
        let build = build_loader_tree(&blog_layout()).unwrap();
        let leaf = build.tree.leaf();

        assert_eq!(leaf.components.keys().collect::<Vec<_>>(), [&FileType::Page]);
        assert!(leaf.children.is_empty());
        assert_eq!(leaf.segment, "");
        assert_eq!(leaf.components[&FileType::Page].handle.as_str(), "blog/page");
    }

    #[test]
    fn test_single_record_is_leaf_only() {
        let layout = vec![LayoutRecord::new("").with(FileType::Page, ModuleEntry::new("p", vec!["p.js"]))];
        let build = build_loader_tree(&layout).unwrap();

        assert_eq!(build.tree.depth(), 1);
        assert_eq!(build.chunks.keys().collect::<Vec<_>>(), ["page"]);
    }

    #[test]
    fn test_empty_record_still_adds_level() {
        let layout = vec![
            LayoutRecord::new("(group)"),
            LayoutRecord::new("").with(FileType::Page, ModuleEntry::new("p", vec!["p.js"])),
        ];
        let build = build_loader_tree(&layout).unwrap();

        assert_eq!(build.tree.depth(), 2);
        assert_eq!(build.tree.segment, "(group)");
        assert!(build.tree.components.is_empty());
        assert_eq!(build.chunks.len(), 1);
    }

    // === Chunk Index Tests ===

    #[test]
    fn test_chunk_keys_exact() {
        let build = build_loader_tree(&blog_layout()).unwrap();

        assert_eq!(
            build.chunks.keys().collect::<Vec<_>>(),
            ["page", "layout1", "loading1", "layout0", "not-found0"]
        );
        assert_eq!(build.chunks.get("layout0").unwrap(), ["root.js", "root.css"]);
    }

    #[test]
    fn test_record_components_follow_file_type_order() {
        let layout: Vec<LayoutRecord> = serde_json::from_str(
            r#"[
                {"segment": "", "not-found": {"module": "nf", "chunks": ["nf.js"]},
                    "loading": {"module": "ld", "chunks": ["ld.js"]},
                    "layout": {"module": "root", "chunks": ["root.js"]}},
                {"segment": "", "page": {"module": "p", "chunks": ["p.js"]}}
            ]"#,
        )
        .unwrap();
        let build = build_loader_tree(&layout).unwrap();

        assert_eq!(
            build.chunks.keys().collect::<Vec<_>>(),
            ["page", "layout0", "loading0", "not-found0"]
        );
    }

    #[test]
    fn test_synthetic_ids_encode_key_and_chunks() {
        let build = build_loader_tree(&blog_layout()).unwrap();
        let layout = &build.tree.components[&FileType::Layout];

        assert_eq!(layout.synthetic_id, r#"["layout0",["root.js","root.css"]]"#);
        assert_eq!(
            build.tree.leaf().components[&FileType::Page].synthetic_id,
            r#"["page",["page.js","page.css"]]"#
        );
    }

    #[test]
    fn test_resolve_by_synthetic_id() {
        let build = build_loader_tree(&blog_layout()).unwrap();

        let handle = build.tree.resolve(r#"["loading1",["loading.js"]]"#).unwrap();
        assert_eq!(handle.as_str(), "blog/loading");
        assert!(build.tree.resolve(r#"["loading9",[]]"#).is_none());
    }

    // === Failure Tests ===

    #[test]
    fn test_empty_metadata_fails() {
        assert!(matches!(
            build_loader_tree(&[]),
            Err(WorkerError::MissingPageModule)
        ));
    }

    #[test]
    fn test_leaf_without_page_fails() {
        let layout = vec![LayoutRecord::new("").with(FileType::Layout, ModuleEntry::new("l", vec![]))];
        assert!(matches!(
            build_loader_tree(&layout),
            Err(WorkerError::MissingPageModule)
        ));
    }

    #[test]
    fn test_serializes_as_triple() {
        let layout = vec![LayoutRecord::new("").with(FileType::Page, ModuleEntry::new("p", vec![]))];
        let build = build_loader_tree(&layout).unwrap();

        assert_eq!(
            serde_json::to_value(&build.tree).unwrap(),
            serde_json::json!(["", {}, {"page": {"handle": "p", "syntheticId": "[\"page\",[]]"}}])
        );
    }
}
