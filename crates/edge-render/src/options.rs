//! Per-request render inputs.

use std::collections::BTreeMap;

use edge_core::{BuildMetadata, ModuleHandle, RouteParams, WorkerError};
use edge_manifest::{
    build_css_manifest, build_loader_tree, root_main_files, ChunkIndex, ClientReferenceManifest,
    CssBuild, LoaderTree, LoaderTreeBuild, ServerCssManifest,
};
use serde::Serialize;

use crate::engine::RenderContext;

/// Page module file names known to the component runtime.
pub const PAGE_FILES: &[&str] = &["page.js"];

/// Script and page lists the engine uses to emit tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildManifest {
    pub polyfill_files: Vec<String>,
    pub root_main_files: Vec<String>,
    pub dev_files: Vec<String>,
    pub amp_dev_files: Vec<String>,
    pub low_priority_files: Vec<String>,
    pub pages: BTreeMap<String, Vec<String>>,
    pub amp_first_pages: Vec<String>,
}

impl BuildManifest {
    /// A manifest whose only populated list is `root_main_files`.
    pub fn with_root_main_files(root_main_files: Vec<String>) -> Self {
        Self {
            polyfill_files: Vec::new(),
            root_main_files,
            dev_files: Vec::new(),
            amp_dev_files: Vec::new(),
            low_priority_files: Vec::new(),
            pages: BTreeMap::from([("/_app".to_string(), Vec::new())]),
            amp_first_pages: Vec::new(),
        }
    }
}

/// Component runtime metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentModule<'a> {
    pub tree: &'a LoaderTree,
    pub pages: &'static [&'static str],
    pub page: &'a ModuleHandle,
}

/// Everything the engine receives besides the request itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions<'a> {
    pub params: &'a RouteParams,
    #[serde(rename = "supportsDynamicHTML")]
    pub supports_dynamic_html: bool,
    pub dev: bool,
    pub runtime: &'static str,
    pub server_components: bool,
    pub asset_prefix: &'static str,
    pub build_manifest: &'a BuildManifest,
    pub component_mod: ComponentModule<'a>,
    pub client_reference_manifest: &'a ClientReferenceManifest,
    pub server_css_manifest: &'a ServerCssManifest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_config: Option<&'a serde_json::Value>,
    pub react_loadable_manifest: BTreeMap<String, serde_json::Value>,
    #[serde(skip)]
    pub context: RenderContext<'a>,
}

/// Tree and manifests built from the build metadata for one request.
#[derive(Debug, Clone)]
pub struct RenderInputs {
    tree: LoaderTreeBuild,
    server_css: ServerCssManifest,
    client_manifest: ClientReferenceManifest,
    build_manifest: BuildManifest,
}

impl RenderInputs {
    /// Build the loader tree, chunk index and manifests.
    pub fn build(metadata: &BuildMetadata) -> Result<Self, WorkerError> {
        let tree = build_loader_tree(&metadata.layout)?;
        let CssBuild { manifest, files } = build_css_manifest(&tree.chunks);
        let build_manifest =
            BuildManifest::with_root_main_files(root_main_files(&tree.chunks, &metadata.bootstrap));

        tracing::debug!(
            depth = tree.tree.depth(),
            chunk_keys = tree.chunks.len(),
            root_main_files = build_manifest.root_main_files.len(),
            "render inputs built"
        );

        Ok(Self {
            tree,
            server_css: manifest,
            client_manifest: ClientReferenceManifest::new(files),
            build_manifest,
        })
    }

    /// Borrow the inputs as engine options.
    pub fn options<'a>(&'a self, params: &'a RouteParams) -> RenderOptions<'a> {
        RenderOptions {
            params,
            supports_dynamic_html: true,
            dev: true,
            runtime: "nodejs",
            server_components: true,
            asset_prefix: "",
            build_manifest: &self.build_manifest,
            component_mod: ComponentModule {
                tree: &self.tree.tree,
                pages: PAGE_FILES,
                page: &self.tree.page.module,
            },
            client_reference_manifest: &self.client_manifest,
            server_css_manifest: &self.server_css,
            page_config: self.tree.page.config.as_ref(),
            react_loadable_manifest: BTreeMap::new(),
            context: RenderContext::new(&self.tree.tree),
        }
    }

    /// The chunk index.
    pub fn chunks(&self) -> &ChunkIndex {
        &self.tree.chunks
    }

    /// The loader tree root.
    pub fn tree(&self) -> &LoaderTree {
        &self.tree.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_core::{FileType, LayoutRecord, ModuleEntry};

    fn metadata() -> BuildMetadata {
        BuildMetadata::new(
            vec![
                LayoutRecord::new("")
                    .with(FileType::Layout, ModuleEntry::new("root-layout", vec!["l.js", "l.css"])),
                LayoutRecord::new("blog").with(
                    FileType::Page,
                    ModuleEntry::new("blog-page", vec!["p.js", "p.css"])
                        .with_config(serde_json::json!({"revalidate": 0})),
                ),
            ],
            vec!["main.js".to_string(), "main.css".to_string()],
        )
    }

    // === Assembly Tests ===

    #[test]
    fn test_build_inputs() {
        let inputs = RenderInputs::build(&metadata()).unwrap();

        assert_eq!(inputs.tree().depth(), 2);
        assert_eq!(inputs.chunks().keys().collect::<Vec<_>>(), vec!["page", "layout0"]);
        assert_eq!(
            inputs.build_manifest.root_main_files,
            vec!["p.js", "l.js", "main.js"]
        );
    }

    #[test]
    fn test_missing_page_fails() {
        let metadata = BuildMetadata::new(vec![LayoutRecord::new("")], Vec::new());
        assert!(matches!(
            RenderInputs::build(&metadata),
            Err(WorkerError::MissingPageModule)
        ));
    }

    #[test]
    fn test_options_flags_and_manifests() {
        let inputs = RenderInputs::build(&metadata()).unwrap();
        let params = RouteParams::from([("slug".to_string(), "a".to_string())]);
        let options = inputs.options(&params);

        assert!(options.supports_dynamic_html);
        assert!(options.dev);
        assert!(options.context.new_link_behavior);
        assert_eq!(options.component_mod.page.as_str(), "blog-page");
        assert_eq!(options.server_css_manifest.page_imports().len(), 1);
        assert_eq!(
            options.client_reference_manifest.resolve_css("layout0"),
            Some(&["l.css".to_string()][..])
        );
        assert_eq!(options.page_config, Some(&serde_json::json!({"revalidate": 0})));
    }

    #[test]
    fn test_context_require_resolves_tree_ids() {
        let inputs = RenderInputs::build(&metadata()).unwrap();
        let params = RouteParams::new();
        let options = inputs.options(&params);

        let page_id = &inputs.tree().leaf().components[&FileType::Page].synthetic_id;
        assert_eq!(options.context.require(page_id).map(|h| h.as_str()), Some("blog-page"));
        assert!(options.context.require(r#"["nope",[]]"#).is_none());
        assert!(options.context.load_chunk("anything.js").is_ok());
    }

    #[test]
    fn test_options_serialize() {
        let inputs = RenderInputs::build(&metadata()).unwrap();
        let params = RouteParams::new();
        let json = serde_json::to_value(inputs.options(&params)).unwrap();

        assert_eq!(json["supportsDynamicHTML"], true);
        assert_eq!(json["runtime"], "nodejs");
        assert_eq!(json["buildManifest"]["pages"]["/_app"], serde_json::json!([]));
        assert_eq!(json["componentMod"]["pages"], serde_json::json!(["page.js"]));
        assert_eq!(json["componentMod"]["page"], "blog-page");
        assert_eq!(json["clientReferenceManifest"]["cssFiles"]["page"], serde_json::json!(["p.css"]));
        assert!(json.get("context").is_none());
    }
}
