//! CSS manifests derived from the chunk index.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::chunks::{is_css, ChunkIndex};
use crate::tree::PAGE_CHUNK_KEY;

/// Stylesheets per chunk key.
pub type CssFiles = BTreeMap<String, Vec<String>>;

/// CSS import manifest consumed by the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCssManifest {
    /// `"{chunkKey}.js"` to serialized `[cssPath, [cssPath]]` entries.
    pub css_imports: BTreeMap<String, Vec<String>>,
    /// `page` to the page's css imports.
    pub css_modules: BTreeMap<String, Vec<String>>,
}

impl ServerCssManifest {
    /// CSS imports of the page.
    pub fn page_imports(&self) -> &[String] {
        self.css_modules
            .get(PAGE_CHUNK_KEY)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Output of `build_css_manifest`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CssBuild {
    /// The renderer's CSS import manifest.
    pub manifest: ServerCssManifest,
    /// Stylesheet lists backing the client manifest's `cssFiles`.
    pub files: CssFiles,
}

/// Encode one CSS import entry.
///
/// The renderer expects a pair whose second element is a one-element
/// list holding the same path.
pub fn css_import_entry(path: &str) -> String {
    serde_json::json!([path, [path]]).to_string()
}

/// Build both CSS views in one pass over the index.
pub fn build_css_manifest(index: &ChunkIndex) -> CssBuild {
    let mut build = CssBuild::default();

    for (key, chunks) in index.iter() {
        let css: Vec<String> = chunks.iter().filter(|p| is_css(p)).cloned().collect();
        build.manifest.css_imports.insert(
            format!("{key}.js"),
            css.iter().map(|p| css_import_entry(p)).collect(),
        );
        build.files.insert(key.to_string(), css);
    }

    let page_imports = build
        .manifest
        .css_imports
        .get(&format!("{PAGE_CHUNK_KEY}.js"))
        .cloned()
        .unwrap_or_default();
    build
        .manifest
        .css_modules
        .insert(PAGE_CHUNK_KEY.to_string(), page_imports);

    build
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(entries: &[(&str, &[&str])]) -> ChunkIndex {
        let mut index = ChunkIndex::new();
        for (key, chunks) in entries {
            index.insert(*key, chunks.iter().map(|c| c.to_string()).collect());
        }
        index
    }

    #[test]
    fn test_page_css() {
        let build = build_css_manifest(&index(&[("page", &["p.js", "p.css"])]));

        assert_eq!(build.files["page"], ["p.css"]);
        assert_eq!(build.manifest.css_imports["page.js"], [r#"["p.css",["p.css"]]"#]);
        assert_eq!(
            build.manifest.css_modules["page"],
            build.manifest.css_imports["page.js"]
        );
        assert_eq!(build.manifest.page_imports().len(), 1);
    }

    #[test]
    fn test_every_key_gets_an_entry() {
        let build = build_css_manifest(&index(&[
            ("page", &["p.js"]),
            ("layout0", &["a.css", "l.js", "b.css"]),
        ]));

        assert!(build.files["page"].is_empty());
        assert!(build.manifest.css_imports["page.js"].is_empty());
        assert_eq!(build.files["layout0"], ["a.css", "b.css"]);
        assert_eq!(build.manifest.css_imports["layout0.js"].len(), 2);
    }

    #[test]
    fn test_no_page_defaults_empty() {
        let build = build_css_manifest(&ChunkIndex::new());

        assert!(build.manifest.page_imports().is_empty());
        assert!(build.manifest.css_modules["page"].is_empty());
    }

    #[test]
    fn test_manifest_wire_shape() {
        let build = build_css_manifest(&index(&[("page", &["p.css"])]));
        let json = serde_json::to_value(&build.manifest).unwrap();

        assert_eq!(json["cssImports"]["page.js"][0], r#"["p.css",["p.css"]]"#);
        assert_eq!(json["cssModules"]["page"], json["cssImports"]["page.js"]);
    }
}
