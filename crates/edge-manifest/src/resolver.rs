//! Lazy client reference manifest.
//!
//! The rendering engine discovers export names while it renders, so no
//! lookup here is backed by a registry of known keys. Module ids are
//! synthetic `[chunkKey, chunks]` pairs and carry everything a lookup
//! needs; every call parses its argument afresh.

use edge_core::WorkerError;
use serde::Serialize;

use crate::css::CssFiles;

/// Resolution data for one exported name of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleExport {
    /// Module id (the synthetic id).
    pub id: String,
    /// Chunks required by the module.
    pub chunks: Vec<String>,
    /// Export name.
    pub name: String,
}

/// The top-level surfaces of the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestSurface<'a> {
    /// `ssrModuleMapping[id][name]`, see `ClientReferenceManifest::resolve_module`.
    SsrModuleMapping,
    /// `clientModules["{path}#{name}"]`, see `ClientReferenceManifest::resolve_client_module`.
    ClientModules,
    /// `cssFiles[chunkKey]`.
    CssFiles(&'a CssFiles),
}

/// Second-level resolver for one module id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleResolver {
    id: String,
    chunks: Vec<String>,
}

impl ModuleResolver {
    /// Resolve any export name. Chunks and id do not depend on the name.
    pub fn export(&self, name: &str) -> ModuleExport {
        ModuleExport {
            id: self.id.clone(),
            chunks: self.chunks.clone(),
            name: name.to_string(),
        }
    }

    /// The module id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Chunks encoded in the module id.
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }
}

/// Read-only manifest view handed to the rendering engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientReferenceManifest {
    css_files: CssFiles,
}

impl ClientReferenceManifest {
    /// Create a manifest over precomputed stylesheet lists.
    pub fn new(css_files: CssFiles) -> Self {
        Self { css_files }
    }

    /// Look up a top-level property. Unknown names are absent.
    pub fn surface(&self, name: &str) -> Option<ManifestSurface<'_>> {
        match name {
            "ssrModuleMapping" => Some(ManifestSurface::SsrModuleMapping),
            "clientModules" => Some(ManifestSurface::ClientModules),
            "cssFiles" => Some(ManifestSurface::CssFiles(&self.css_files)),
            _ => None,
        }
    }

    /// `ssrModuleMapping[id]`: a resolver answering any export name.
    pub fn resolve_module(&self, id: &str) -> Result<ModuleResolver, WorkerError> {
        Ok(ModuleResolver {
            id: id.to_string(),
            chunks: chunks_of(id)?,
        })
    }

    /// `clientModules[key]` where `key` is `"{path}#{name}"`.
    ///
    /// Splits at the last `#`, so the path may itself contain `#`.
    pub fn resolve_client_module(&self, key: &str) -> Result<ModuleExport, WorkerError> {
        let (path, name) = key
            .rsplit_once('#')
            .ok_or_else(|| WorkerError::InvalidClientModuleKey(key.to_string()))?;

        Ok(ModuleExport {
            id: path.to_string(),
            chunks: chunks_of(path)?,
            name: name.to_string(),
        })
    }

    /// `cssFiles[chunkKey]`.
    pub fn resolve_css(&self, chunk_key: &str) -> Option<&[String]> {
        self.css_files.get(chunk_key).map(Vec::as_slice)
    }

    /// All stylesheet lists.
    pub fn css_files(&self) -> &CssFiles {
        &self.css_files
    }
}

/// Second element of a synthetic `[chunkKey, chunks]` id.
fn chunks_of(id: &str) -> Result<Vec<String>, WorkerError> {
    let invalid = |reason: String| WorkerError::InvalidModuleId {
        id: id.to_string(),
        reason,
    };

    let mut pair: Vec<serde_json::Value> =
        serde_json::from_str(id).map_err(|e| invalid(e.to_string()))?;
    if pair.len() < 2 {
        return Err(invalid("expected a [key, chunks] pair".to_string()));
    }

    serde_json::from_value(pair.swap_remove(1)).map_err(|e| invalid(e.to_string()))
}
