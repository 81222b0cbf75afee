//! Rendering engine seam.

use async_trait::async_trait;
use edge_core::{ModuleHandle, Query, RequestShim, ResponseShim, WorkerError};
use edge_manifest::LoaderTree;
use edge_streaming::RenderResult;

use crate::options::RenderOptions;

/// An external server-rendering engine.
///
/// Given a request, the loader tree and the manifests in `options`, the
/// engine produces the page payload. `Ok(None)` means it produced nothing.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    async fn render(
        &self,
        request: &RequestShim,
        response: &mut ResponseShim,
        path: &str,
        query: &Query,
        options: &RenderOptions<'_>,
    ) -> Result<Option<RenderResult>, WorkerError>;
}

/// Hooks the engine calls back into while rendering.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    tree: &'a LoaderTree,
    /// Link components use the current navigation behavior.
    pub new_link_behavior: bool,
}

impl<'a> RenderContext<'a> {
    /// Create hooks over a loader tree.
    pub fn new(tree: &'a LoaderTree) -> Self {
        Self {
            tree,
            new_link_behavior: true,
        }
    }

    /// Return the handle previously recorded for a synthetic id.
    pub fn require(&self, synthetic_id: &str) -> Option<&'a ModuleHandle> {
        self.tree.resolve(synthetic_id)
    }

    /// Chunks are preloaded by the host.
    pub fn load_chunk(&self, _path: &str) -> Result<(), WorkerError> {
        Ok(())
    }
}
