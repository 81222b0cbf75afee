//! Render inputs derived from static build metadata.
//!
//! - `build_loader_tree` - Nested segment tree plus a flat `ChunkIndex`
//! - `ClientReferenceManifest` - Lazy module/client-module/CSS lookups
//! - `build_css_manifest` - CSS import manifest for the renderer
//! - `html_escape_json_string` - Escape JSON for embedding in HTML

mod chunks;
mod css;
mod escape;
mod resolver;
mod tree;

pub use chunks::*;
pub use css::*;
pub use escape::*;
pub use resolver::*;
pub use tree::*;
