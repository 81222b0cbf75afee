//! Render bridge for the edge render worker.
//!
//! Key types:
//! - `RenderBridge` - Request loop over the IPC channel
//! - `RenderEngine` - The external renderer seam
//! - `RenderOptions` - Per-request inputs handed to the engine
//! - `RenderContext` - Module resolution hooks exposed to the engine

mod bridge;
mod engine;
mod options;

pub use bridge::*;
pub use engine::*;
pub use options::*;
