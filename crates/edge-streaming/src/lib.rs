//! Response streaming for the render worker.
//!
//! - `RenderResult` - Dynamic or static output of the rendering engine
//! - `ResponseSink` - Enforces `headers → bodyChunk* → bodyEnd` ordering

mod result;
mod sink;

pub use result::*;
pub use sink::*;
