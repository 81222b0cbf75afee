//! Core data model for the edge render worker.
//!
//! This crate provides the fundamental types shared by every stage:
//! - `BuildMetadata` - Layout records and bootstrap chunks supplied at startup
//! - `RenderRequest` - The inbound render request payload
//! - `RequestShim` / `ResponseShim` - Plain request/response records for the engine
//! - `WorkerState` - Bridge lifecycle tracking
//! - `WorkerError` - The worker error taxonomy

mod config;
mod context;
mod error;
mod lifecycle;

pub use config::*;
pub use context::*;
pub use error::*;
pub use lifecycle::*;
