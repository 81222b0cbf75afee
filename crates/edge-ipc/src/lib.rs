//! Inter-process channel for the render worker.
//!
//! Messages travel as frames: a 4-byte big-endian length followed by
//! that many bytes of JSON.
//! - `IncomingMessage` / `OutgoingMessage` - Message schema
//! - `receiver` / `sender` - Stream and sink adapters over any byte transport

mod codec;
mod error;
mod message;

pub use codec::*;
pub use error::*;
pub use message::*;
