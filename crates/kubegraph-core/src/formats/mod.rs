//! # Formats
//!
//! Wire and text forms produced by the engine. Pure transformations; file
//! I/O belongs to the caller.

pub mod digest;
pub mod snapshot;

pub use digest::content_digest;
pub use snapshot::{GraphSnapshot, WireNode, graph_from_json, graph_to_json};
