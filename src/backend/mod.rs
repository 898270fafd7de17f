//! Backend module - key -> bytes persistence for the vector store

mod traits;
mod lock;
mod memory;
mod segment;

pub use traits::{KvReader, KvWriter};
pub use memory::MemoryBackend;
pub use segment::{SegmentReader, SegmentWriter};
