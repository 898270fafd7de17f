//! Store module - embedding source parsing, building, and the read path

pub mod meta;
mod builder;
mod codec;
mod origin;
mod source;
mod vector_store;

pub use builder::DEFAULT_COMMIT_INTERVAL;
pub use origin::StoreOrigin;
pub use vector_store::{StoreOptions, VectorStore};
