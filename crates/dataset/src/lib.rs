//! corpusedit Dataset
//!
//! The load, edit, and save cycle over a sharded speech corpus:
//! - **Loader:** Reads Parquet shards into one table with stable row ids
//! - **Editor:** Text edits, trims that split off the remainder, deletes,
//!   and resets against the loaded originals
//! - **Exporter:** Writes each shard's surviving rows to an edited copy
//!   with the shard's own schema
//!
//! Shard schemas are held by [`ShardSchema`] for the whole session.

pub mod editor;
pub mod export;
pub mod loader;
pub mod schema;

pub use editor::*;
pub use export::*;
pub use loader::*;
pub use schema::*;
