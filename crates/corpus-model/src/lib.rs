//! corpusedit Corpus Model
//!
//! Defines the core data contracts for an editable speech corpus:
//! - **Samples:** One audio/transcript pair plus its passthrough metadata
//! - **Identity:** Stable row ids and the pristine originals they key
//! - **Shards:** Source Parquet files discovered on disk
//! - **Naming:** The filename rule for the remainder of a split clip

pub mod naming;
pub mod sample;
pub mod shard;

pub use naming::*;
pub use sample::*;
pub use shard::*;
