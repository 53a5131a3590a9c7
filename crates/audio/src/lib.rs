//! corpusedit Audio
//!
//! Clip-level audio handling for corpus samples, which are stored as WAV
//! bytes inside the shards:
//! - **Probe:** Read format and duration from the header
//! - **Slice:** Cut a millisecond range the way audio editors index clips
//! - **Split:** Keep one range and hand back the remainder as a new clip

pub mod wav;

pub use wav::*;
