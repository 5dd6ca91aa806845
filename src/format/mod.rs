//! Container collaborators.
//!
//! Real container readers and writers live outside this crate and plug in
//! through [`crate::av::Demuxer`] and [`crate::av::Muxer`]. The in-memory
//! implementations here back tests and smoke runs.

pub mod memory;

pub use self::memory::{MemoryDemuxer, MemoryMuxer, MuxedOutput};
