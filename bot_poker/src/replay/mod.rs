//! Replay persistence plumbing.

pub mod recorder;

pub use recorder::{MemorySink, ReplayRecorder, ReplaySink};
