//! Services that run outside of a watcher.

mod probe;

pub use probe::{LatestMessage, ProbeReport, probe};
