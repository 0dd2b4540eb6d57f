//! Process-wide `tracing` setup shared by the settlement binaries.
pub mod logging;

pub use logging::{init, LogConfig, LogFormat, LogOutput};
