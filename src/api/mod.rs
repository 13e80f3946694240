pub mod sinks;
pub mod traits;

pub use sinks::{MemoryStateStore, StdoutSink};
pub use traits::{StateSink, Transport};
