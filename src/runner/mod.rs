pub mod context;
pub mod slot;

pub use context::{EventSink, LogLevel, RunContext, RunEvent, RunReport, SkippedEntry, Tool};
pub use slot::{RunHandle, ToolSlot};
