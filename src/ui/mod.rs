pub mod output;
pub mod progress;

pub use output::{OutputFormatter, OutputMode, ProgressAwareOutput};
pub use progress::{ProgressManager, RunProgress};
