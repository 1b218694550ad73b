//! Per-window scene state and the per-tick frame driver.

mod driver;
mod registry;

pub use driver::{FrameDriver, TickOutcome};
pub use registry::{FramebufferId, Scene};
