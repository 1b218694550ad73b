//! Time subsystem.
//!
//! Frame timing utilities decoupled from the runtime:
//! - one `FrameClock` per window, `tick()` once per frame
//! - `FpsCounter` for the once-per-second frame rate log

mod fps;
mod frame_clock;

pub use fps::FpsCounter;
pub use frame_clock::{DEFAULT_TIME_STEP, FrameClock, FrameTime};
