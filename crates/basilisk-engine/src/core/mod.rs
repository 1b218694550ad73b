//! Engine-facing contracts.
//!
//! The interface between the runtime (platform loop) and application code:
//! the `App` trait and the contexts handed to it and to renderables.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{RenderCtx, SetupCtx};
