//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and the single window, and wires them to the
//! GPU backend, the scene and the frame driver.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, WindowSettings};
