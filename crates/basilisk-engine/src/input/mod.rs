//! Input subsystem.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! Runtime code translates platform events into `InputEvent`s through
//! [`platform::translate_window_event`].

pub mod platform;
mod state;
mod types;

pub use state::InputState;
pub use types::{InputEvent, Key, KeyState, Modifiers};
