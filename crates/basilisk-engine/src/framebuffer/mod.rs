//! Offscreen framebuffers and the renderables that draw into them.

mod framebuffer;
mod renderable;
mod screen_quad;

pub use framebuffer::Framebuffer;
pub use renderable::Renderable;
pub use screen_quad::{SCREEN_QUAD, ScreenVertex};
