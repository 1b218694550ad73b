//! Coordinate, size and color types shared by batches, framebuffers and the runtime.
//!
//! World space is whatever the batch camera maps to clip space; with the
//! orthographic camera this is pixels with a bottom-left origin (+Y up).

mod color;
mod vec2;
mod viewport;

pub use color::{ClearColor, Rgba8};
pub use vec2::{Vec2, Vec3};
pub use viewport::Viewport;
