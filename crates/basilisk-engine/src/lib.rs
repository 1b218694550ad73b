//! Basilisk engine crate.
//!
//! A thin batching and framebuffer rendering helper over wgpu and winit:
//! - [`batch`]: host-side vertex/index accumulation and GPU upload
//! - [`framebuffer`]: off-screen targets composited onto the window
//! - [`scene`]: the per-window framebuffer list and the frame driver
//! - [`backend`]: the GPU capability the above are written against
//! - [`window`]: the winit runtime that ties a window to all of it

pub mod backend;
pub mod batch;
pub mod camera;
pub mod coords;
pub mod core;
pub mod device;
pub mod error;
pub mod framebuffer;
pub mod input;
pub mod logging;
pub mod render;
pub mod scene;
pub mod texture;
pub mod time;
pub mod window;

pub use error::RenderError;
