//! wgpu implementation of [`crate::backend::GpuBackend`].
//!
//! Conventions:
//! - clip space follows wgpu: depth in `[0, 1]`, `+Y` up
//! - off-screen targets carry their own depth attachment
//! - built-in programs live in `shaders/` and are compiled at startup

mod common;
mod pipeline;
mod wgpu_backend;

pub use wgpu_backend::WgpuBackend;
