//! GPU device + surface management.
//!
//! - creates the wgpu Instance/Adapter/Device/Queue
//! - creates & configures the Surface (swapchain) and its depth attachment
//! - acquires frames and provides encoders/views for rendering

mod error;
mod frame;
mod gpu;
mod init;
pub(crate) mod surface;

pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
