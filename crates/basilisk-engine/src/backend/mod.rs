//! GPU backend capability.
//!
//! Batches, framebuffers and the frame driver mutate GPU state only through
//! [`GpuBackend`]. Resources are referred to by small copyable handles; the
//! backend owns the actual objects.
//!
//! Implementations:
//! - [`crate::render::WgpuBackend`]: wgpu device + window surface
//! - [`RecordingBackend`]: headless, records every call (tests, tooling)

mod error;
mod recording;
mod types;

pub use error::BackendError;
pub use recording::{Command, RecordingBackend};
pub use types::{
    BufferDesc, BufferId, BufferUsage, ClearFlags, ColorTargetDesc, CompositeDraw, DrawMode,
    FilterMode, FrameStatus, IndexedDraw, RenderTarget, ShaderDesc, ShaderId, ShaderKind,
    TargetId, VertexAttr, VertexLayout,
};

use crate::camera::Camera;
use crate::coords::{ClearColor, Viewport};

/// Immediate-mode GPU interface in the spirit of a bound-state graphics API:
/// bind a target, pick a shader, set its uniforms, draw.
///
/// Draw and clear calls are only valid between [`begin_frame`](Self::begin_frame)
/// and [`present`](Self::present). Buffer writes are valid at any time and are
/// ordered with respect to draws recorded in the same frame.
pub trait GpuBackend {
    // ── resources ─────────────────────────────────────────────────────────

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId, BackendError>;

    /// Writes `data` at byte `offset`. Offset and length must be 4-byte aligned.
    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<(), BackendError>;

    fn destroy_buffer(&mut self, buffer: BufferId);

    fn create_color_target(&mut self, desc: &ColorTargetDesc<'_>) -> Result<TargetId, BackendError>;

    fn destroy_color_target(&mut self, target: TargetId);

    fn create_shader(&mut self, desc: &ShaderDesc<'_>) -> Result<ShaderId, BackendError>;

    // ── frame ─────────────────────────────────────────────────────────────

    /// Acquires the next swapchain image. Binds [`RenderTarget::Main`].
    fn begin_frame(&mut self) -> Result<FrameStatus, BackendError>;

    /// Submits recorded work and presents the swapchain image.
    fn present(&mut self) -> Result<(), BackendError>;

    /// Size of the main target in physical pixels.
    fn main_viewport(&self) -> Viewport;

    // ── state ─────────────────────────────────────────────────────────────

    fn bind_target(&mut self, target: RenderTarget) -> Result<(), BackendError>;

    fn bound_target(&self) -> RenderTarget;

    fn clear(&mut self, flags: ClearFlags, color: ClearColor) -> Result<(), BackendError>;

    fn set_depth_test(&mut self, enabled: bool);

    fn use_shader(&mut self, shader: ShaderId) -> Result<(), BackendError>;

    fn set_time_uniform(&mut self, shader: ShaderId, time: f32) -> Result<(), BackendError>;

    fn set_view_uniform(&mut self, shader: ShaderId, camera: &Camera) -> Result<(), BackendError>;

    fn set_projection_uniform(&mut self, shader: ShaderId, camera: &Camera) -> Result<(), BackendError>;

    // ── draws ─────────────────────────────────────────────────────────────

    fn draw_indexed(&mut self, draw: &IndexedDraw) -> Result<(), BackendError>;

    fn draw_composite(&mut self, draw: &CompositeDraw) -> Result<(), BackendError>;

    // ── diagnostics ───────────────────────────────────────────────────────

    /// Drains errors reported asynchronously by the device since the last call.
    fn take_errors(&mut self) -> Vec<BackendError>;
}
