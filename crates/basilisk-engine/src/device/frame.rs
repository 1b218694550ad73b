/// Swapchain image acquired for one tick, with the encoder every pass of the
/// tick records into.
///
/// Only one may exist per surface; hand it back through [`super::Gpu::submit`].
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
