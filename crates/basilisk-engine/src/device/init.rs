/// Device and surface options used when a window's GPU context is created.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Pick an sRGB swapchain format when one is offered.
    pub prefer_srgb: bool,

    /// `Fifo` waits for vblank (vsync) and is available everywhere.
    pub present_mode: wgpu::PresentMode,

    /// Requested compositing alpha mode. Falls back to the first mode the
    /// surface supports; transparent windows set `PreMultiplied`.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,

    /// Hint for how many frames may be queued ahead of presentation.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}
