use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::surface::{self, choose_alpha_mode, choose_surface_format, create_depth_view};
use super::{GpuFrame, GpuInit, SurfaceErrorAction};

/// Device, queue and swapchain of one window, plus the depth attachment the
/// main target is drawn with.
pub struct Gpu<'w> {
    /// Window the surface presents to; outlives the `Gpu` via `'w`.
    window: &'w Window,

    instance: wgpu::Instance,
    surface: wgpu::Surface<'w>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,

    config: wgpu::SurfaceConfiguration,

    /// Physical pixels; may be zero while minimized.
    size: PhysicalSize<u32>,

    /// Depth attachment for the main target, same size as the surface.
    depth: wgpu::TextureView,
}

impl<'w> Gpu<'w> {
    /// Picks an adapter able to present to `window`, opens a device on it and
    /// configures the swapchain at the window's current size.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        log_adapter(&adapter);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("basilisk device"),
                required_features: init.required_features,
                required_limits: init.required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&caps, init.prefer_srgb)
            .context("no supported surface formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: init.present_mode,
            alpha_mode: choose_alpha_mode(&caps, init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);
        log::debug!("surface configured: {format:?} {}x{}", size.width, size.height);

        let depth = create_depth_view(&device, size.width, size.height, "basilisk main depth");

        Ok(Gpu { window, instance, surface, adapter, device, queue, config, size, depth })
    }

    pub fn window(&self) -> &'w Window {
        self.window
    }

    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth
    }

    /// Follows a window resize. A zero-sized window only records the size;
    /// the swapchain is rebuilt once it has an area again.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        let configured = surface::apply_resize(
            &self.surface,
            &self.device,
            &mut self.config,
            &mut self.size,
            new_size,
        );
        if configured {
            let (w, h) = (new_size.width, new_size.height);
            self.depth = create_depth_view(&self.device, w, h, "basilisk main depth");
        }
    }

    /// Next swapchain image plus a fresh encoder for the tick.
    pub fn begin_frame(&self) -> std::result::Result<GpuFrame, SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("basilisk frame encoder"),
            });

        Ok(GpuFrame { surface_texture, view, encoder })
    }

    /// Submits the recorded commands for `frame` and presents it.
    pub fn submit(&self, frame: GpuFrame) {
        let GpuFrame { surface_texture, view, encoder } = frame;
        self.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        self.window.pre_present_notify();
        surface_texture.present();
    }

    /// Converts a `SurfaceError` into a higher-level action, reconfiguring
    /// the surface when it was lost or outdated.
    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        surface::map_surface_error(&self.surface, &self.device, &self.config, self.size, err)
    }
}

fn log_adapter(adapter: &wgpu::Adapter) {
    let info = adapter.get_info();
    log::info!("gpu: {} ({:?}, {:?})", info.name, info.backend, info.device_type);
    if !info.driver.is_empty() {
        log::info!("driver: {} {}", info.driver, info.driver_info);
    }
}
