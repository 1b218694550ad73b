use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::backend::{
    BackendError, BufferDesc, BufferId, BufferUsage, ClearFlags, ColorTargetDesc, CompositeDraw,
    FrameStatus, GpuBackend, IndexedDraw, RenderTarget, ShaderDesc, ShaderId, ShaderKind, TargetId,
};
use crate::camera::Camera;
use crate::coords::{ClearColor, Viewport};
use crate::device::surface::create_depth_view;
use crate::device::{Gpu, GpuFrame, GpuInit};
use crate::framebuffer::ScreenVertex;

use super::common::{filter, Globals};
use super::pipeline::{
    build_pipeline, globals_layout, pipeline_layout, texture_layout, PipelineKey, PipelineVariant,
};

const BATCH_WGSL: &str = include_str!("shaders/batch.wgsl");
const COMPOSITE_WGSL: &str = include_str!("shaders/composite.wgsl");

const INDEX_SIZE: u64 = std::mem::size_of::<u32>() as u64;

struct GpuBuffer {
    buffer: wgpu::Buffer,
    size: u64,
}

struct GpuTarget {
    _texture: wgpu::Texture,
    color: wgpu::TextureView,
    depth: wgpu::TextureView,
    /// Texture + sampler, bound at group 1 when the target is composited.
    source: wgpu::BindGroup,
}

struct ShaderProgram {
    module: wgpu::ShaderModule,
    kind: ShaderKind,
    /// Host copy; flushed to `ubo` before each draw that uses the program.
    globals: Globals,
    ubo: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// [`GpuBackend`] on top of a wgpu device and a window surface.
///
/// Every clear and draw records its own render pass into the frame's encoder,
/// so bound-state changes between calls behave like a classic immediate-mode
/// API. Buffer writes and uniform flushes issued during a frame are recorded
/// as buffer copies in the same encoder, which keeps them ordered with the
/// draws around them.
pub struct WgpuBackend<'w> {
    gpu: Gpu<'w>,

    globals_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    batch_layout: wgpu::PipelineLayout,
    composite_layout: wgpu::PipelineLayout,

    /// Format of off-screen color targets; matches the surface's sRGB-ness so
    /// compositing is a straight copy.
    offscreen_format: wgpu::TextureFormat,

    buffers: HashMap<BufferId, GpuBuffer>,
    targets: HashMap<TargetId, GpuTarget>,
    shaders: HashMap<ShaderId, ShaderProgram>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    next_buffer: u32,
    next_target: u32,
    next_shader: u32,

    frame: Option<GpuFrame>,
    bound: RenderTarget,
    active_shader: Option<ShaderId>,
    depth_test: bool,

    errors: Arc<Mutex<Vec<BackendError>>>,
}

impl<'w> WgpuBackend<'w> {
    /// Creates the device for `window` and compiles the built-in programs.
    pub fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let gpu = pollster::block_on(Gpu::new(window, init))?;
        Self::from_gpu(gpu)
    }

    pub fn from_gpu(gpu: Gpu<'w>) -> Result<Self> {
        let device = gpu.device();

        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let handler: Box<dyn wgpu::UncapturedErrorHandler> = Box::new(move |e: wgpu::Error| {
            log::error!("wgpu: {e}");
            push_error(&sink, BackendError::Validation(e.to_string()));
        });
        device.on_uncaptured_error(handler.into());

        let globals_layout = globals_layout(device);
        let texture_layout = texture_layout(device);
        let batch_layout = pipeline_layout(device, "basilisk batch layout", &[&globals_layout]);
        let composite_layout = pipeline_layout(
            device,
            "basilisk composite layout",
            &[&globals_layout, &texture_layout],
        );

        let offscreen_format = if gpu.surface_format().is_srgb() {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };

        let mut backend = Self {
            gpu,
            globals_layout,
            texture_layout,
            batch_layout,
            composite_layout,
            offscreen_format,
            buffers: HashMap::new(),
            targets: HashMap::new(),
            shaders: HashMap::new(),
            pipelines: HashMap::new(),
            next_buffer: 0,
            next_target: 0,
            next_shader: 0,
            frame: None,
            bound: RenderTarget::Main,
            active_shader: None,
            depth_test: false,
            errors,
        };

        let batch = backend.create_shader(&ShaderDesc {
            label: Some("basilisk batch shader"),
            source: BATCH_WGSL,
            kind: ShaderKind::Batch,
        })?;
        let composite = backend.create_shader(&ShaderDesc {
            label: Some("basilisk composite shader"),
            source: COMPOSITE_WGSL,
            kind: ShaderKind::Composite,
        })?;
        anyhow::ensure!(
            batch == ShaderId::BATCH && composite == ShaderId::COMPOSITE,
            "built-in shaders got unexpected ids"
        );

        Ok(backend)
    }

    pub fn gpu(&self) -> &Gpu<'w> {
        &self.gpu
    }

    /// Follows a window resize. Off-screen targets keep their size.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.gpu.resize(size);
    }

    fn target_format(&self) -> wgpu::TextureFormat {
        match self.bound {
            RenderTarget::Main => self.gpu.surface_format(),
            RenderTarget::Offscreen(_) => self.offscreen_format,
        }
    }

    fn program(&self, id: ShaderId, expected: ShaderKind) -> Result<&ShaderProgram, BackendError> {
        let program = self.shaders.get(&id).ok_or(BackendError::UnknownShader(id))?;
        if program.kind != expected {
            return Err(BackendError::ShaderKindMismatch { shader: id, expected });
        }
        Ok(program)
    }

    fn program_mut(&mut self, id: ShaderId) -> Result<&mut ShaderProgram, BackendError> {
        self.shaders.get_mut(&id).ok_or(BackendError::UnknownShader(id))
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) -> Result<(), BackendError> {
        let Entry::Vacant(slot) = self.pipelines.entry(key) else { return Ok(()) };

        let program = self
            .shaders
            .get(&key.shader)
            .ok_or(BackendError::UnknownShader(key.shader))?;
        let layout = match key.variant {
            PipelineVariant::Batch { .. } => &self.batch_layout,
            PipelineVariant::Composite => &self.composite_layout,
        };
        slot.insert(build_pipeline(self.gpu.device(), layout, &program.module, key));
        Ok(())
    }
}

// ── error sink ────────────────────────────────────────────────────────────
//
// A panic while the lock is held must not cost us device errors, so a
// poisoned sink is recovered rather than skipped.

type ErrorSink = Mutex<Vec<BackendError>>;

fn push_error(sink: &ErrorSink, err: BackendError) {
    sink.lock().unwrap_or_else(PoisonError::into_inner).push(err);
}

fn drain_errors(sink: &ErrorSink) -> Vec<BackendError> {
    std::mem::take(&mut *sink.lock().unwrap_or_else(PoisonError::into_inner))
}

// ── frame helpers ─────────────────────────────────────────────────────────
//
// Free functions so callers can hold the frame mutably next to shared borrows
// of the resource maps.

fn attachments<'a>(
    frame_view: &'a wgpu::TextureView,
    main_depth: &'a wgpu::TextureView,
    targets: &'a HashMap<TargetId, GpuTarget>,
    bound: RenderTarget,
) -> Result<(&'a wgpu::TextureView, &'a wgpu::TextureView), BackendError> {
    match bound {
        RenderTarget::Main => Ok((frame_view, main_depth)),
        RenderTarget::Offscreen(id) => targets
            .get(&id)
            .map(|t| (&t.color, &t.depth))
            .ok_or(BackendError::UnknownTarget(id)),
    }
}

fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    color: &wgpu::TextureView,
    depth: &wgpu::TextureView,
    color_load: wgpu::LoadOp<wgpu::Color>,
    depth_load: wgpu::LoadOp<f32>,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("basilisk pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color,
            resolve_target: None,
            ops: wgpu::Operations { load: color_load, store: wgpu::StoreOp::Store },
            depth_slice: None,
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: depth,
            depth_ops: Some(wgpu::Operations { load: depth_load, store: wgpu::StoreOp::Store }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

/// Records a copy of `data` into `dst` at `offset`, ordered with the passes
/// already recorded in `encoder`.
fn staged_write(
    device: &wgpu::Device,
    encoder: &mut wgpu::CommandEncoder,
    dst: &wgpu::Buffer,
    offset: u64,
    data: &[u8],
) {
    let staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("basilisk staging"),
        contents: data,
        usage: wgpu::BufferUsages::COPY_SRC,
    });
    encoder.copy_buffer_to_buffer(&staging, 0, dst, offset, data.len() as u64);
}

fn flush_globals(device: &wgpu::Device, encoder: &mut wgpu::CommandEncoder, program: &ShaderProgram) {
    staged_write(device, encoder, &program.ubo, 0, bytemuck::bytes_of(&program.globals));
}

fn to_wgpu_color(c: ClearColor) -> wgpu::Color {
    wgpu::Color { r: c.r as f64, g: c.g as f64, b: c.b as f64, a: c.a as f64 }
}

impl GpuBackend for WgpuBackend<'_> {
    // ── resources ─────────────────────────────────────────────────────────

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId, BackendError> {
        if desc.size == 0 || desc.size % 4 != 0 {
            return Err(BackendError::ResourceCreation {
                what: "buffer",
                reason: format!("invalid size {}", desc.size),
            });
        }

        let usage = match desc.usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
        } | wgpu::BufferUsages::COPY_DST;

        let buffer = self.gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: desc.label,
            size: desc.size,
            usage,
            mapped_at_creation: false,
        });

        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(id, GpuBuffer { buffer, size: desc.size });
        log::trace!("created {:?} buffer {id:?} ({} bytes)", desc.usage, desc.size);
        Ok(id)
    }

    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), BackendError> {
        let len = data.len() as u64;
        if offset % 4 != 0 || len % 4 != 0 {
            return Err(BackendError::MisalignedWrite { offset, len });
        }

        let buf = self.buffers.get(&id).ok_or(BackendError::UnknownBuffer(id))?;
        if offset + len > buf.size {
            return Err(BackendError::WriteOutOfBounds { buffer: id, offset, len, size: buf.size });
        }
        if data.is_empty() {
            return Ok(());
        }

        match self.frame.as_mut() {
            Some(frame) => {
                staged_write(self.gpu.device(), &mut frame.encoder, &buf.buffer, offset, data)
            }
            None => self.gpu.queue().write_buffer(&buf.buffer, offset, data),
        }
        Ok(())
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        // Dropped rather than destroyed: the current frame may still reference it.
        if self.buffers.remove(&id).is_some() {
            log::trace!("released buffer {id:?}");
        }
    }

    fn create_color_target(&mut self, desc: &ColorTargetDesc<'_>) -> Result<TargetId, BackendError> {
        if !desc.size.is_valid() {
            return Err(BackendError::ResourceCreation {
                what: "color target",
                reason: format!("invalid size {}x{}", desc.size.width, desc.size.height),
            });
        }

        let limit = self.gpu.device().limits().max_texture_dimension_2d;
        if desc.size.width > limit || desc.size.height > limit {
            return Err(BackendError::ResourceCreation {
                what: "color target",
                reason: format!(
                    "{}x{} exceeds the device limit of {limit}",
                    desc.size.width, desc.size.height
                ),
            });
        }

        let device = self.gpu.device();
        let label = desc.label.unwrap_or("basilisk color target");

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: desc.size.width,
                height: desc.size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.offscreen_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let color = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let depth = create_depth_view(device, desc.size.width, desc.size.height, label);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            mag_filter: filter(desc.filter),
            min_filter: filter(desc.filter),
            ..Default::default()
        });

        let source = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&color),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let id = TargetId(self.next_target);
        self.next_target += 1;
        self.targets.insert(id, GpuTarget { _texture: texture, color, depth, source });
        log::debug!("created color target {id:?} ({}x{})", desc.size.width, desc.size.height);
        Ok(id)
    }

    fn destroy_color_target(&mut self, id: TargetId) {
        if self.targets.remove(&id).is_some() {
            if self.bound == RenderTarget::Offscreen(id) {
                self.bound = RenderTarget::Main;
            }
            log::debug!("released color target {id:?}");
        }
    }

    fn create_shader(&mut self, desc: &ShaderDesc<'_>) -> Result<ShaderId, BackendError> {
        if desc.source.trim().is_empty() {
            return Err(BackendError::ResourceCreation {
                what: "shader",
                reason: "empty source".to_string(),
            });
        }

        let device = self.gpu.device();
        let label = desc.label.unwrap_or("basilisk user shader");

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(desc.source.into()),
        });

        let ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: Globals::SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.globals_layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: ubo.as_entire_binding() }],
        });

        let id = ShaderId(self.next_shader);
        self.next_shader += 1;
        self.shaders.insert(
            id,
            ShaderProgram { module, kind: desc.kind, globals: Globals::identity(), ubo, bind_group },
        );
        log::debug!("compiled {:?} shader {id:?} ({label})", desc.kind);
        Ok(id)
    }

    // ── frame ─────────────────────────────────────────────────────────────

    fn begin_frame(&mut self) -> Result<FrameStatus, BackendError> {
        if self.frame.is_some() {
            return Err(BackendError::FrameInProgress);
        }

        let size = self.gpu.size();
        if size.width == 0 || size.height == 0 {
            return Ok(FrameStatus::Skipped);
        }

        match self.gpu.begin_frame() {
            Ok(frame) => {
                self.frame = Some(frame);
                self.bound = RenderTarget::Main;
                Ok(FrameStatus::Ready)
            }
            Err(err) => {
                let msg = err.to_string();
                let action = self.gpu.handle_surface_error(err);
                if action.is_fatal() {
                    return Err(BackendError::SurfaceFatal(msg));
                }
                log::debug!("surface error ({msg}): {action:?}");
                Ok(FrameStatus::Skipped)
            }
        }
    }

    fn present(&mut self) -> Result<(), BackendError> {
        let frame = self.frame.take().ok_or(BackendError::NoActiveFrame)?;
        self.gpu.submit(frame);
        Ok(())
    }

    fn main_viewport(&self) -> Viewport {
        let size = self.gpu.size();
        Viewport::new(size.width, size.height)
    }

    // ── state ─────────────────────────────────────────────────────────────

    fn bind_target(&mut self, target: RenderTarget) -> Result<(), BackendError> {
        if let RenderTarget::Offscreen(id) = target {
            if !self.targets.contains_key(&id) {
                return Err(BackendError::UnknownTarget(id));
            }
        }
        self.bound = target;
        Ok(())
    }

    fn bound_target(&self) -> RenderTarget {
        self.bound
    }

    fn clear(&mut self, flags: ClearFlags, color: ClearColor) -> Result<(), BackendError> {
        let frame = self.frame.as_mut().ok_or(BackendError::NoActiveFrame)?;
        let (color_view, depth_view) =
            attachments(&frame.view, self.gpu.depth_view(), &self.targets, self.bound)?;

        let color_load = if flags.color {
            wgpu::LoadOp::Clear(to_wgpu_color(color))
        } else {
            wgpu::LoadOp::Load
        };
        let depth_load = if flags.depth { wgpu::LoadOp::Clear(1.0) } else { wgpu::LoadOp::Load };

        // An empty pass is enough to run the load ops.
        drop(begin_pass(&mut frame.encoder, color_view, depth_view, color_load, depth_load));
        Ok(())
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
    }

    fn use_shader(&mut self, shader: ShaderId) -> Result<(), BackendError> {
        if !self.shaders.contains_key(&shader) {
            return Err(BackendError::UnknownShader(shader));
        }
        self.active_shader = Some(shader);
        Ok(())
    }

    fn set_time_uniform(&mut self, shader: ShaderId, time: f32) -> Result<(), BackendError> {
        self.program_mut(shader)?.globals.time = time;
        Ok(())
    }

    fn set_view_uniform(&mut self, shader: ShaderId, camera: &Camera) -> Result<(), BackendError> {
        self.program_mut(shader)?.globals.view = camera.view.to_cols_array_2d();
        Ok(())
    }

    fn set_projection_uniform(&mut self, shader: ShaderId, camera: &Camera) -> Result<(), BackendError> {
        self.program_mut(shader)?.globals.proj = camera.proj.to_cols_array_2d();
        Ok(())
    }

    // ── draws ─────────────────────────────────────────────────────────────

    fn draw_indexed(&mut self, draw: &IndexedDraw) -> Result<(), BackendError> {
        if self.frame.is_none() {
            return Err(BackendError::NoActiveFrame);
        }
        let shader = self.active_shader.ok_or(BackendError::NoActiveShader)?;
        self.program(shader, ShaderKind::Batch)?;
        if let Some(missing) = shader.missing_attribute(draw.layout) {
            return Err(BackendError::LayoutMismatch { shader, layout: draw.layout, missing });
        }

        if !self.buffers.contains_key(&draw.vertex_buffer) {
            return Err(BackendError::UnknownBuffer(draw.vertex_buffer));
        }
        let index = self
            .buffers
            .get(&draw.index_buffer)
            .ok_or(BackendError::UnknownBuffer(draw.index_buffer))?;
        let end = draw.offset + draw.count as u64 * INDEX_SIZE;
        if draw.offset % INDEX_SIZE != 0 || end > index.size {
            return Err(BackendError::IndexRangeOutOfBounds {
                buffer: draw.index_buffer,
                offset: draw.offset,
                count: draw.count,
                size: index.size,
            });
        }

        let key = PipelineKey {
            shader,
            format: self.target_format(),
            depth_test: self.depth_test,
            variant: PipelineVariant::Batch { layout: draw.layout, mode: draw.mode },
        };
        self.ensure_pipeline(key)?;

        let frame = self.frame.as_mut().ok_or(BackendError::NoActiveFrame)?;
        let device = self.gpu.device();
        let program = &self.shaders[&shader];
        let pipeline = &self.pipelines[&key];
        let vertices = &self.buffers[&draw.vertex_buffer];
        let index = &self.buffers[&draw.index_buffer];

        flush_globals(device, &mut frame.encoder, program);

        let (color_view, depth_view) =
            attachments(&frame.view, self.gpu.depth_view(), &self.targets, self.bound)?;
        let mut pass = begin_pass(
            &mut frame.encoder,
            color_view,
            depth_view,
            wgpu::LoadOp::Load,
            wgpu::LoadOp::Load,
        );

        let first = (draw.offset / INDEX_SIZE) as u32;
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &program.bind_group, &[]);
        pass.set_vertex_buffer(0, vertices.buffer.slice(..));
        pass.set_index_buffer(index.buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(first..first + draw.count, 0, 0..1);
        Ok(())
    }

    fn draw_composite(&mut self, draw: &CompositeDraw) -> Result<(), BackendError> {
        if self.frame.is_none() {
            return Err(BackendError::NoActiveFrame);
        }
        let shader = self.active_shader.ok_or(BackendError::NoActiveShader)?;
        self.program(shader, ShaderKind::Composite)?;

        let vertices = self
            .buffers
            .get(&draw.vertex_buffer)
            .ok_or(BackendError::UnknownBuffer(draw.vertex_buffer))?;
        let needed = draw.vertex_count as u64 * ScreenVertex::SIZE;
        if needed > vertices.size {
            return Err(BackendError::WriteOutOfBounds {
                buffer: draw.vertex_buffer,
                offset: 0,
                len: needed,
                size: vertices.size,
            });
        }
        if !self.targets.contains_key(&draw.source) {
            return Err(BackendError::UnknownTarget(draw.source));
        }
        if self.bound == RenderTarget::Offscreen(draw.source) {
            return Err(BackendError::Validation(format!(
                "target {:?} cannot be sampled while bound",
                draw.source
            )));
        }

        let key = PipelineKey {
            shader,
            format: self.target_format(),
            depth_test: self.depth_test,
            variant: PipelineVariant::Composite,
        };
        self.ensure_pipeline(key)?;

        let frame = self.frame.as_mut().ok_or(BackendError::NoActiveFrame)?;
        let device = self.gpu.device();
        let program = &self.shaders[&shader];
        let pipeline = &self.pipelines[&key];
        let vertices = &self.buffers[&draw.vertex_buffer];
        let source = &self.targets[&draw.source];

        flush_globals(device, &mut frame.encoder, program);

        let (color_view, depth_view) =
            attachments(&frame.view, self.gpu.depth_view(), &self.targets, self.bound)?;
        let mut pass = begin_pass(
            &mut frame.encoder,
            color_view,
            depth_view,
            wgpu::LoadOp::Load,
            wgpu::LoadOp::Load,
        );

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &program.bind_group, &[]);
        pass.set_bind_group(1, &source.source, &[]);
        pass.set_vertex_buffer(0, vertices.buffer.slice(..));
        pass.draw(0..draw.vertex_count, 0..1);
        Ok(())
    }

    // ── diagnostics ───────────────────────────────────────────────────────

    fn take_errors(&mut self) -> Vec<BackendError> {
        drain_errors(&self.errors)
    }
}
