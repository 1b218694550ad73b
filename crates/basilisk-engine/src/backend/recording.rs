use std::collections::HashMap;

use glam::Mat4;

use crate::camera::Camera;
use crate::coords::{ClearColor, Viewport};
use crate::framebuffer::ScreenVertex;

use super::{
    BackendError, BufferDesc, BufferId, BufferUsage, ClearFlags, ColorTargetDesc, CompositeDraw,
    FrameStatus, GpuBackend, IndexedDraw, RenderTarget, ShaderDesc, ShaderId, ShaderKind,
    TargetId,
};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateBuffer { id: BufferId, size: u64, usage: BufferUsage },
    WriteBuffer { id: BufferId, offset: u64, len: u64 },
    DestroyBuffer(BufferId),
    CreateTarget { id: TargetId, size: Viewport },
    DestroyTarget(TargetId),
    CreateShader { id: ShaderId, kind: ShaderKind },
    BeginFrame,
    Present,
    BindTarget(RenderTarget),
    Clear { flags: ClearFlags, color: ClearColor },
    SetDepthTest(bool),
    UseShader(ShaderId),
    SetTime { shader: ShaderId, time: f32 },
    SetView { shader: ShaderId, view: Mat4 },
    SetProjection { shader: ShaderId, proj: Mat4 },
    DrawIndexed(IndexedDraw),
    DrawComposite(CompositeDraw),
}

#[derive(Debug)]
struct RecordedBuffer {
    usage: BufferUsage,
    data: Vec<u8>,
}

/// Headless backend that validates calls the way a GPU backend would and
/// records them in order.
///
/// Buffer contents are kept in host memory so uploads can be inspected.
#[derive(Debug)]
pub struct RecordingBackend {
    commands: Vec<Command>,

    buffers: HashMap<BufferId, RecordedBuffer>,
    targets: HashMap<TargetId, Viewport>,
    shaders: HashMap<ShaderId, ShaderKind>,
    next_buffer: u32,
    next_target: u32,
    next_shader: u32,

    main: Viewport,
    bound: RenderTarget,
    active_shader: Option<ShaderId>,
    depth_test: bool,
    in_frame: bool,

    frames_to_skip: u32,
    pending_errors: Vec<BackendError>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new(Viewport::new(800, 600))
    }
}

impl RecordingBackend {
    /// Creates a backend whose main target has the given size.
    pub fn new(main: Viewport) -> Self {
        let shaders = HashMap::from([
            (ShaderId::BATCH, ShaderKind::Batch),
            (ShaderId::COMPOSITE, ShaderKind::Composite),
        ]);

        Self {
            commands: Vec::new(),
            buffers: HashMap::new(),
            targets: HashMap::new(),
            shaders,
            next_buffer: 0,
            next_target: 0,
            next_shader: 2,
            main,
            bound: RenderTarget::Main,
            active_shader: None,
            depth_test: false,
            in_frame: false,
            frames_to_skip: 0,
            pending_errors: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Returns and forgets everything recorded so far.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn buffer_data(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(&id).map(|b| b.data.as_slice())
    }

    /// Buffer contents decoded as little-endian `u32` indices.
    pub fn index_data(&self, id: BufferId) -> Option<Vec<u32>> {
        let buf = self.buffers.get(&id)?;
        if buf.usage != BufferUsage::Index {
            return None;
        }
        Some(
            buf.data
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn depth_test(&self) -> bool {
        self.depth_test
    }

    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    /// Makes the next `n` calls to `begin_frame` report [`FrameStatus::Skipped`].
    pub fn skip_frames(&mut self, n: u32) {
        self.frames_to_skip = n;
    }

    /// Queues an error as if the device had reported it asynchronously.
    pub fn inject_error(&mut self, err: BackendError) {
        self.pending_errors.push(err);
    }

    fn require_frame(&self) -> Result<(), BackendError> {
        if self.in_frame { Ok(()) } else { Err(BackendError::NoActiveFrame) }
    }

    fn require_shader(&self, id: ShaderId, expected: ShaderKind) -> Result<(), BackendError> {
        match self.shaders.get(&id) {
            None => Err(BackendError::UnknownShader(id)),
            Some(kind) if *kind != expected => {
                Err(BackendError::ShaderKindMismatch { shader: id, expected })
            }
            Some(_) => Ok(()),
        }
    }

    fn buffer(&self, id: BufferId) -> Result<&RecordedBuffer, BackendError> {
        self.buffers.get(&id).ok_or(BackendError::UnknownBuffer(id))
    }

    fn known_shader(&self, id: ShaderId) -> Result<(), BackendError> {
        if self.shaders.contains_key(&id) { Ok(()) } else { Err(BackendError::UnknownShader(id)) }
    }
}

impl GpuBackend for RecordingBackend {
    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId, BackendError> {
        if desc.size == 0 || desc.size % 4 != 0 {
            return Err(BackendError::ResourceCreation {
                what: "buffer",
                reason: format!("invalid size {}", desc.size),
            });
        }

        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(
            id,
            RecordedBuffer { usage: desc.usage, data: vec![0; desc.size as usize] },
        );
        self.commands.push(Command::CreateBuffer { id, size: desc.size, usage: desc.usage });
        Ok(id)
    }

    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), BackendError> {
        let len = data.len() as u64;
        if offset % 4 != 0 || len % 4 != 0 {
            return Err(BackendError::MisalignedWrite { offset, len });
        }

        let buf = self.buffers.get_mut(&id).ok_or(BackendError::UnknownBuffer(id))?;
        let size = buf.data.len() as u64;
        if offset + len > size {
            return Err(BackendError::WriteOutOfBounds { buffer: id, offset, len, size });
        }

        let start = offset as usize;
        buf.data[start..start + data.len()].copy_from_slice(data);
        self.commands.push(Command::WriteBuffer { id, offset, len });
        Ok(())
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        if self.buffers.remove(&id).is_some() {
            self.commands.push(Command::DestroyBuffer(id));
        }
    }

    fn create_color_target(&mut self, desc: &ColorTargetDesc<'_>) -> Result<TargetId, BackendError> {
        if !desc.size.is_valid() {
            return Err(BackendError::ResourceCreation {
                what: "color target",
                reason: format!("invalid size {}x{}", desc.size.width, desc.size.height),
            });
        }

        let id = TargetId(self.next_target);
        self.next_target += 1;
        self.targets.insert(id, desc.size);
        self.commands.push(Command::CreateTarget { id, size: desc.size });
        Ok(id)
    }

    fn destroy_color_target(&mut self, id: TargetId) {
        if self.targets.remove(&id).is_some() {
            if self.bound == RenderTarget::Offscreen(id) {
                self.bound = RenderTarget::Main;
            }
            self.commands.push(Command::DestroyTarget(id));
        }
    }

    fn create_shader(&mut self, desc: &ShaderDesc<'_>) -> Result<ShaderId, BackendError> {
        if desc.source.trim().is_empty() {
            return Err(BackendError::ResourceCreation {
                what: "shader",
                reason: "empty source".to_string(),
            });
        }

        let id = ShaderId(self.next_shader);
        self.next_shader += 1;
        self.shaders.insert(id, desc.kind);
        self.commands.push(Command::CreateShader { id, kind: desc.kind });
        Ok(id)
    }

    fn begin_frame(&mut self) -> Result<FrameStatus, BackendError> {
        if self.in_frame {
            return Err(BackendError::FrameInProgress);
        }
        if self.frames_to_skip > 0 {
            self.frames_to_skip -= 1;
            return Ok(FrameStatus::Skipped);
        }

        self.in_frame = true;
        self.bound = RenderTarget::Main;
        self.commands.push(Command::BeginFrame);
        Ok(FrameStatus::Ready)
    }

    fn present(&mut self) -> Result<(), BackendError> {
        self.require_frame()?;
        self.in_frame = false;
        self.commands.push(Command::Present);
        Ok(())
    }

    fn main_viewport(&self) -> Viewport {
        self.main
    }

    fn bind_target(&mut self, target: RenderTarget) -> Result<(), BackendError> {
        if let RenderTarget::Offscreen(id) = target {
            if !self.targets.contains_key(&id) {
                return Err(BackendError::UnknownTarget(id));
            }
        }
        self.bound = target;
        self.commands.push(Command::BindTarget(target));
        Ok(())
    }

    fn bound_target(&self) -> RenderTarget {
        self.bound
    }

    fn clear(&mut self, flags: ClearFlags, color: ClearColor) -> Result<(), BackendError> {
        self.require_frame()?;
        self.commands.push(Command::Clear { flags, color });
        Ok(())
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
        self.commands.push(Command::SetDepthTest(enabled));
    }

    fn use_shader(&mut self, shader: ShaderId) -> Result<(), BackendError> {
        self.known_shader(shader)?;
        self.active_shader = Some(shader);
        self.commands.push(Command::UseShader(shader));
        Ok(())
    }

    fn set_time_uniform(&mut self, shader: ShaderId, time: f32) -> Result<(), BackendError> {
        self.known_shader(shader)?;
        self.commands.push(Command::SetTime { shader, time });
        Ok(())
    }

    fn set_view_uniform(&mut self, shader: ShaderId, camera: &Camera) -> Result<(), BackendError> {
        self.known_shader(shader)?;
        self.commands.push(Command::SetView { shader, view: camera.view });
        Ok(())
    }

    fn set_projection_uniform(&mut self, shader: ShaderId, camera: &Camera) -> Result<(), BackendError> {
        self.known_shader(shader)?;
        self.commands.push(Command::SetProjection { shader, proj: camera.proj });
        Ok(())
    }

    fn draw_indexed(&mut self, draw: &IndexedDraw) -> Result<(), BackendError> {
        self.require_frame()?;
        let shader = self.active_shader.ok_or(BackendError::NoActiveShader)?;
        self.require_shader(shader, ShaderKind::Batch)?;
        if let Some(missing) = shader.missing_attribute(draw.layout) {
            return Err(BackendError::LayoutMismatch { shader, layout: draw.layout, missing });
        }
        self.buffer(draw.vertex_buffer)?;

        let index = self.buffer(draw.index_buffer)?;
        let size = index.data.len() as u64;
        if draw.offset + draw.count as u64 * 4 > size {
            return Err(BackendError::IndexRangeOutOfBounds {
                buffer: draw.index_buffer,
                offset: draw.offset,
                count: draw.count,
                size,
            });
        }

        self.commands.push(Command::DrawIndexed(*draw));
        Ok(())
    }

    fn draw_composite(&mut self, draw: &CompositeDraw) -> Result<(), BackendError> {
        self.require_frame()?;
        let shader = self.active_shader.ok_or(BackendError::NoActiveShader)?;
        self.require_shader(shader, ShaderKind::Composite)?;

        let size = self.buffer(draw.vertex_buffer)?.data.len() as u64;
        let needed = draw.vertex_count as u64 * ScreenVertex::SIZE;
        if needed > size {
            return Err(BackendError::WriteOutOfBounds {
                buffer: draw.vertex_buffer,
                offset: 0,
                len: needed,
                size,
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

        self.commands.push(Command::DrawComposite(*draw));
        Ok(())
    }

    fn take_errors(&mut self) -> Vec<BackendError> {
        std::mem::take(&mut self.pending_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DrawMode, VertexAttr, VertexLayout};

    fn vertex_buffer(gpu: &mut RecordingBackend, size: u64) -> BufferId {
        gpu.create_buffer(&BufferDesc { label: None, size, usage: BufferUsage::Vertex })
            .unwrap()
    }

    #[test]
    fn write_within_bounds_is_stored() {
        let mut gpu = RecordingBackend::default();
        let id = vertex_buffer(&mut gpu, 16);
        gpu.write_buffer(id, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(gpu.buffer_data(id).unwrap(), &[0, 0, 0, 0, 1, 2, 3, 4, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn write_past_end_is_rejected() {
        let mut gpu = RecordingBackend::default();
        let id = vertex_buffer(&mut gpu, 8);
        let err = gpu.write_buffer(id, 4, &[0; 8]).unwrap_err();
        assert!(matches!(err, BackendError::WriteOutOfBounds { size: 8, .. }));
    }

    #[test]
    fn misaligned_write_is_rejected() {
        let mut gpu = RecordingBackend::default();
        let id = vertex_buffer(&mut gpu, 8);
        let err = gpu.write_buffer(id, 0, &[0; 3]).unwrap_err();
        assert_eq!(err, BackendError::MisalignedWrite { offset: 0, len: 3 });
    }

    #[test]
    fn draws_require_a_frame_and_shader() {
        let mut gpu = RecordingBackend::default();
        let vb = vertex_buffer(&mut gpu, 36);
        let ib = gpu
            .create_buffer(&BufferDesc { label: None, size: 12, usage: BufferUsage::Index })
            .unwrap();
        let draw = IndexedDraw {
            vertex_buffer: vb,
            index_buffer: ib,
            layout: VertexLayout::Full,
            mode: DrawMode::Triangles,
            offset: 0,
            count: 3,
        };

        assert_eq!(gpu.draw_indexed(&draw), Err(BackendError::NoActiveFrame));
        gpu.begin_frame().unwrap();
        assert_eq!(gpu.draw_indexed(&draw), Err(BackendError::NoActiveShader));
        gpu.use_shader(ShaderId::BATCH).unwrap();
        gpu.draw_indexed(&draw).unwrap();

        let too_far = IndexedDraw { count: 4, ..draw };
        assert!(matches!(
            gpu.draw_indexed(&too_far),
            Err(BackendError::IndexRangeOutOfBounds { .. })
        ));
    }

    #[test]
    fn batch_shader_needs_color_attribute() {
        let mut gpu = RecordingBackend::default();
        let vb = vertex_buffer(&mut gpu, 36);
        let ib = gpu
            .create_buffer(&BufferDesc { label: None, size: 12, usage: BufferUsage::Index })
            .unwrap();
        gpu.begin_frame().unwrap();
        gpu.use_shader(ShaderId::BATCH).unwrap();

        let err = gpu
            .draw_indexed(&IndexedDraw {
                vertex_buffer: vb,
                index_buffer: ib,
                layout: VertexLayout::PositionTexture,
                mode: DrawMode::Triangles,
                offset: 0,
                count: 3,
            })
            .unwrap_err();
        assert!(matches!(err, BackendError::LayoutMismatch { missing: VertexAttr::Color, .. }));
    }

    #[test]
    fn composite_with_batch_shader_is_rejected() {
        let mut gpu = RecordingBackend::default();
        let vb = vertex_buffer(&mut gpu, 96);
        let target = gpu
            .create_color_target(&ColorTargetDesc {
                label: None,
                size: Viewport::new(4, 4),
                filter: Default::default(),
            })
            .unwrap();
        gpu.begin_frame().unwrap();
        gpu.use_shader(ShaderId::BATCH).unwrap();

        let err = gpu
            .draw_composite(&CompositeDraw { vertex_buffer: vb, source: target, vertex_count: 6 })
            .unwrap_err();
        assert_eq!(
            err,
            BackendError::ShaderKindMismatch { shader: ShaderId::BATCH, expected: ShaderKind::Composite }
        );
    }

    #[test]
    fn composite_checks_quad_buffer_and_bound_source() {
        let mut gpu = RecordingBackend::default();
        let short = vertex_buffer(&mut gpu, 5 * ScreenVertex::SIZE);
        let quad = vertex_buffer(&mut gpu, 6 * ScreenVertex::SIZE);
        let target = gpu
            .create_color_target(&ColorTargetDesc {
                label: None,
                size: Viewport::new(4, 4),
                filter: Default::default(),
            })
            .unwrap();
        gpu.begin_frame().unwrap();
        gpu.use_shader(ShaderId::COMPOSITE).unwrap();

        let err = gpu
            .draw_composite(&CompositeDraw { vertex_buffer: short, source: target, vertex_count: 6 })
            .unwrap_err();
        assert!(matches!(err, BackendError::WriteOutOfBounds { len, .. } if len == 6 * ScreenVertex::SIZE));

        gpu.bind_target(RenderTarget::Offscreen(target)).unwrap();
        let onto_itself = CompositeDraw { vertex_buffer: quad, source: target, vertex_count: 6 };
        assert!(matches!(gpu.draw_composite(&onto_itself), Err(BackendError::Validation(_))));

        gpu.bind_target(RenderTarget::Main).unwrap();
        gpu.draw_composite(&onto_itself).unwrap();
    }

    #[test]
    fn skipped_frames_do_not_open_a_frame() {
        let mut gpu = RecordingBackend::default();
        gpu.skip_frames(1);
        assert_eq!(gpu.begin_frame().unwrap(), FrameStatus::Skipped);
        assert!(!gpu.in_frame());
        assert_eq!(gpu.begin_frame().unwrap(), FrameStatus::Ready);
        assert_eq!(gpu.begin_frame(), Err(BackendError::FrameInProgress));
    }

    #[test]
    fn destroying_bound_target_falls_back_to_main() {
        let mut gpu = RecordingBackend::default();
        let t = gpu
            .create_color_target(&ColorTargetDesc {
                label: None,
                size: Viewport::new(2, 2),
                filter: Default::default(),
            })
            .unwrap();
        gpu.bind_target(RenderTarget::Offscreen(t)).unwrap();
        gpu.destroy_color_target(t);
        assert_eq!(gpu.bound_target(), RenderTarget::Main);
        assert_eq!(gpu.live_targets(), 0);
    }
}
