use crate::backend::{
    BufferDesc, BufferId, BufferUsage, ClearFlags, ColorTargetDesc, CompositeDraw, FilterMode,
    GpuBackend, RenderTarget, ShaderId, TargetId,
};
use crate::coords::{ClearColor, Viewport};
use crate::core::RenderCtx;
use crate::error::RenderError;
use crate::input::InputState;
use crate::texture::TextureRegistry;

use super::renderable::Renderable;
use super::screen_quad::{SCREEN_QUAD, ScreenVertex};

/// Offscreen color target composited onto the main target through a
/// full-screen quad.
///
/// Each tick the frame driver calls [`start_render`](Self::start_render),
/// which binds and clears the target and runs the renderable, then
/// [`end_render`](Self::end_render), which draws the target onto the window.
pub struct Framebuffer {
    size: Viewport,
    target: TargetId,
    quad: BufferId,
    shader: ShaderId,
    renderable: Box<dyn Renderable>,
    started: bool,
}

impl Framebuffer {
    pub fn new(
        gpu: &mut dyn GpuBackend,
        width: u32,
        height: u32,
        renderable: Box<dyn Renderable>,
        shader: ShaderId,
    ) -> Result<Self, RenderError> {
        let size = Viewport::new(width, height);
        if !size.is_valid() {
            return Err(RenderError::InvalidSize(format!("framebuffer {width}x{height}")));
        }

        let target = gpu.create_color_target(&ColorTargetDesc {
            label: Some("basilisk framebuffer"),
            size,
            filter: FilterMode::Nearest,
        })?;

        let quad = match Self::create_quad(gpu) {
            Ok(q) => q,
            Err(err) => {
                gpu.destroy_color_target(target);
                return Err(err);
            }
        };

        Ok(Self { size, target, quad, shader, renderable, started: false })
    }

    fn create_quad(gpu: &mut dyn GpuBackend) -> Result<BufferId, RenderError> {
        let bytes: &[u8] = bytemuck::cast_slice(&SCREEN_QUAD);
        let quad = gpu.create_buffer(&BufferDesc {
            label: Some("basilisk screen quad"),
            size: SCREEN_QUAD.len() as u64 * ScreenVertex::SIZE,
            usage: BufferUsage::Vertex,
        })?;
        if let Err(err) = gpu.write_buffer(quad, 0, bytes) {
            gpu.destroy_buffer(quad);
            return Err(err.into());
        }
        Ok(quad)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.size.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.size.height
    }

    #[inline]
    pub fn size(&self) -> Viewport {
        self.size
    }

    pub fn shader(&self) -> ShaderId {
        self.shader
    }

    /// Composite shader used by `end_render`.
    pub fn set_shader(&mut self, shader: ShaderId) {
        self.shader = shader;
    }

    /// Binds the offscreen target, clears color and depth to transparent
    /// black and runs the renderable.
    ///
    /// The target stays marked as started even when the renderable fails, so
    /// whatever it drew is still composited.
    pub fn start_render(
        &mut self,
        gpu: &mut dyn GpuBackend,
        time: f32,
        input: &InputState,
        textures: &TextureRegistry,
    ) -> Result<(), RenderError> {
        gpu.bind_target(RenderTarget::Offscreen(self.target))?;
        gpu.clear(ClearFlags::ALL, ClearColor::TRANSPARENT)?;
        self.started = true;

        let mut ctx = RenderCtx { gpu, time, input, textures, target_size: self.size };
        self.renderable.render(&mut ctx)
    }

    /// Draws the offscreen target onto the main target with the
    /// framebuffer's shader, depth testing off.
    pub fn end_render(&mut self, gpu: &mut dyn GpuBackend, time: f32) -> Result<(), RenderError> {
        if !self.started {
            return Err(RenderError::FramebufferNotBound);
        }
        self.started = false;

        gpu.use_shader(self.shader)?;
        gpu.set_time_uniform(self.shader, time)?;
        gpu.bind_target(RenderTarget::Main)?;
        gpu.set_depth_test(false);
        gpu.draw_composite(&CompositeDraw {
            vertex_buffer: self.quad,
            source: self.target,
            vertex_count: SCREEN_QUAD.len() as u32,
        })?;
        Ok(())
    }

    /// Frees the renderable's resources, the quad buffer and the target.
    pub fn release(mut self, gpu: &mut dyn GpuBackend) {
        self.renderable.release(gpu);
        gpu.destroy_buffer(self.quad);
        gpu.destroy_color_target(self.target);
    }
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("size", &self.size)
            .field("target", &self.target)
            .field("shader", &self.shader)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::backend::{Command, FrameStatus, RecordingBackend};

    fn noop() -> Box<dyn Renderable> {
        Box::new(|_: &mut RenderCtx<'_>| -> Result<(), RenderError> { Ok(()) })
    }

    fn render_once(gpu: &mut RecordingBackend, fb: &mut Framebuffer) -> Result<(), RenderError> {
        let input = InputState::default();
        let textures = TextureRegistry::new();
        fb.start_render(gpu, 0.01, &input, &textures)?;
        fb.end_render(gpu, 0.01)
    }

    #[test]
    fn noop_render_keeps_size_and_leaves_main_bound() {
        let mut gpu = RecordingBackend::default();
        let mut fb = Framebuffer::new(&mut gpu, 800, 600, noop(), ShaderId::COMPOSITE).unwrap();
        assert_eq!(gpu.begin_frame().unwrap(), FrameStatus::Ready);

        render_once(&mut gpu, &mut fb).unwrap();

        assert_eq!((fb.width(), fb.height()), (800, 600));
        assert_eq!(gpu.bound_target(), RenderTarget::Main);
        assert!(!gpu.depth_test());
    }

    #[test]
    fn end_without_start_is_rejected() {
        let mut gpu = RecordingBackend::default();
        let mut fb = Framebuffer::new(&mut gpu, 64, 64, noop(), ShaderId::COMPOSITE).unwrap();
        gpu.begin_frame().unwrap();
        assert_eq!(fb.end_render(&mut gpu, 0.0), Err(RenderError::FramebufferNotBound));
    }

    #[test]
    fn zero_size_is_rejected() {
        let mut gpu = RecordingBackend::default();
        let err = Framebuffer::new(&mut gpu, 0, 10, noop(), ShaderId::COMPOSITE).unwrap_err();
        assert!(matches!(err, RenderError::InvalidSize(_)));
        assert_eq!(gpu.live_targets(), 0);
    }

    #[test]
    fn render_order_is_bind_clear_draw_composite() {
        let mut gpu = RecordingBackend::default();
        let mut fb = Framebuffer::new(&mut gpu, 32, 16, noop(), ShaderId::COMPOSITE).unwrap();
        gpu.begin_frame().unwrap();
        gpu.take_commands();

        render_once(&mut gpu, &mut fb).unwrap();

        let cmds = gpu.commands();
        assert!(matches!(cmds[0], Command::BindTarget(RenderTarget::Offscreen(_))));
        assert_eq!(cmds[1], Command::Clear { flags: ClearFlags::ALL, color: ClearColor::TRANSPARENT });
        assert_eq!(cmds[2], Command::UseShader(ShaderId::COMPOSITE));
        assert_eq!(cmds[3], Command::SetTime { shader: ShaderId::COMPOSITE, time: 0.01 });
        assert_eq!(cmds[4], Command::BindTarget(RenderTarget::Main));
        assert_eq!(cmds[5], Command::SetDepthTest(false));
        assert!(matches!(cmds[6], Command::DrawComposite(CompositeDraw { vertex_count: 6, .. })));
    }

    #[test]
    fn renderable_sees_target_size_and_time() {
        let seen = Rc::new(Cell::new((0, 0, 0.0)));
        let recorder = Rc::clone(&seen);
        let renderable: Box<dyn Renderable> =
            Box::new(move |ctx: &mut RenderCtx<'_>| -> Result<(), RenderError> {
                recorder.set((ctx.target_size.width, ctx.target_size.height, ctx.time));
                Ok(())
            });

        let mut gpu = RecordingBackend::default();
        let mut fb = Framebuffer::new(&mut gpu, 320, 240, renderable, ShaderId::COMPOSITE).unwrap();
        gpu.begin_frame().unwrap();
        render_once(&mut gpu, &mut fb).unwrap();

        assert_eq!(seen.get(), (320, 240, 0.01));
    }

    #[test]
    fn failing_renderable_still_composites() {
        let renderable: Box<dyn Renderable> =
            Box::new(|_: &mut RenderCtx<'_>| -> Result<(), RenderError> {
                Err(RenderError::InvalidSize("boom".into()))
            });

        let mut gpu = RecordingBackend::default();
        let mut fb = Framebuffer::new(&mut gpu, 8, 8, renderable, ShaderId::COMPOSITE).unwrap();
        gpu.begin_frame().unwrap();

        let input = InputState::default();
        let textures = TextureRegistry::new();
        assert!(fb.start_render(&mut gpu, 0.0, &input, &textures).is_err());
        fb.end_render(&mut gpu, 0.0).unwrap();
    }

    #[test]
    fn release_frees_everything() {
        let mut gpu = RecordingBackend::default();
        let fb = Framebuffer::new(&mut gpu, 8, 8, noop(), ShaderId::COMPOSITE).unwrap();
        assert_eq!((gpu.live_buffers(), gpu.live_targets()), (1, 1));
        fb.release(&mut gpu);
        assert_eq!((gpu.live_buffers(), gpu.live_targets()), (0, 0));
    }
}
