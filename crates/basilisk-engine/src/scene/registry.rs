use crate::backend::{GpuBackend, ShaderId};
use crate::coords::{ClearColor, Viewport};
use crate::error::RenderError;
use crate::framebuffer::{Framebuffer, Renderable};
use crate::texture::TextureRegistry;

/// Framebuffer slots added whenever the list is full.
const SLOT_GROWTH: usize = 4;

/// Index of a framebuffer inside its [`Scene`], in registration order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FramebufferId(usize);

/// Everything drawn into one window: registered framebuffers, clear color,
/// window size and the texture registry.
///
/// Framebuffers render in registration order. Slots are allocated four at a
/// time.
#[derive(Debug)]
pub struct Scene {
    framebuffers: Vec<Framebuffer>,
    allocated: usize,
    clear_color: ClearColor,
    size: Viewport,
    textures: TextureRegistry,
}

impl Scene {
    pub fn new(size: Viewport) -> Self {
        let mut framebuffers = Vec::new();
        framebuffers.reserve_exact(SLOT_GROWTH);
        Self {
            framebuffers,
            allocated: SLOT_GROWTH,
            clear_color: ClearColor::TRANSPARENT,
            size,
            textures: TextureRegistry::new(),
        }
    }

    /// Creates a framebuffer and registers it.
    pub fn create_framebuffer(
        &mut self,
        gpu: &mut dyn GpuBackend,
        width: u32,
        height: u32,
        renderable: Box<dyn Renderable>,
        shader: ShaderId,
    ) -> Result<FramebufferId, RenderError> {
        let fb = Framebuffer::new(gpu, width, height, renderable, shader)?;
        Ok(self.add_framebuffer(fb))
    }

    /// Registers an existing framebuffer; it renders after all earlier ones.
    pub fn add_framebuffer(&mut self, fb: Framebuffer) -> FramebufferId {
        if self.framebuffers.len() + 1 > self.allocated {
            self.allocated += SLOT_GROWTH;
            self.framebuffers.reserve_exact(self.allocated - self.framebuffers.len());
            log::debug!("framebuffer slots grown to {}", self.allocated);
        }

        let id = FramebufferId(self.framebuffers.len());
        log::debug!("framebuffer {} registered ({}x{})", id.0, fb.width(), fb.height());
        self.framebuffers.push(fb);
        id
    }

    pub fn framebuffer(&self, id: FramebufferId) -> Option<&Framebuffer> {
        self.framebuffers.get(id.0)
    }

    pub fn framebuffer_mut(&mut self, id: FramebufferId) -> Option<&mut Framebuffer> {
        self.framebuffers.get_mut(id.0)
    }

    pub fn framebuffers(&self) -> &[Framebuffer] {
        &self.framebuffers
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    /// Number of framebuffer slots currently allocated.
    pub fn allocated_slots(&self) -> usize {
        self.allocated
    }

    // ── window state ──────────────────────────────────────────────────────

    pub fn clear_color(&self) -> ClearColor {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: ClearColor) {
        self.clear_color = color;
    }

    /// Sets the main clear color from channels on a `0..=255` scale.
    pub fn set_background_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.clear_color = ClearColor::from_255(r, g, b, a);
    }

    pub fn size(&self) -> Viewport {
        self.size
    }

    pub fn set_size(&mut self, size: Viewport) {
        self.size = size;
    }

    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureRegistry {
        &mut self.textures
    }

    /// Framebuffers and textures borrowed together for one render pass over the list.
    pub(crate) fn render_parts(&mut self) -> (&mut [Framebuffer], &TextureRegistry) {
        (&mut self.framebuffers, &self.textures)
    }

    /// Releases every framebuffer's GPU resources and empties the list.
    pub fn release(&mut self, gpu: &mut dyn GpuBackend) {
        for fb in self.framebuffers.drain(..) {
            fb.release(gpu);
        }
    }
}
