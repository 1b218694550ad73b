use crate::backend::GpuBackend;
use crate::batch::{Batch, SelectedBatch};
use crate::coords::Viewport;
use crate::input::InputState;
use crate::scene::Scene;
use crate::texture::TextureRegistry;

/// Passed to [`super::App::setup`] once the window and GPU exist.
pub struct SetupCtx<'a> {
    pub gpu: &'a mut dyn GpuBackend,
    pub scene: &'a mut Scene,
}

/// Per-framebuffer render context handed to a [`crate::framebuffer::Renderable`].
///
/// The offscreen target is bound and cleared when the renderable runs.
pub struct RenderCtx<'a> {
    pub gpu: &'a mut dyn GpuBackend,
    /// Shader time of the current tick.
    pub time: f32,
    pub input: &'a InputState,
    pub textures: &'a TextureRegistry,
    /// Size of the bound framebuffer in pixels.
    pub target_size: Viewport,
}

impl<'a> RenderCtx<'a> {
    /// Selects `batch` with this tick's time and the registry's selected
    /// texture as the quad atlas rect.
    pub fn select<'b>(&'b mut self, batch: &'b mut Batch) -> SelectedBatch<'b> {
        let atlas = self.textures.selected().atlas;
        batch.select(&mut *self.gpu, self.time).with_atlas(atlas)
    }
}
