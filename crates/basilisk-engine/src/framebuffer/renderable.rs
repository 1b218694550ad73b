use crate::backend::GpuBackend;
use crate::core::RenderCtx;
use crate::error::RenderError;

/// Draws into a framebuffer's offscreen target.
///
/// Implemented for any `FnMut(&mut RenderCtx) -> Result<(), RenderError>`,
/// so plain closures work:
///
/// ```ignore
/// Box::new(move |ctx: &mut RenderCtx<'_>| -> Result<(), RenderError> {
///     let mut sel = ctx.select(&mut batch);
///     sel.push_quad(origin, size, color)?;
///     sel.upload()?;
///     sel.render_all()
/// })
/// ```
pub trait Renderable {
    fn render(&mut self, ctx: &mut RenderCtx<'_>) -> Result<(), RenderError>;

    /// Frees GPU resources owned by the renderable. Called when its
    /// framebuffer is released.
    fn release(&mut self, gpu: &mut dyn GpuBackend) {
        let _ = gpu;
    }
}

impl<F> Renderable for F
where
    F: FnMut(&mut RenderCtx<'_>) -> Result<(), RenderError>,
{
    fn render(&mut self, ctx: &mut RenderCtx<'_>) -> Result<(), RenderError> {
        self(ctx)
    }
}
