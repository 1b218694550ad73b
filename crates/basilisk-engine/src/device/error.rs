/// What the current tick should do after the surface failed to hand out a
/// texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// The swapchain was rebuilt for the current size; the next tick can draw.
    Reconfigured,
    /// Timeout or driver hiccup; drop this tick only.
    SkipFrame,
    /// Out of memory; the window cannot render any more.
    Fatal,
}

impl SurfaceErrorAction {
    #[inline]
    pub fn is_fatal(self) -> bool {
        self == Self::Fatal
    }
}
