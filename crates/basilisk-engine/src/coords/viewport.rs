/// Size of a render target in physical pixels.
///
/// Used both for the window's main target and for off-screen framebuffers.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Width over height; `1.0` for degenerate sizes.
    #[inline]
    pub fn aspect(self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}
