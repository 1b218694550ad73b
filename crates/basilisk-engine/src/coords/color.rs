/// Straight-alpha RGBA color, one byte per channel.
///
/// This is the per-vertex color format: it is uploaded as-is and normalized
/// to `[0, 1]` by the vertex fetch (`Unorm8x4`).
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Linear RGBA clear color with `f32` channels in `[0, 1]`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ClearColor {
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Builds a clear color from channels given on a `0..=255` scale.
    ///
    /// Values are divided by 255 and clamped, so `(255, 128, 0, 255)` maps to
    /// roughly `(1.0, 0.5, 0.0, 1.0)`.
    #[inline]
    pub fn from_255(r: f32, g: f32, b: f32, a: f32) -> Self {
        let f = |c: f32| (c / 255.0).clamp(0.0, 1.0);
        Self::new(f(r), f(g), f(b), f(a))
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }
}

impl From<Rgba8> for ClearColor {
    fn from(c: Rgba8) -> Self {
        Self::from_255(c.r as f32, c.g as f32, c.b as f32, c.a as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_255_scales_to_unit_range() {
        let c = ClearColor::from_255(255.0, 0.0, 51.0, 255.0);
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 0.0);
        assert!((c.b - 0.2).abs() < 1e-6);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn from_255_clamps_out_of_range() {
        let c = ClearColor::from_255(300.0, -5.0, 0.0, 0.0);
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 0.0);
    }

    #[test]
    fn rgba8_converts_to_clear_color() {
        let c: ClearColor = Rgba8::WHITE.into();
        assert_eq!(c, ClearColor::new(1.0, 1.0, 1.0, 1.0));
    }
}
