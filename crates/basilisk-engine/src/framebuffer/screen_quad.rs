use bytemuck::{Pod, Zeroable};

/// Vertex of the full-screen composite quad: clip-space position + UV.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ScreenVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl ScreenVertex {
    pub const SIZE: u64 = std::mem::size_of::<ScreenVertex>() as u64;

    const fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self { position: [x, y], uv: [u, v] }
    }
}

/// Two triangles covering clip space. UVs have `v = 0` at the bottom; the
/// composite shader flips them to texture space.
pub const SCREEN_QUAD: [ScreenVertex; 6] = [
    ScreenVertex::new(-1.0, 1.0, 0.0, 1.0),
    ScreenVertex::new(-1.0, -1.0, 0.0, 0.0),
    ScreenVertex::new(1.0, -1.0, 1.0, 0.0),
    ScreenVertex::new(-1.0, 1.0, 0.0, 1.0),
    ScreenVertex::new(1.0, -1.0, 1.0, 0.0),
    ScreenVertex::new(1.0, 1.0, 1.0, 1.0),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_covers_clip_space_corners() {
        let corners: Vec<_> = SCREEN_QUAD.iter().map(|v| v.position).collect();
        for c in [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]] {
            assert!(corners.contains(&c));
        }
        assert_eq!(ScreenVertex::SIZE, 16);
    }
}
