use bytemuck::{Pod, Zeroable};

use crate::coords::{Rgba8, Vec3};

/// Batch vertex: position, texture coordinate, normal, color.
///
/// Layout is fixed whatever attributes a shader reads; see
/// [`crate::backend::VertexLayout`].
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub tex_coord: [f32; 2],
    pub normal: [f32; 3],
    pub color: [u8; 4],
}

impl Vertex {
    pub const SIZE: u64 = std::mem::size_of::<Vertex>() as u64;

    pub const OFFSET_POSITION: u64 = std::mem::offset_of!(Vertex, position) as u64;
    pub const OFFSET_TEX_COORD: u64 = std::mem::offset_of!(Vertex, tex_coord) as u64;
    pub const OFFSET_NORMAL: u64 = std::mem::offset_of!(Vertex, normal) as u64;
    pub const OFFSET_COLOR: u64 = std::mem::offset_of!(Vertex, color) as u64;

    #[inline]
    pub fn new(position: Vec3, tex_coord: [f32; 2], normal: Vec3, color: Rgba8) -> Self {
        Self {
            position: position.to_array(),
            tex_coord,
            normal: normal.to_array(),
            color: color.to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(Vertex::SIZE, 36);
        assert_eq!(Vertex::OFFSET_POSITION, 0);
        assert_eq!(Vertex::OFFSET_TEX_COORD, 12);
        assert_eq!(Vertex::OFFSET_NORMAL, 20);
        assert_eq!(Vertex::OFFSET_COLOR, 32);
    }
}
