//! Shared GPU types and wgpu conversions used by the backend.

use bytemuck::{Pod, Zeroable};

use crate::backend::{DrawMode, FilterMode, VertexAttr, VertexLayout};
use crate::batch::Vertex;
use crate::camera::Camera;
use crate::device::surface::DEPTH_FORMAT;
use crate::framebuffer::ScreenVertex;

// ── blend ─────────────────────────────────────────────────────────────────

/// Straight alpha: `src * a + dst * (1 - a)`.
pub(super) fn alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState::ALPHA_BLENDING
}

// ── depth ─────────────────────────────────────────────────────────────────

pub(super) fn depth_state(test: bool) -> wgpu::DepthStencilState {
    let compare = if test { wgpu::CompareFunction::Less } else { wgpu::CompareFunction::Always };
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: test.into(),
        depth_compare: compare.into(),
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

// ── globals uniform ───────────────────────────────────────────────────────

/// Per-program uniform block: `Globals` in the WGSL sources.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(super) struct Globals {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub time: f32,
    pub _pad: [f32; 3], // 16-byte alignment
}

impl Globals {
    pub(super) const SIZE: u64 = std::mem::size_of::<Globals>() as u64;

    pub(super) fn identity() -> Self {
        let cam = Camera::default();
        Self {
            view: cam.view.to_cols_array_2d(),
            proj: cam.proj.to_cols_array_2d(),
            time: 0.0,
            _pad: [0.0; 3],
        }
    }
}

// ── vertex layouts ────────────────────────────────────────────────────────

fn attribute(attr: VertexAttr) -> wgpu::VertexAttribute {
    let (format, offset) = match attr {
        VertexAttr::Position => (wgpu::VertexFormat::Float32x3, Vertex::OFFSET_POSITION),
        VertexAttr::TexCoord => (wgpu::VertexFormat::Float32x2, Vertex::OFFSET_TEX_COORD),
        VertexAttr::Normal => (wgpu::VertexFormat::Float32x3, Vertex::OFFSET_NORMAL),
        VertexAttr::Color => (wgpu::VertexFormat::Unorm8x4, Vertex::OFFSET_COLOR),
    };
    wgpu::VertexAttribute { format, offset, shader_location: attr.location() }
}

/// Attributes exposed for `layout`; the stride is always that of [`Vertex`].
pub(super) fn batch_attributes(layout: VertexLayout) -> Vec<wgpu::VertexAttribute> {
    layout.attributes().iter().copied().map(attribute).collect()
}

pub(super) fn batch_vertex_layout(attributes: &[wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'_> {
    wgpu::VertexBufferLayout {
        array_stride: Vertex::SIZE,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes,
    }
}

const SCREEN_ATTRS: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

pub(super) fn screen_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: ScreenVertex::SIZE,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &SCREEN_ATTRS,
    }
}

// ── conversions ───────────────────────────────────────────────────────────

pub(super) fn topology(mode: DrawMode) -> wgpu::PrimitiveTopology {
    match mode {
        DrawMode::Points => wgpu::PrimitiveTopology::PointList,
        DrawMode::Lines => wgpu::PrimitiveTopology::LineList,
        DrawMode::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        DrawMode::Triangles => wgpu::PrimitiveTopology::TriangleList,
        DrawMode::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

pub(super) fn filter(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}
