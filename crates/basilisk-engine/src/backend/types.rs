use crate::coords::Viewport;

// ── handles ───────────────────────────────────────────────────────────────

/// Opaque handle to a GPU buffer owned by a backend.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BufferId(pub(crate) u32);

/// Opaque handle to an off-screen color target (color texture + depth).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TargetId(pub(crate) u32);

/// Opaque handle to a shader program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ShaderId(pub(crate) u32);

impl ShaderId {
    /// Built-in batch program: position + color, camera and time uniforms.
    pub const BATCH: ShaderId = ShaderId(0);

    /// Built-in composite program: samples a framebuffer onto a screen quad.
    pub const COMPOSITE: ShaderId = ShaderId(1);

    /// Vertex attributes a shader reads, when known.
    ///
    /// Only the built-in batch program declares its inputs; user shaders are
    /// trusted to match the layout they are drawn with.
    pub fn required_attributes(self) -> &'static [VertexAttr] {
        if self == Self::BATCH { &[VertexAttr::Position, VertexAttr::Color] } else { &[] }
    }

    /// First attribute `self` reads that `layout` does not expose.
    pub fn missing_attribute(self, layout: VertexLayout) -> Option<VertexAttr> {
        self.required_attributes()
            .iter()
            .copied()
            .find(|a| !layout.contains(*a))
    }
}

// ── descriptors ───────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
}

#[derive(Debug, Copy, Clone)]
pub struct BufferDesc<'a> {
    pub label: Option<&'a str>,
    /// Size in bytes. Must be a multiple of 4.
    pub size: u64,
    pub usage: BufferUsage,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

#[derive(Debug, Copy, Clone)]
pub struct ColorTargetDesc<'a> {
    pub label: Option<&'a str>,
    pub size: Viewport,
    pub filter: FilterMode,
}

/// Which pipeline family a shader plugs into.
///
/// `Batch` programs read [`crate::batch::Vertex`] streams and camera uniforms;
/// `Composite` programs read screen-quad vertices and sample a color target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderKind {
    Batch,
    Composite,
}

#[derive(Debug, Copy, Clone)]
pub struct ShaderDesc<'a> {
    pub label: Option<&'a str>,
    /// WGSL source with `vs_main` / `fs_main` entry points.
    pub source: &'a str,
    pub kind: ShaderKind,
}

// ── render state ──────────────────────────────────────────────────────────

/// Where draws and clears currently land.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum RenderTarget {
    /// The window's swapchain image.
    #[default]
    Main,
    Offscreen(TargetId),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ClearFlags {
    pub color: bool,
    pub depth: bool,
}

impl ClearFlags {
    pub const ALL: Self = Self { color: true, depth: true };
}

/// Primitive topology used by indexed batch draws.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum DrawMode {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
}

/// One attribute of the batch vertex format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VertexAttr {
    Position,
    TexCoord,
    Normal,
    Color,
}

impl VertexAttr {
    /// Shader location the attribute is bound to, whatever the layout.
    pub const fn location(self) -> u32 {
        match self {
            VertexAttr::Position => 0,
            VertexAttr::TexCoord => 1,
            VertexAttr::Normal => 2,
            VertexAttr::Color => 3,
        }
    }
}

/// Which vertex attributes a batch exposes to its shader.
///
/// The vertex stride never changes; a layout only selects attributes.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum VertexLayout {
    PositionTexture,
    PositionColor,
    PositionTextureNormal,
    PositionColorNormal,
    #[default]
    Full,
}

impl VertexLayout {
    pub fn contains(self, attr: VertexAttr) -> bool {
        self.attributes().contains(&attr)
    }

    pub const fn attributes(self) -> &'static [VertexAttr] {
        use VertexAttr::*;
        match self {
            VertexLayout::PositionTexture => &[Position, TexCoord],
            VertexLayout::PositionColor => &[Position, Color],
            VertexLayout::PositionTextureNormal => &[Position, TexCoord, Normal],
            VertexLayout::PositionColorNormal => &[Position, Normal, Color],
            VertexLayout::Full => &[Position, TexCoord, Normal, Color],
        }
    }
}

// ── draws ─────────────────────────────────────────────────────────────────

/// Indexed draw over `u32` indices with the active shader.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct IndexedDraw {
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub layout: VertexLayout,
    pub mode: DrawMode,
    /// Byte offset of the first index inside `index_buffer`.
    pub offset: u64,
    pub count: u32,
}

/// Non-indexed screen-quad draw sampling `source` with the active shader.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CompositeDraw {
    pub vertex_buffer: BufferId,
    pub source: TargetId,
    pub vertex_count: u32,
}

/// Result of trying to start a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStatus {
    Ready,
    /// Transient surface problem; nothing should be drawn this tick.
    Skipped,
}
