use std::collections::TryReserveError;

use crate::backend::{
    BufferDesc, BufferId, BufferUsage, DrawMode, GpuBackend, IndexedDraw, ShaderId, VertexLayout,
};
use crate::camera::Camera;
use crate::coords::{Rgba8, Vec2, Vec3};
use crate::error::RenderError;
use crate::texture::{AtlasRect, Texture};

use super::builder::{IndexBuilder, VertexBuffer};
use super::vertex::Vertex;

const QUAD_VERTICES: usize = 4;
const QUAD_INDICES: usize = 6;

const QUAD_OFFSETS: [u32; 6] = [0, 1, 2, 1, 2, 3];
const TRIANGLE_OFFSETS: [u32; 3] = [0, 1, 2];

/// When a batch's GPU buffers are allocated.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum BatchKind {
    /// Buffers are created with the batch.
    #[default]
    Static,
    /// Buffers are created at the first upload, with the same capacity.
    Dynamic,
}

/// How many indices one unit of `start_index` covers in [`SelectedBatch::render`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum IndexStride {
    Vertex,
    Line,
    Triangle,
    #[default]
    Quad,
}

impl IndexStride {
    #[inline]
    pub const fn indices(self) -> u64 {
        match self {
            IndexStride::Vertex => 1,
            IndexStride::Line => 2,
            IndexStride::Triangle => 3,
            IndexStride::Quad => 6,
        }
    }
}

/// Where a batch is in its fill/upload/draw cycle.
///
/// The state outlives the selection guard; whether a guard is currently
/// alive is reported separately by [`Batch::is_selected`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BatchState {
    Unselected,
    Selected,
    Filled,
    Uploaded,
    Rendered,
}

/// Creation parameters for [`Batch::new`].
#[derive(Debug, Copy, Clone)]
pub struct BatchDesc {
    /// Maximum number of quads; vertex capacity is four times this, index
    /// capacity six times.
    pub capacity: usize,
    pub kind: BatchKind,
    pub layout: VertexLayout,
    pub camera: Camera,
}

impl Default for BatchDesc {
    fn default() -> Self {
        Self {
            capacity: 1024,
            kind: BatchKind::Static,
            layout: VertexLayout::Full,
            camera: Camera::default(),
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct GpuBuffers {
    vertex: BufferId,
    index: BufferId,
}

/// Host vertex/index storage plus the GPU buffers it is uploaded into.
///
/// A batch is filled and drawn through the guard returned by
/// [`Batch::select`].
#[derive(Debug)]
pub struct Batch {
    capacity: usize,
    vertices: VertexBuffer,
    indices: IndexBuilder,
    buffers: Option<GpuBuffers>,

    kind: BatchKind,
    layout: VertexLayout,
    shader: ShaderId,
    camera: Camera,
    mode: DrawMode,
    stride: IndexStride,

    draw_count_non_resetting: u32,
    state: BatchState,
    selected: bool,
}

/// Vertex and index capacities for `quads` quads.
///
/// Index values and draw counts are `u32`, so the index capacity (the larger
/// of the two) must fit in one.
fn quad_capacities(quads: usize) -> Result<(usize, usize), RenderError> {
    let too_large = || RenderError::InvalidSize(format!("batch capacity {quads} is too large"));

    let vertices = quads.checked_mul(QUAD_VERTICES).ok_or_else(too_large)?;
    let indices = quads.checked_mul(QUAD_INDICES).ok_or_else(too_large)?;
    u32::try_from(indices).map_err(|_| too_large())?;
    (vertices as u64).checked_mul(Vertex::SIZE).ok_or_else(too_large)?;

    Ok((vertices, indices))
}

impl Batch {
    pub fn new(gpu: &mut dyn GpuBackend, desc: &BatchDesc) -> Result<Self, RenderError> {
        if desc.capacity == 0 {
            return Err(RenderError::InvalidSize("batch capacity must be at least 1".into()));
        }

        let (vertex_capacity, index_capacity) = quad_capacities(desc.capacity)?;
        let out_of_memory =
            |e: TryReserveError| RenderError::InvalidSize(format!("batch capacity {}: {e}", desc.capacity));

        let mut batch = Self {
            capacity: desc.capacity,
            vertices: VertexBuffer::try_with_capacity(vertex_capacity).map_err(out_of_memory)?,
            indices: IndexBuilder::try_with_capacity(index_capacity).map_err(out_of_memory)?,
            buffers: None,
            kind: desc.kind,
            layout: desc.layout,
            shader: ShaderId::BATCH,
            camera: desc.camera,
            mode: DrawMode::default(),
            stride: IndexStride::default(),
            draw_count_non_resetting: 0,
            state: BatchState::Unselected,
            selected: false,
        };

        if batch.kind == BatchKind::Static {
            batch.ensure_buffers(gpu)?;
        }

        log::trace!("batch created: {} quads, {:?}", desc.capacity, desc.kind);
        Ok(batch)
    }

    fn ensure_buffers(&mut self, gpu: &mut dyn GpuBackend) -> Result<GpuBuffers, RenderError> {
        if let Some(b) = self.buffers {
            return Ok(b);
        }

        let vertex = gpu.create_buffer(&BufferDesc {
            label: Some("basilisk batch vertices"),
            size: (self.vertices.capacity() as u64) * Vertex::SIZE,
            usage: BufferUsage::Vertex,
        })?;
        let index = match gpu.create_buffer(&BufferDesc {
            label: Some("basilisk batch indices"),
            size: (self.indices.capacity() as u64) * 4,
            usage: BufferUsage::Index,
        }) {
            Ok(id) => id,
            Err(err) => {
                gpu.destroy_buffer(vertex);
                return Err(err.into());
            }
        };

        let b = GpuBuffers { vertex, index };
        self.buffers = Some(b);
        Ok(b)
    }

    /// Makes this batch the target of pushes and draws.
    ///
    /// The guard borrows both the batch and the backend, so only one batch can
    /// be selected against a backend at a time. Quads pushed through the guard
    /// use `atlas` for their UVs until [`SelectedBatch::set_atlas`] changes it.
    pub fn select<'a>(&'a mut self, gpu: &'a mut dyn GpuBackend, time: f32) -> SelectedBatch<'a> {
        if self.state == BatchState::Unselected {
            self.state = BatchState::Selected;
        }
        self.selected = true;
        SelectedBatch { batch: self, gpu, time, atlas: Texture::EMPTY.atlas }
    }

    /// Releases host arrays and GPU buffers.
    pub fn free(self, gpu: &mut dyn GpuBackend) {
        if let Some(b) = self.buffers {
            gpu.destroy_buffer(b.vertex);
            gpu.destroy_buffer(b.index);
        }
        log::trace!("batch freed: {} quads", self.capacity);
    }

    // ── accessors ─────────────────────────────────────────────────────────

    /// Capacity in quads.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Index count captured by the last upload; survives `render`.
    #[inline]
    pub fn size(&self) -> u32 {
        self.draw_count_non_resetting
    }

    #[inline]
    pub fn vertex_draw_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn index_draw_count(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn index_draw_unique_count(&self) -> u32 {
        self.indices.unique()
    }

    pub fn vertices(&self) -> &[Vertex] {
        self.vertices.as_slice()
    }

    pub fn indices(&self) -> &[u32] {
        self.indices.as_slice()
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// True while a [`SelectedBatch`] guard for this batch is alive.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn kind(&self) -> BatchKind {
        self.kind
    }

    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    pub fn has_gpu_buffers(&self) -> bool {
        self.buffers.is_some()
    }

    // ── settings ──────────────────────────────────────────────────────────

    pub fn shader(&self) -> ShaderId {
        self.shader
    }

    pub fn set_shader(&mut self, shader: ShaderId) {
        self.shader = shader;
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.mode
    }

    pub fn set_draw_mode(&mut self, mode: DrawMode) {
        self.mode = mode;
    }

    pub fn index_stride(&self) -> IndexStride {
        self.stride
    }

    pub fn set_index_stride(&mut self, stride: IndexStride) {
        self.stride = stride;
    }

    fn reset_counters(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }
}

// ── selected batch ────────────────────────────────────────────────────────

/// A batch selected for filling and drawing.
pub struct SelectedBatch<'a> {
    batch: &'a mut Batch,
    gpu: &'a mut dyn GpuBackend,
    time: f32,
    atlas: AtlasRect,
}

impl<'a> SelectedBatch<'a> {
    pub fn batch(&self) -> &Batch {
        &*self.batch
    }

    pub fn batch_mut(&mut self) -> &mut Batch {
        &mut *self.batch
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn atlas(&self) -> AtlasRect {
        self.atlas
    }

    pub fn set_atlas(&mut self, atlas: AtlasRect) {
        self.atlas = atlas;
    }

    pub fn with_atlas(mut self, atlas: AtlasRect) -> Self {
        self.atlas = atlas;
        self
    }

    // ── pushes ────────────────────────────────────────────────────────────

    /// Appends one raw vertex. Indices are not touched.
    pub fn push_vertex(
        &mut self,
        position: Vec3,
        tex_coord: [f32; 2],
        normal: Vec3,
        color: Rgba8,
    ) -> Result<(), RenderError> {
        self.batch.vertices.extend(&[Vertex::new(position, tex_coord, normal, color)])?;
        self.batch.state = BatchState::Filled;
        Ok(())
    }

    /// Axis-aligned quad with its bottom-left corner at `origin`.
    pub fn push_quad(&mut self, origin: Vec2, size: Vec2, color: Rgba8) -> Result<(), RenderError> {
        self.batch.vertices.reserve_check(QUAD_VERTICES)?;
        self.batch.indices.reserve_check(QUAD_INDICES)?;

        let (x0, y0) = (origin.x, origin.y);
        let (x1, y1) = (origin.x + size.x, origin.y + size.y);
        let a = self.atlas;
        let n = Vec3::zero();

        let quad = [
            Vertex::new(Vec3::new(x0, y0, 0.0), [a.x0, a.y1], n, color),
            Vertex::new(Vec3::new(x1, y0, 0.0), [a.x1, a.y1], n, color),
            Vertex::new(Vec3::new(x0, y1, 0.0), [a.x0, a.y0], n, color),
            Vertex::new(Vec3::new(x1, y1, 0.0), [a.x1, a.y0], n, color),
        ];

        self.batch.vertices.extend(&quad)?;
        self.batch.indices.push_shape(&QUAD_OFFSETS, QUAD_VERTICES as u32)?;
        self.batch.state = BatchState::Filled;
        Ok(())
    }

    /// Triangle on the `z = 0` plane. UVs are the unit triangle; the atlas
    /// rect is not applied.
    pub fn push_triangle(&mut self, p1: Vec2, p2: Vec2, p3: Vec2, color: Rgba8) -> Result<(), RenderError> {
        self.batch.vertices.reserve_check(3)?;
        self.batch.indices.reserve_check(3)?;

        let n = Vec3::zero();
        let tri = [
            Vertex::new(Vec3::from_xy(p1, 0.0), [0.0, 0.0], n, color),
            Vertex::new(Vec3::from_xy(p2, 0.0), [1.0, 0.0], n, color),
            Vertex::new(Vec3::from_xy(p3, 0.0), [0.0, 1.0], n, color),
        ];

        self.batch.vertices.extend(&tri)?;
        self.batch.indices.push_shape(&TRIANGLE_OFFSETS, 3)?;
        self.batch.state = BatchState::Filled;
        Ok(())
    }

    // ── gpu ───────────────────────────────────────────────────────────────

    /// Uploads the filled part of both host arrays and records the index
    /// count as the batch [`size`](Batch::size).
    pub fn upload(&mut self) -> Result<(), RenderError> {
        let buffers = self.batch.ensure_buffers(&mut *self.gpu)?;

        if !self.batch.vertices.is_empty() {
            self.gpu.write_buffer(buffers.vertex, 0, self.batch.vertices.as_bytes())?;
        }
        if !self.batch.indices.is_empty() {
            self.gpu.write_buffer(buffers.index, 0, self.batch.indices.as_bytes())?;
        }

        self.batch.draw_count_non_resetting = self.batch.indices.len() as u32;
        self.batch.state = BatchState::Uploaded;
        log::trace!(
            "batch uploaded: {} vertices, {} indices",
            self.batch.vertices.len(),
            self.batch.indices.len()
        );
        Ok(())
    }

    /// Draws `draw_count` uploaded indices starting at `start_index` stride
    /// units, then resets the running counters.
    pub fn render(&mut self, start_index: u32, draw_count: u32) -> Result<(), RenderError> {
        let first = start_index as u64 * self.batch.stride.indices();
        let end = first + draw_count as u64;
        let uploaded = self.batch.draw_count_non_resetting;
        if end > uploaded as u64 {
            return Err(RenderError::DrawRangeExceeded { start: first, end, uploaded });
        }

        let shader = self.batch.shader;
        self.gpu.use_shader(shader)?;
        self.gpu.set_time_uniform(shader, self.time)?;
        self.gpu.set_view_uniform(shader, &self.batch.camera)?;
        self.gpu.set_projection_uniform(shader, &self.batch.camera)?;

        // A non-empty range implies an upload, hence buffers.
        if let Some(b) = self.batch.buffers.filter(|_| draw_count > 0) {
            self.gpu.draw_indexed(&IndexedDraw {
                vertex_buffer: b.vertex,
                index_buffer: b.index,
                layout: self.batch.layout,
                mode: self.batch.mode,
                offset: first * 4,
                count: draw_count,
            })?;
        }

        self.batch.reset_counters();
        self.batch.state = BatchState::Rendered;
        Ok(())
    }

    /// Draws everything uploaded.
    pub fn render_all(&mut self) -> Result<(), RenderError> {
        let count = self.batch.size();
        self.render(0, count)
    }
}

impl Drop for SelectedBatch<'_> {
    fn drop(&mut self) {
        self.batch.selected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, Command, RecordingBackend};

    fn batch(gpu: &mut RecordingBackend, capacity: usize) -> Batch {
        Batch::new(gpu, &BatchDesc { capacity, ..BatchDesc::default() }).unwrap()
    }

    fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    // ── counters ──

    #[test]
    fn quads_advance_counters_by_four_and_six() {
        let mut gpu = RecordingBackend::default();
        let mut b = batch(&mut gpu, 8);
        {
            let mut sel = b.select(&mut gpu, 0.0);
            for i in 0..5 {
                sel.push_quad(v(i as f32, 0.0), v(1.0, 1.0), Rgba8::WHITE).unwrap();
            }
        }
        assert_eq!(b.vertex_draw_count(), 20);
        assert_eq!(b.index_draw_count(), 30);
        assert_eq!(b.index_draw_unique_count(), 20);
        assert!(b.indices().iter().all(|&i| i < 20));
    }

    #[test]
    fn triangles_advance_counters_by_three() {
        let mut gpu = RecordingBackend::default();
        let mut b = batch(&mut gpu, 4);
        {
            let mut sel = b.select(&mut gpu, 0.0);
            for _ in 0..4 {
                sel.push_triangle(v(0.0, 0.0), v(1.0, 0.0), v(0.0, 1.0), Rgba8::WHITE).unwrap();
            }
        }
        assert_eq!(b.vertex_draw_count(), 12);
        assert_eq!(b.index_draw_count(), 12);
        assert!(b.indices().iter().all(|&i| i < 12));
    }

    #[test]
    fn two_quad_scenario_produces_expected_indices() {
        const RED: Rgba8 = Rgba8::new(255, 0, 0, 255);
        const GREEN: Rgba8 = Rgba8::new(0, 255, 0, 255);

        let mut gpu = RecordingBackend::default();
        let mut b = batch(&mut gpu, 2);
        {
            let mut sel = b.select(&mut gpu, 0.0);
            sel.push_quad(v(0.0, 0.0), v(10.0, 10.0), RED).unwrap();
            sel.push_quad(v(20.0, 20.0), v(5.0, 5.0), GREEN).unwrap();
        }
        assert_eq!(b.vertex_draw_count(), 8);
        assert_eq!(b.index_draw_count(), 12);
        assert_eq!(b.index_draw_unique_count(), 8);
        assert_eq!(b.indices(), &[0, 1, 2, 1, 2, 3, 4, 5, 6, 5, 6, 7]);

        let vs = b.vertices();
        assert_eq!(vs[3].position, [10.0, 10.0, 0.0]);
        assert_eq!(vs[4].position, [20.0, 20.0, 0.0]);
        assert_eq!(vs[7].position, [25.0, 25.0, 0.0]);
        assert!(vs[..4].iter().all(|v| v.color == RED.to_array()));
        assert!(vs[4..].iter().all(|v| v.color == GREEN.to_array()));
    }

    #[test]
    fn push_vertex_leaves_unique_count_alone() {
        let mut gpu = RecordingBackend::default();
        let mut b = batch(&mut gpu, 1);
        {
            let mut sel = b.select(&mut gpu, 0.0);
            sel.push_vertex(Vec3::zero(), [0.0, 0.0], Vec3::zero(), Rgba8::WHITE).unwrap();
        }
        assert_eq!(b.vertex_draw_count(), 1);
        assert_eq!(b.index_draw_count(), 0);
        assert_eq!(b.index_draw_unique_count(), 0);
    }

    // ── capacity ──

    #[test]
    fn exactly_capacity_quads_fit() {
        let mut gpu = RecordingBackend::default();
        let mut b = batch(&mut gpu, 3);
        let mut sel = b.select(&mut gpu, 0.0);
        for _ in 0..3 {
            sel.push_quad(v(0.0, 0.0), v(1.0, 1.0), Rgba8::WHITE).unwrap();
        }

        let err = sel.push_quad(v(0.0, 0.0), v(1.0, 1.0), Rgba8::WHITE).unwrap_err();
        assert!(matches!(err, RenderError::CapacityExceeded(_)));
        assert_eq!(sel.batch().vertex_draw_count(), 12);
        assert_eq!(sel.batch().index_draw_count(), 18);
        assert_eq!(sel.batch().index_draw_unique_count(), 12);
    }

    #[test]
    fn failed_triangle_writes_nothing() {
        let mut gpu = RecordingBackend::default();
        let mut b = batch(&mut gpu, 1);
        let mut sel = b.select(&mut gpu, 0.0);
        sel.push_quad(v(0.0, 0.0), v(1.0, 1.0), Rgba8::WHITE).unwrap();

        // 4 of 4 vertices used: the triangle's indices would fit, its vertices would not.
        assert!(sel.push_triangle(v(0.0, 0.0), v(1.0, 0.0), v(0.0, 1.0), Rgba8::WHITE).is_err());
        assert_eq!(sel.batch().vertex_draw_count(), 4);
        assert_eq!(sel.batch().index_draw_count(), 6);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut gpu = RecordingBackend::default();
        let err = Batch::new(&mut gpu, &BatchDesc { capacity: 0, ..BatchDesc::default() }).unwrap_err();
        assert!(matches!(err, RenderError::InvalidSize(_)));
        assert_eq!(gpu.live_buffers(), 0);
    }

    #[test]
    fn overflowing_capacity_is_rejected() {
        let mut gpu = RecordingBackend::default();
        for capacity in [usize::MAX / 2, u32::MAX as usize / QUAD_INDICES + 1] {
            let err = Batch::new(&mut gpu, &BatchDesc { capacity, ..BatchDesc::default() })
                .unwrap_err();
            assert!(matches!(err, RenderError::InvalidSize(_)), "capacity {capacity}: {err:?}");
        }
        assert_eq!(gpu.live_buffers(), 0);
    }

    // ── uvs ──

    #[test]
    fn quad_uvs_follow_atlas_rect() {
        let mut gpu = RecordingBackend::default();
        let mut b = batch(&mut gpu, 1);
        {
            let atlas = AtlasRect::new(0.25, 0.5, 0.75, 1.0);
            let mut sel = b.select(&mut gpu, 0.0).with_atlas(atlas);
            sel.push_quad(v(1.0, 2.0), v(3.0, 4.0), Rgba8::WHITE).unwrap();
        }
        let vs = b.vertices();
        assert_eq!(vs[0].position, [1.0, 2.0, 0.0]);
        assert_eq!(vs[0].tex_coord, [0.25, 1.0]);
        assert_eq!(vs[1].position, [4.0, 2.0, 0.0]);
        assert_eq!(vs[1].tex_coord, [0.75, 1.0]);
        assert_eq!(vs[2].position, [1.0, 6.0, 0.0]);
        assert_eq!(vs[2].tex_coord, [0.25, 0.5]);
        assert_eq!(vs[3].position, [4.0, 6.0, 0.0]);
        assert_eq!(vs[3].tex_coord, [0.75, 0.5]);
    }

    #[test]
    fn triangle_uvs_ignore_atlas() {
        let mut gpu = RecordingBackend::default();
        let mut b = batch(&mut gpu, 1);
        {
            let mut sel = b.select(&mut gpu, 0.0).with_atlas(AtlasRect::new(0.5, 0.5, 1.0, 1.0));
            sel.push_triangle(v(0.0, 0.0), v(1.0, 0.0), v(0.0, 1.0), Rgba8::WHITE).unwrap();
        }
        let uvs: Vec<_> = b.vertices().iter().map(|v| v.tex_coord).collect();
        assert_eq!(uvs, vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
    }

    // ── upload / render ──

    #[test]
    fn upload_writes_only_filled_prefix() {
        let mut gpu = RecordingBackend::default();
        let mut b = batch(&mut gpu, 10);
        gpu.take_commands();
        {
            let mut sel = b.select(&mut gpu, 0.0);
            sel.push_quad(v(0.0, 0.0), v(1.0, 1.0), Rgba8::WHITE).unwrap();
            sel.upload().unwrap();
        }
        assert_eq!(b.size(), 6);

        let writes: Vec<u64> = gpu
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::WriteBuffer { len, .. } => Some(*len),
                _ => None,
            })
            .collect();
        assert_eq!(writes, vec![4 * Vertex::SIZE, 24]);
    }

    #[test]
    fn uploaded_indices_reach_the_backend() {
        let mut gpu = RecordingBackend::default();
        let mut b = batch(&mut gpu, 2);
        {
            let mut sel = b.select(&mut gpu, 0.0);
            sel.push_quad(v(0.0, 0.0), v(1.0, 1.0), Rgba8::WHITE).unwrap();
            sel.push_quad(v(2.0, 0.0), v(1.0, 1.0), Rgba8::WHITE).unwrap();
            sel.upload().unwrap();
        }
        let index = gpu
            .commands()
            .iter()
            .find_map(|c| match c {
                Command::CreateBuffer { id, usage: BufferUsage::Index, .. } => Some(*id),
                _ => None,
            })
            .unwrap();
        assert_eq!(gpu.index_data(index).unwrap(), vec![0, 1, 2, 1, 2, 3, 4, 5, 6, 5, 6, 7]);
    }

    #[test]
    fn render_resets_counters_but_not_size() {
        let mut gpu = RecordingBackend::default();
        let mut b = batch(&mut gpu, 4);
        gpu.begin_frame().unwrap();
        {
            let mut sel = b.select(&mut gpu, 0.5);
            sel.push_quad(v(0.0, 0.0), v(1.0, 1.0), Rgba8::WHITE).unwrap();
            sel.push_quad(v(0.0, 0.0), v(1.0, 1.0), Rgba8::WHITE).unwrap();
            sel.upload().unwrap();
            sel.render_all().unwrap();
            assert_eq!(sel.batch().state(), BatchState::Rendered);
        }
        assert_eq!(b.vertex_draw_count(), 0);
        assert_eq!(b.index_draw_count(), 0);
        assert_eq!(b.index_draw_unique_count(), 0);
        assert_eq!(b.size(), 12);
        assert_eq!(b.state(), BatchState::Rendered);
    }

    #[test]
    fn state_survives_the_guard() {
        let mut gpu = RecordingBackend::default();
        let mut b = batch(&mut gpu, 2);
        {
            let sel = b.select(&mut gpu, 0.0);
            assert!(sel.batch().is_selected());
            assert_eq!(sel.batch().state(), BatchState::Selected);
        }
        assert!(!b.is_selected());
        assert_eq!(b.state(), BatchState::Selected);

        {
            let mut sel = b.select(&mut gpu, 0.0);
            sel.push_quad(v(0.0, 0.0), v(1.0, 1.0), Rgba8::WHITE).unwrap();
        }
        assert_eq!(b.state(), BatchState::Filled);

        b.select(&mut gpu, 0.0).upload().unwrap();
        assert_eq!(b.state(), BatchState::Uploaded);
        assert!(!b.is_selected());
    }

    #[test]
    fn render_sets_uniforms_before_drawing() {
        let mut gpu = RecordingBackend::default();
        let mut b = batch(&mut gpu, 1);
        gpu.begin_frame().unwrap();
        {
            let mut sel = b.select(&mut gpu, 0.25);
            sel.push_quad(v(0.0, 0.0), v(1.0, 1.0), Rgba8::WHITE).unwrap();
            sel.upload().unwrap();
        }
        gpu.take_commands();
        b.select(&mut gpu, 0.25).render(0, 6).unwrap();

        let cmds = gpu.commands();
        assert_eq!(cmds[0], Command::UseShader(ShaderId::BATCH));
        assert_eq!(cmds[1], Command::SetTime { shader: ShaderId::BATCH, time: 0.25 });
        assert!(matches!(cmds[2], Command::SetView { .. }));
        assert!(matches!(cmds[3], Command::SetProjection { .. }));
        assert!(matches!(cmds[4], Command::DrawIndexed(IndexedDraw { offset: 0, count: 6, .. })));
    }

    #[test]
    fn render_offset_uses_index_stride() {
        let mut gpu = RecordingBackend::default();
        let mut b = batch(&mut gpu, 4);
        gpu.begin_frame().unwrap();
        {
            let mut sel = b.select(&mut gpu, 0.0);
            for _ in 0..3 {
                sel.push_quad(v(0.0, 0.0), v(1.0, 1.0), Rgba8::WHITE).unwrap();
            }
            sel.upload().unwrap();
            sel.render(1, 6).unwrap();
        }
        let draw = gpu.commands().iter().rev().find_map(|c| match c {
            Command::DrawIndexed(d) => Some(*d),
            _ => None,
        });
        assert_eq!(draw.unwrap().offset, 6 * 4);

        b.set_index_stride(IndexStride::Triangle);
        b.select(&mut gpu, 0.0).render(2, 3).unwrap();
        let draw = gpu.commands().iter().rev().find_map(|c| match c {
            Command::DrawIndexed(d) => Some(*d),
            _ => None,
        });
        assert_eq!(draw.unwrap().offset, 2 * 3 * 4);
    }

    #[test]
    fn render_past_uploaded_range_fails() {
        let mut gpu = RecordingBackend::default();
        let mut b = batch(&mut gpu, 2);
        gpu.begin_frame().unwrap();
        let mut sel = b.select(&mut gpu, 0.0);
        sel.push_quad(v(0.0, 0.0), v(1.0, 1.0), Rgba8::WHITE).unwrap();
        sel.upload().unwrap();

        let err = sel.render(1, 6).unwrap_err();
        assert_eq!(err, RenderError::DrawRangeExceeded { start: 6, end: 12, uploaded: 6 });
        assert_eq!(sel.batch().index_draw_count(), 6);
    }

    #[test]
    fn render_outside_frame_surfaces_backend_error() {
        let mut gpu = RecordingBackend::default();
        let mut b = batch(&mut gpu, 1);
        let mut sel = b.select(&mut gpu, 0.0);
        sel.push_quad(v(0.0, 0.0), v(1.0, 1.0), Rgba8::WHITE).unwrap();
        sel.upload().unwrap();
        assert_eq!(sel.render_all(), Err(RenderError::Backend(BackendError::NoActiveFrame)));
    }

    // ── lifecycle ──

    #[test]
    fn dynamic_batch_allocates_on_first_upload() {
        let mut gpu = RecordingBackend::default();
        let mut b = Batch::new(
            &mut gpu,
            &BatchDesc { capacity: 2, kind: BatchKind::Dynamic, ..BatchDesc::default() },
        )
        .unwrap();
        assert!(!b.has_gpu_buffers());
        assert_eq!(gpu.live_buffers(), 0);

        b.select(&mut gpu, 0.0).upload().unwrap();
        assert!(b.has_gpu_buffers());
        assert_eq!(gpu.live_buffers(), 2);
    }

    #[test]
    fn static_batch_allocates_capacity_sized_buffers() {
        let mut gpu = RecordingBackend::default();
        let _b = batch(&mut gpu, 3);
        let sizes: Vec<u64> = gpu
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::CreateBuffer { size, .. } => Some(*size),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, vec![12 * Vertex::SIZE, 18 * 4]);
    }

    #[test]
    fn free_destroys_gpu_buffers() {
        let mut gpu = RecordingBackend::default();
        let b = batch(&mut gpu, 2);
        assert_eq!(gpu.live_buffers(), 2);
        b.free(&mut gpu);
        assert_eq!(gpu.live_buffers(), 0);
    }

    #[test]
    fn defaults_match_batch_shader_and_triangles() {
        let mut gpu = RecordingBackend::default();
        let b = batch(&mut gpu, 1);
        assert_eq!(b.shader(), ShaderId::BATCH);
        assert_eq!(b.draw_mode(), DrawMode::Triangles);
        assert_eq!(*b.camera(), Camera::default());
        assert_eq!(b.index_stride(), IndexStride::Quad);
        assert_eq!(b.state(), BatchState::Unselected);
        assert!(!b.is_selected());
    }
}
