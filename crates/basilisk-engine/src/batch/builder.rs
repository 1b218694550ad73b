//! Host-side fixed-capacity vertex and index arrays.
//!
//! Both builders allocate their full capacity up front and never grow.
//! Writes are checked before anything is stored, so a failed push leaves the
//! builder exactly as it was.

use std::collections::TryReserveError;

use super::vertex::Vertex;

/// A push did not fit in the remaining capacity.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
#[error("{what} capacity exceeded: {used} used + {requested} requested > {capacity}")]
pub struct CapacityExceeded {
    pub what: &'static str,
    pub used: usize,
    pub requested: usize,
    pub capacity: usize,
}

// ── vertices ──────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct VertexBuffer {
    vertices: Vec<Vertex>,
    capacity: usize,
}

impl VertexBuffer {
    /// Reserves room for `capacity` vertices, failing instead of aborting
    /// when the allocation is refused.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut vertices = Vec::new();
        vertices.try_reserve_exact(capacity)?;
        Ok(Self { vertices, capacity })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fails unless `n` more vertices fit.
    pub fn reserve_check(&self, n: usize) -> Result<(), CapacityExceeded> {
        if self.vertices.len() + n > self.capacity {
            return Err(CapacityExceeded {
                what: "vertex",
                used: self.vertices.len(),
                requested: n,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Appends all of `vertices` or none of them.
    pub fn extend(&mut self, vertices: &[Vertex]) -> Result<(), CapacityExceeded> {
        self.reserve_check(vertices.len())?;
        self.vertices.extend_from_slice(vertices);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    #[inline]
    pub fn as_slice(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Filled prefix as raw bytes, ready for upload.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

// ── indices ───────────────────────────────────────────────────────────────

/// `u32` index array plus the running count of vertices the indices refer to.
///
/// Shapes are written as offsets relative to `unique`, which then advances by
/// the number of vertices the shape emitted.
#[derive(Debug)]
pub struct IndexBuilder {
    indices: Vec<u32>,
    capacity: usize,
    unique: u32,
}

impl IndexBuilder {
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut indices = Vec::new();
        indices.try_reserve_exact(capacity)?;
        Ok(Self { indices, capacity, unique: 0 })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Vertices referenced by shapes since the last clear.
    #[inline]
    pub fn unique(&self) -> u32 {
        self.unique
    }

    pub fn reserve_check(&self, n: usize) -> Result<(), CapacityExceeded> {
        if self.indices.len() + n > self.capacity {
            return Err(CapacityExceeded {
                what: "index",
                used: self.indices.len(),
                requested: n,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Writes `unique + o` for every `o` in `offsets`, then advances
    /// `unique` by `vertices`.
    pub fn push_shape(&mut self, offsets: &[u32], vertices: u32) -> Result<(), CapacityExceeded> {
        self.reserve_check(offsets.len())?;
        let base = self.unique;
        self.indices.extend(offsets.iter().map(|o| base + o));
        self.unique += vertices;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.indices.clear();
        self.unique = 0;
    }

    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
