//! Vertex/index batching.
//!
//! A [`Batch`] accumulates quads, triangles and raw vertices in host memory,
//! uploads the filled part to its GPU buffers and draws it with one indexed
//! call. Filling and drawing go through a [`SelectedBatch`] guard.

mod batch;
mod builder;
mod vertex;

pub use batch::{Batch, BatchDesc, BatchKind, BatchState, IndexStride, SelectedBatch};
pub use builder::{CapacityExceeded, IndexBuilder, VertexBuffer};
pub use vertex::Vertex;
