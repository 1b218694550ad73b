use super::{BufferId, ShaderId, ShaderKind, TargetId, VertexAttr, VertexLayout};

/// Failures reported by a [`super::GpuBackend`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("failed to create {what}: {reason}")]
    ResourceCreation { what: &'static str, reason: String },

    #[error("unknown buffer {0:?}")]
    UnknownBuffer(BufferId),

    #[error("unknown render target {0:?}")]
    UnknownTarget(TargetId),

    #[error("unknown shader {0:?}")]
    UnknownShader(ShaderId),

    #[error("shader {shader:?} is not a {expected:?} shader")]
    ShaderKindMismatch { shader: ShaderId, expected: ShaderKind },

    #[error("shader {shader:?} reads {missing:?}, which layout {layout:?} does not provide")]
    LayoutMismatch { shader: ShaderId, layout: VertexLayout, missing: VertexAttr },

    #[error("write of {len} bytes at offset {offset} overruns buffer {buffer:?} ({size} bytes)")]
    WriteOutOfBounds { buffer: BufferId, offset: u64, len: u64, size: u64 },

    #[error("buffer writes must be 4-byte aligned (offset {offset}, {len} bytes)")]
    MisalignedWrite { offset: u64, len: u64 },

    #[error("index range at byte {offset} (+{count} indices) overruns buffer {buffer:?} ({size} bytes)")]
    IndexRangeOutOfBounds { buffer: BufferId, offset: u64, count: u32, size: u64 },

    #[error("no frame in progress")]
    NoActiveFrame,

    #[error("a frame is already in progress")]
    FrameInProgress,

    #[error("no shader in use")]
    NoActiveShader,

    #[error("gpu validation error: {0}")]
    Validation(String),

    #[error("surface unusable: {0}")]
    SurfaceFatal(String),
}
