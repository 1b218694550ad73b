use crate::backend::BackendError;
use crate::batch::CapacityExceeded;

/// Errors returned by batch and framebuffer operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    CapacityExceeded(#[from] CapacityExceeded),

    #[error("draw range {start}..{end} exceeds the {uploaded} uploaded indices")]
    DrawRangeExceeded { start: u64, end: u64, uploaded: u32 },

    #[error("framebuffer composited without a preceding start_render")]
    FramebufferNotBound,

    #[error("invalid size: {0}")]
    InvalidSize(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}
