//! Client-side error taxonomy.
//!
//! Validation failures queue a GL error code and turn the offending call into
//! a no-op; backend failures are fatal to the context generation.

use std::collections::VecDeque;

use rgl_protocol::error::{ProtocolError, WireError};
use rgl_protocol::types::GlError;
use rgl_protocol::ResourceKind;
use tracing::debug;

use crate::context::LossReason;

/// Why a call was rejected before encoding. Every variant maps onto one of
/// the queued GL error codes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("object belongs to a different context generation")]
    WrongContext,

    #[error("object was already deleted")]
    AlreadyDeleted,

    #[error("buffer kind is fixed at first bind and does not match this target")]
    KindMismatch,

    #[error("expected a {expected:?} object, got {actual:?}")]
    WrongKind {
        expected: ResourceKind,
        actual: ResourceKind,
    },

    #[error("texture target is fixed at first bind and does not match")]
    TargetMismatch,

    #[error("slot index {index} out of range (limit {limit})")]
    SlotOutOfRange { index: u32, limit: u32 },

    #[error("no object bound to the target")]
    NothingBound,

    #[error("deleting an opaque framebuffer requires can_delete_opaque")]
    OpaqueFramebuffer,

    #[error("shader is already attached to the program")]
    AlreadyAttached,

    #[error("shader is not attached to the program")]
    NotAttached,

    #[error("query is already active")]
    QueryActive,

    #[error("no active query for this target")]
    NoActiveQuery,

    #[error("query result is not yet available")]
    ResultNotAvailable,

    #[error("negative or oversized dimension")]
    InvalidDimension,

    #[error("texel payload does not match descriptor")]
    TexelSizeMismatch,

    #[error("no program is in use")]
    NoProgramInUse,

    #[error("context is not lost")]
    NotLost,
}

impl ValidationError {
    /// The error-queue code surfaced through `get_error`.
    pub fn gl_error(&self) -> GlError {
        match self {
            ValidationError::SlotOutOfRange { .. } | ValidationError::InvalidDimension => {
                GlError::InvalidValue
            }
            ValidationError::TexelSizeMismatch => GlError::InvalidValue,
            _ => GlError::InvalidOperation,
        }
    }
}

/// A fatal condition in the encode/transport path. These never surface as
/// per-call errors; they force the context generation into a lost state.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("pending command buffer limit exceeded: {requested} > {limit} bytes")]
    AllocationFailure { requested: usize, limit: usize },

    #[error("execution endpoint disconnected")]
    TransportClosed,

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Host(#[from] ProtocolError),
}

impl BackendError {
    pub fn loss_reason(&self) -> LossReason {
        match self {
            BackendError::TransportClosed => LossReason::Guilty,
            BackendError::Host(ProtocolError::Disconnected) => LossReason::Guilty,
            _ => LossReason::Unknown,
        }
    }
}

/// Bounded FIFO of pending GL errors, drained one per `get_error` call.
#[derive(Debug)]
pub struct ErrorQueue {
    queue: VecDeque<GlError>,
    cap: usize,
    dropped: u64,
}

impl ErrorQueue {
    pub fn new(cap: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            cap,
            dropped: 0,
        }
    }

    pub fn push(&mut self, error: GlError) {
        if self.queue.len() >= self.cap {
            self.dropped += 1;
            debug!(?error, dropped = self.dropped, "error queue full, dropping");
            return;
        }
        self.queue.push_back(error);
    }

    pub fn pop(&mut self) -> Option<GlError> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
