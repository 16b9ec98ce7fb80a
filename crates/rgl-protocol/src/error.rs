use serde::{Deserialize, Serialize};

/// Failures a host can report back across the protocol boundary.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum ProtocolError {
    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    #[error("unsupported command: {0}")]
    UnsupportedCommand(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("out of memory: requested {requested} bytes")]
    OutOfMemory { requested: u64 },

    #[error("host disconnected")]
    Disconnected,

    #[error("host error: {0}")]
    HostError(String),
}

/// Failures in the record stream itself.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("record too large: {0} bytes")]
    RecordTooLarge(u64),

    #[error("truncated record: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("decompression error: {0}")]
    Decompression(String),

    #[error("opcode mismatch: header says {header:#06x}, payload decodes as {payload:#06x}")]
    OpcodeMismatch { header: u32, payload: u32 },
}
