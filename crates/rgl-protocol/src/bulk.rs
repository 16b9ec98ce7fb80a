//! Variable-length byte payloads (buffer uploads, texel uploads, readback
//! replies), LZ4-compressed above a size threshold.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::WireError;

/// Minimum payload size to attempt LZ4 compression (bytes).
/// Payloads smaller than this are carried raw to avoid overhead.
pub const COMPRESSION_THRESHOLD: usize = 512;

/// A length-prefixed trailing byte payload inside a command record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub struct BulkBytes {
    compressed: bool,
    data: Vec<u8>,
}

impl BulkBytes {
    /// Wrap raw bytes, compressing when the payload is large enough and
    /// compression actually shrinks it.
    pub fn pack(bytes: &[u8]) -> Self {
        Self::pack_with_threshold(bytes, COMPRESSION_THRESHOLD)
    }

    pub fn pack_with_threshold(bytes: &[u8], threshold: usize) -> Self {
        if bytes.len() > threshold {
            let compressed = lz4_flex::compress_prepend_size(bytes);
            if compressed.len() < bytes.len() {
                return Self {
                    compressed: true,
                    data: compressed,
                };
            }
        }
        Self {
            compressed: false,
            data: bytes.to_vec(),
        }
    }

    /// Wrap a typed slice (vertex data, uniform blocks) as raw bytes.
    pub fn pack_slice<T: bytemuck::Pod>(values: &[T]) -> Self {
        Self::pack(bytemuck::cast_slice(values))
    }

    /// Recover the original bytes, decompressing if needed.
    pub fn unpack(&self) -> Result<Cow<'_, [u8]>, WireError> {
        if self.compressed {
            lz4_flex::decompress_size_prepended(&self.data)
                .map(Cow::Owned)
                .map_err(|e| WireError::Decompression(e.to_string()))
        } else {
            Ok(Cow::Borrowed(&self.data))
        }
    }

    /// Encoded (possibly compressed) size on the wire.
    pub fn wire_len(&self) -> usize {
        self.data.len()
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }
}
