//! Record-stream encoding for the remote execution path.
//!
//! A flush transmits one batch: a sequence of variable-length records, each
//! `{opcode: u32, payload_len: u32}` little-endian followed by `payload_len`
//! bytes of serialized command. Records are never split across flush
//! boundaries.

use crate::commands::GlCommand;
use crate::error::WireError;

/// Record header size in bytes: opcode(4) + payload_len(4).
pub const RECORD_HEADER_SIZE: usize = 8;

/// Maximum payload size for one record: 256 MB.
pub const MAX_RECORD_SIZE: u32 = 256 * 1024 * 1024;

/// Serialize one command and append it as a record to `buf`.
/// Returns the number of bytes appended.
pub fn encode_record(buf: &mut Vec<u8>, cmd: &GlCommand) -> Result<usize, WireError> {
    let payload = rkyv::to_bytes::<rkyv::rancor::Error>(cmd)
        .map_err(|e| WireError::Serialization(e.to_string()))?;

    if payload.len() as u64 > MAX_RECORD_SIZE as u64 {
        return Err(WireError::RecordTooLarge(payload.len() as u64));
    }

    buf.extend_from_slice(&cmd.opcode().to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&payload);

    Ok(RECORD_HEADER_SIZE + payload.len())
}

/// Exact encoded size of a command, without appending it anywhere.
pub fn record_len(cmd: &GlCommand) -> Result<usize, WireError> {
    let payload = rkyv::to_bytes::<rkyv::rancor::Error>(cmd)
        .map_err(|e| WireError::Serialization(e.to_string()))?;
    Ok(RECORD_HEADER_SIZE + payload.len())
}

/// Iterator over the records of one flushed batch.
pub struct RecordReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> RecordReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn read_record(&mut self) -> Result<GlCommand, WireError> {
        let remaining = self.buf.len() - self.pos;
        if remaining < RECORD_HEADER_SIZE {
            return Err(WireError::Truncated {
                needed: RECORD_HEADER_SIZE,
                available: remaining,
            });
        }

        let header = &self.buf[self.pos..self.pos + RECORD_HEADER_SIZE];
        let opcode = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let payload_len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if payload_len > MAX_RECORD_SIZE {
            return Err(WireError::RecordTooLarge(payload_len as u64));
        }

        let start = self.pos + RECORD_HEADER_SIZE;
        let end = start + payload_len as usize;
        if end > self.buf.len() {
            return Err(WireError::Truncated {
                needed: payload_len as usize,
                available: self.buf.len() - start,
            });
        }

        // Records sit at arbitrary offsets inside the batch; rkyv needs the
        // archived bytes aligned, so copy the payload out first.
        let mut payload = rkyv::util::AlignedVec::<16>::new();
        payload.extend_from_slice(&self.buf[start..end]);
        let cmd = rkyv::from_bytes::<GlCommand, rkyv::rancor::Error>(&payload)
            .map_err(|e| WireError::Serialization(e.to_string()))?;

        if cmd.opcode() != opcode {
            return Err(WireError::OpcodeMismatch {
                header: opcode,
                payload: cmd.opcode(),
            });
        }

        self.pos = end;
        Ok(cmd)
    }
}

impl<'a> Iterator for RecordReader<'a> {
    type Item = Result<GlCommand, WireError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_empty() {
            return None;
        }
        let res = self.read_record();
        if res.is_err() {
            // Poison the reader so a decode error terminates the batch.
            self.pos = self.buf.len();
        }
        Some(res)
    }
}
