//! The execution-backend seam: one interface, two implementations, chosen
//! at generation construction and fixed for the generation's lifetime.
//!
//! In-process: every command is a direct call into the host; nothing is
//! ever pending. Remote: asynchronous commands accumulate in a pending
//! buffer that is transmitted as one batch on flush; synchronous commands
//! flush first, then block on the reply channel.

use tracing::debug;

use rgl_protocol::commands::{GlCommand, GlReply};
use rgl_protocol::wire;

use crate::context::BackendFactory;
use crate::endpoint::EndpointHandle;
use crate::error::BackendError;
use crate::host::{ContextInfo, ContextInit, ExecutionHost};

pub trait Backend {
    /// Encode (or directly execute) a fire-and-forget command.
    fn submit(&mut self, cmd: &GlCommand) -> Result<(), BackendError>;

    /// Flush, then execute a round-trip command and block for its reply.
    fn round_trip(&mut self, cmd: &GlCommand) -> Result<GlReply, BackendError>;

    /// Transmit accumulated commands. Idempotent if nothing is pending.
    fn flush(&mut self) -> Result<(), BackendError>;

    fn has_pending(&self) -> bool;

    fn drawing_buffer_size(&self) -> (u32, u32);

    fn resize(&mut self, size: (u32, u32)) -> Result<(), BackendError>;

    fn on_memory_pressure(&mut self);
}

// ── In-process ──────────────────────────────────────────────

pub struct InProcessBackend {
    host: Box<dyn ExecutionHost>,
}

impl InProcessBackend {
    pub fn create(
        mut host: Box<dyn ExecutionHost>,
        init: &ContextInit,
    ) -> Result<(Self, ContextInfo), String> {
        let info = host.create_context(init)?;
        Ok((Self { host }, info))
    }
}

impl Backend for InProcessBackend {
    fn submit(&mut self, cmd: &GlCommand) -> Result<(), BackendError> {
        self.host.execute(cmd);
        Ok(())
    }

    fn round_trip(&mut self, cmd: &GlCommand) -> Result<GlReply, BackendError> {
        Ok(self.host.execute_sync(cmd)?)
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn has_pending(&self) -> bool {
        false
    }

    fn drawing_buffer_size(&self) -> (u32, u32) {
        self.host.drawing_buffer_size()
    }

    fn resize(&mut self, size: (u32, u32)) -> Result<(), BackendError> {
        self.host.resize(size);
        Ok(())
    }

    fn on_memory_pressure(&mut self) {
        self.host.on_memory_pressure();
    }
}

// ── Remote ──────────────────────────────────────────────────

pub struct RemoteBackend {
    endpoint: EndpointHandle,
    pending: Vec<u8>,
    pending_records: usize,
    max_pending_bytes: usize,
    size: (u32, u32),
}

impl RemoteBackend {
    pub fn create(
        host: Box<dyn ExecutionHost>,
        init: &ContextInit,
        max_pending_bytes: usize,
    ) -> Result<(Self, ContextInfo), String> {
        let (endpoint, info) = EndpointHandle::spawn(host, init)?;
        let size = info.drawing_buffer_size;
        Ok((
            Self {
                endpoint,
                pending: Vec::new(),
                pending_records: 0,
                max_pending_bytes,
                size,
            },
            info,
        ))
    }
}

impl Backend for RemoteBackend {
    fn submit(&mut self, cmd: &GlCommand) -> Result<(), BackendError> {
        let start = self.pending.len();
        wire::encode_record(&mut self.pending, cmd)?;
        if self.pending.len() > self.max_pending_bytes {
            let requested = self.pending.len();
            // Roll the partial record back; the buffer stays consistent
            // even though the context is about to be lost.
            self.pending.truncate(start);
            return Err(BackendError::AllocationFailure {
                requested,
                limit: self.max_pending_bytes,
            });
        }
        self.pending_records += 1;
        Ok(())
    }

    fn round_trip(&mut self, cmd: &GlCommand) -> Result<GlReply, BackendError> {
        self.flush()?;
        self.endpoint.round_trip(cmd.clone())
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        let records = std::mem::take(&mut self.pending_records);
        debug!(records, bytes = batch.len(), "flushing batch");
        self.endpoint.send_batch(batch)
    }

    fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn drawing_buffer_size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, size: (u32, u32)) -> Result<(), BackendError> {
        // Keep ordering: everything encoded so far happens at the old size.
        self.flush()?;
        self.endpoint.resize(size)?;
        self.size = size;
        Ok(())
    }

    fn on_memory_pressure(&mut self) {
        self.endpoint.memory_pressure();
    }
}

// ── Factories ───────────────────────────────────────────────

/// Factory for in-process execution. `make_host` is called once per
/// generation, so a restore gets a fresh host.
pub fn in_process_factory<F>(mut make_host: F) -> Box<dyn BackendFactory>
where
    F: FnMut() -> Box<dyn ExecutionHost> + 'static,
{
    Box::new(move |init: &ContextInit| {
        let (backend, info) = InProcessBackend::create(make_host(), init)?;
        Ok((Box::new(backend) as Box<dyn Backend>, info))
    })
}

/// Factory for remote execution behind an endpoint thread.
pub fn remote_factory<F>(mut make_host: F, max_pending_bytes: usize) -> Box<dyn BackendFactory>
where
    F: FnMut() -> Box<dyn ExecutionHost> + 'static,
{
    Box::new(move |init: &ContextInit| {
        let (backend, info) = RemoteBackend::create(make_host(), init, max_pending_bytes)?;
        Ok((Box::new(backend) as Box<dyn Backend>, info))
    })
}
