//! The remote execution endpoint: a dedicated host thread serviced over a
//! pair of ordered channels. This is the crash-isolation boundary stand-in;
//! a disconnected channel is indistinguishable from a crashed host process
//! and is treated as an unrecoverable transport loss.

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error};

use rgl_protocol::commands::{GlCommand, GlReply};
use rgl_protocol::error::ProtocolError;
use rgl_protocol::wire::RecordReader;

use crate::error::BackendError;
use crate::host::{ContextInfo, ContextInit, ExecutionHost};

enum EndpointRequest {
    /// One flushed batch of encoded records.
    Batch(Vec<u8>),
    /// A round-trip command; the reply goes back on the reply channel.
    Sync(GlCommand),
    Resize((u32, u32)),
    MemoryPressure,
    Shutdown,
}

/// Client-side handle to the endpoint thread.
pub struct EndpointHandle {
    tx: Sender<EndpointRequest>,
    rx: Receiver<Result<GlReply, ProtocolError>>,
    join: Option<std::thread::JoinHandle<()>>,
}

impl EndpointHandle {
    /// Create the context on `host`, then move it onto a service thread.
    pub fn spawn(
        mut host: Box<dyn ExecutionHost>,
        init: &ContextInit,
    ) -> Result<(Self, ContextInfo), String> {
        let info = host.create_context(init)?;

        let (req_tx, req_rx) = crossbeam_channel::unbounded::<EndpointRequest>();
        let (reply_tx, reply_rx) = crossbeam_channel::unbounded();

        let join = std::thread::Builder::new()
            .name("rgl-endpoint".to_string())
            .spawn(move || service_loop(host, req_rx, reply_tx))
            .map_err(|e| format!("failed to spawn endpoint thread: {e}"))?;

        Ok((
            Self {
                tx: req_tx,
                rx: reply_rx,
                join: Some(join),
            },
            info,
        ))
    }

    pub fn send_batch(&self, batch: Vec<u8>) -> Result<(), BackendError> {
        self.tx
            .send(EndpointRequest::Batch(batch))
            .map_err(|_| BackendError::TransportClosed)
    }

    /// Send a synchronous command and block for its reply. Callers must
    /// have flushed everything encoded before it.
    pub fn round_trip(&self, cmd: GlCommand) -> Result<GlReply, BackendError> {
        self.tx
            .send(EndpointRequest::Sync(cmd))
            .map_err(|_| BackendError::TransportClosed)?;
        match self.rx.recv() {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => Err(BackendError::Host(e)),
            Err(_) => Err(BackendError::TransportClosed),
        }
    }

    pub fn resize(&self, size: (u32, u32)) -> Result<(), BackendError> {
        self.tx
            .send(EndpointRequest::Resize(size))
            .map_err(|_| BackendError::TransportClosed)
    }

    pub fn memory_pressure(&self) {
        let _ = self.tx.send(EndpointRequest::MemoryPressure);
    }
}

impl Drop for EndpointHandle {
    fn drop(&mut self) {
        let _ = self.tx.send(EndpointRequest::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn service_loop(
    mut host: Box<dyn ExecutionHost>,
    requests: Receiver<EndpointRequest>,
    replies: Sender<Result<GlReply, ProtocolError>>,
) {
    for request in requests {
        match request {
            EndpointRequest::Batch(batch) => {
                let mut executed = 0usize;
                for record in RecordReader::new(&batch) {
                    match record {
                        Ok(cmd) => {
                            host.execute(&cmd);
                            executed += 1;
                        }
                        Err(e) => {
                            // A malformed record poisons the rest of the
                            // batch; everything before it already ran.
                            error!("malformed record in batch: {e}");
                            break;
                        }
                    }
                }
                debug!(executed, bytes = batch.len(), "batch executed");
            }
            EndpointRequest::Sync(cmd) => {
                let reply = host.execute_sync(&cmd);
                if replies.send(reply).is_err() {
                    break;
                }
            }
            EndpointRequest::Resize(size) => host.resize(size),
            EndpointRequest::MemoryPressure => host.on_memory_pressure(),
            EndpointRequest::Shutdown => break,
        }
    }
    debug!("endpoint thread exiting");
}
