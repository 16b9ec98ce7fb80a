//! Shared test fixture: a scripted execution host that records every
//! command it executes and answers synchronous queries with canned replies.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use rgl_client::host::{ContextInfo, ContextInit, ExecutionHost};
use rgl_client::{in_process_factory, remote_factory, ContextProxy, ProxyConfig};
use rgl_protocol::bulk::BulkBytes;
use rgl_protocol::commands::{CompileOutcome, GlCommand, GlReply, LinkOutcome, ParamValue};
use rgl_protocol::error::ProtocolError;
use rgl_protocol::types::{BufferTarget, GlError, Parameter, SyncWaitStatus};

pub type CommandLog = Arc<Mutex<Vec<GlCommand>>>;

#[derive(Clone)]
pub struct HostScript {
    pub size: (u32, u32),
    pub fail_create: bool,
    /// Report Disconnected from every synchronous command, simulating a
    /// crashed endpoint.
    pub disconnect_on_sync: bool,
    pub query_available: bool,
    pub sync_signaled: bool,
}

impl Default for HostScript {
    fn default() -> Self {
        Self {
            size: (64, 64),
            fail_create: false,
            disconnect_on_sync: false,
            query_available: true,
            sync_signaled: true,
        }
    }
}

pub struct RecordingHost {
    log: CommandLog,
    script: HostScript,
    buffers: HashMap<BufferTarget, Vec<u8>>,
}

impl RecordingHost {
    pub fn new(log: CommandLog, script: HostScript) -> Self {
        Self {
            log,
            script,
            buffers: HashMap::new(),
        }
    }
}

impl ExecutionHost for RecordingHost {
    fn execute(&mut self, cmd: &GlCommand) {
        self.log.lock().push(cmd.clone());
        match cmd {
            GlCommand::BufferData { target, data, .. } => {
                self.buffers
                    .insert(*target, data.unpack().expect("unpack upload").into_owned());
            }
            GlCommand::BufferSubData {
                target,
                offset,
                data,
            } => {
                let bytes = data.unpack().expect("unpack upload").into_owned();
                let buf = self.buffers.entry(*target).or_default();
                let end = *offset as usize + bytes.len();
                if buf.len() < end {
                    buf.resize(end, 0);
                }
                buf[*offset as usize..end].copy_from_slice(&bytes);
            }
            _ => {}
        }
    }

    fn execute_sync(&mut self, cmd: &GlCommand) -> Result<GlReply, ProtocolError> {
        if self.script.disconnect_on_sync {
            return Err(ProtocolError::Disconnected);
        }
        self.log.lock().push(cmd.clone());
        Ok(match cmd {
            GlCommand::GetParameter { param } => GlReply::Param(match param {
                Parameter::MaxTextureSize => ParamValue::Int(4096),
                Parameter::MaxVertexAttribs => ParamValue::Int(16),
                Parameter::Vendor => ParamValue::Str("rgl-mock".to_string()),
                Parameter::Renderer => ParamValue::Str("recording-host".to_string()),
                _ => ParamValue::Int(8),
            }),
            GlCommand::GetBufferParameter { target, .. } => GlReply::Param(ParamValue::Int(
                self.buffers.get(target).map(|b| b.len() as i64).unwrap_or(0),
            )),
            GlCommand::GetRenderbufferParameter { .. } => GlReply::Param(ParamValue::Int(64)),
            GlCommand::GetSamplerParameter { .. } => GlReply::Param(ParamValue::Int(0)),
            GlCommand::GetShaderCompileResult { .. } => GlReply::Compile(CompileOutcome {
                success: true,
                info_log: "mock compile ok".to_string(),
            }),
            GlCommand::GetProgramLinkResult { .. } => GlReply::Link(LinkOutcome {
                success: true,
                info_log: String::new(),
            }),
            GlCommand::GetUniformLocation { .. } => GlReply::UniformLocation(Some(7)),
            GlCommand::ReadPixels {
                width,
                height,
                format,
                ty,
                ..
            } => {
                let len = *width as usize * *height as usize * format.channels() * ty.byte_size();
                GlReply::Pixels(BulkBytes::pack(&vec![0xAB; len]))
            }
            GlCommand::GetBufferSubData {
                target,
                offset,
                length,
            } => {
                let buf = self.buffers.get(target).cloned().unwrap_or_default();
                let start = (*offset as usize).min(buf.len());
                let end = (start + *length as usize).min(buf.len());
                GlReply::Bytes(BulkBytes::pack(&buf[start..end]))
            }
            GlCommand::CheckError => GlReply::Error(GlError::NoError),
            GlCommand::GetSupportedExtensions => {
                GlReply::Extensions(vec!["RGL_mock_extension".to_string()])
            }
            GlCommand::GetQueryAvailable { .. } => GlReply::Available(self.script.query_available),
            GlCommand::GetQueryResult { .. } => GlReply::QueryResult(42),
            GlCommand::ClientWaitSync { .. } => GlReply::SyncWait(if self.script.sync_signaled {
                SyncWaitStatus::ConditionSatisfied
            } else {
                SyncWaitStatus::TimeoutExpired
            }),
            GlCommand::GetSyncStatus { .. } => GlReply::SyncStatus(self.script.sync_signaled),
            GlCommand::Finish => GlReply::Unit,
            other => {
                return Err(ProtocolError::UnsupportedCommand(format!("{other:?}")));
            }
        })
    }

    fn create_context(&mut self, init: &ContextInit) -> Result<ContextInfo, String> {
        if self.script.fail_create {
            return Err("scripted create failure".to_string());
        }
        Ok(ContextInfo {
            drawing_buffer_size: init.size,
        })
    }

    fn drawing_buffer_size(&self) -> (u32, u32) {
        self.script.size
    }

    fn resize(&mut self, size: (u32, u32)) {
        self.script.size = size;
    }
}

pub fn in_process_proxy() -> (ContextProxy, CommandLog) {
    in_process_proxy_with(HostScript::default())
}

pub fn in_process_proxy_with(script: HostScript) -> (ContextProxy, CommandLog) {
    let log: CommandLog = Arc::new(Mutex::new(Vec::new()));
    let factory_log = log.clone();
    let factory = in_process_factory(move || {
        Box::new(RecordingHost::new(factory_log.clone(), script.clone()))
            as Box<dyn ExecutionHost>
    });
    let proxy = ContextProxy::new(
        factory,
        ContextInit::new((64, 64), "test-client"),
        ProxyConfig::default(),
    )
    .expect("proxy creation");
    (proxy, log)
}

pub fn remote_proxy(max_pending_bytes: usize) -> (ContextProxy, CommandLog) {
    remote_proxy_with(HostScript::default(), max_pending_bytes)
}

pub fn remote_proxy_with(script: HostScript, max_pending_bytes: usize) -> (ContextProxy, CommandLog) {
    let log: CommandLog = Arc::new(Mutex::new(Vec::new()));
    let factory_log = log.clone();
    let factory = remote_factory(
        move || {
            Box::new(RecordingHost::new(factory_log.clone(), script.clone()))
                as Box<dyn ExecutionHost>
        },
        max_pending_bytes,
    );
    let proxy = ContextProxy::new(
        factory,
        ContextInit::new((64, 64), "test-client"),
        ProxyConfig::default(),
    )
    .expect("proxy creation");
    (proxy, log)
}

/// Opcodes of everything the host has executed so far.
pub fn logged_opcodes(log: &CommandLog) -> Vec<u32> {
    log.lock().iter().map(|c| c.opcode()).collect()
}

pub fn count_opcode(log: &CommandLog, opcode: u32) -> usize {
    log.lock().iter().filter(|c| c.opcode() == opcode).count()
}

/// Index of the first logged command with `opcode`, if any.
pub fn position_of(log: &CommandLog, opcode: u32) -> Option<usize> {
    log.lock().iter().position(|c| c.opcode() == opcode)
}
