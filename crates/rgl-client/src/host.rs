//! The execution-host boundary: the component that actually performs GPU
//! work. The proxy only ever talks to it through this interface, either by
//! direct call (in-process) or through the endpoint thread (remote).

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use rgl_protocol::commands::{GlCommand, GlReply};
use rgl_protocol::error::ProtocolError;
use rgl_protocol::types::{PixelFormat, PixelType};

pub trait ExecutionHost: Send {
    /// Execute a fire-and-forget command.
    fn execute(&mut self, cmd: &GlCommand);

    /// Execute a round-trip command. Only safe to call once everything
    /// encoded before it has been delivered.
    fn execute_sync(&mut self, cmd: &GlCommand) -> Result<GlReply, ProtocolError>;

    /// Create (or recreate) the underlying context.
    fn create_context(&mut self, init: &ContextInit) -> Result<ContextInfo, String>;

    fn drawing_buffer_size(&self) -> (u32, u32);

    fn resize(&mut self, size: (u32, u32));

    fn on_memory_pressure(&mut self) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerPreference {
    #[default]
    Default,
    LowPower,
    HighPerformance,
}

/// Requested context attributes, kept for the lifetime of the proxy so a
/// restore can recreate the backend with the last-known options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextOptions {
    pub alpha: bool,
    pub depth: bool,
    pub stencil: bool,
    pub antialias: bool,
    pub premultiplied_alpha: bool,
    pub preserve_drawing_buffer: bool,
    pub power_preference: PowerPreference,
    pub fail_if_major_performance_caveat: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            alpha: true,
            depth: true,
            stencil: false,
            antialias: true,
            premultiplied_alpha: true,
            preserve_drawing_buffer: false,
            power_preference: PowerPreference::Default,
            fail_if_major_performance_caveat: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextInit {
    pub size: (u32, u32),
    pub options: ContextOptions,
    /// Caller identity for host-side resource accounting.
    pub client_key: String,
}

impl ContextInit {
    pub fn new(size: (u32, u32), client_key: impl Into<String>) -> Self {
        Self {
            size,
            options: ContextOptions::default(),
            client_key: client_key.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContextInfo {
    pub drawing_buffer_size: (u32, u32),
}

/// Shape of a texel upload, independent of where the texels came from.
#[derive(Debug, Clone, Copy)]
pub struct TexelDescriptor {
    pub width: i32,
    pub height: i32,
    pub format: PixelFormat,
    pub ty: PixelType,
}

impl TexelDescriptor {
    pub fn byte_len(&self) -> usize {
        self.width.max(0) as usize
            * self.height.max(0) as usize
            * self.format.channels()
            * self.ty.byte_size()
    }
}

/// Adapter from a platform image type (video frame, canvas, bitmap) to raw
/// texel bytes. The proxy never decodes platform sources itself.
pub trait TexelSource {
    fn descriptor(&self) -> TexelDescriptor;
    fn texels(&self) -> Cow<'_, [u8]>;
}

/// The trivial source: bytes the caller already has.
pub struct RawTexels<'a> {
    pub descriptor: TexelDescriptor,
    pub bytes: &'a [u8],
}

impl TexelSource for RawTexels<'_> {
    fn descriptor(&self) -> TexelDescriptor {
        self.descriptor
    }

    fn texels(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.bytes)
    }
}
