//! RGL client: a command-proxy engine for a WebGL-style graphics API.
//!
//! Calls are validated against a client-side state mirror, encoded into a
//! compact record stream, and forwarded to an execution backend that runs
//! either in-process or behind a crash-isolated endpoint. See the crate's
//! `ContextProxy` for the public surface.

pub mod backend;
pub mod cache;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod handle;
pub mod host;
pub mod state;

mod buffers;
mod drawing;
mod framebuffers;
mod programs;
mod queries;
mod textures;
mod vertex;

pub use backend::{in_process_factory, remote_factory, Backend, InProcessBackend, RemoteBackend};
pub use config::ProxyConfig;
pub use context::{
    BackendFactory, ContextObserver, ContextProxy, LossReason, LossResponse, LossState,
};
pub use error::{BackendError, ValidationError};
pub use handle::ObjectHandle;
pub use host::{
    ContextInfo, ContextInit, ContextOptions, ExecutionHost, PowerPreference, RawTexels,
    TexelDescriptor, TexelSource,
};
pub use programs::{ProgramParam, ShaderParam, UniformLocation};
pub use queries::QueryParam;
