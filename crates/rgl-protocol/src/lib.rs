pub mod bulk;
pub mod commands;
pub mod error;
pub mod handle;
pub mod types;
pub mod wire;

pub use bulk::BulkBytes;
pub use commands::{GlCommand, GlReply, ParamValue};
pub use error::ProtocolError;
pub use handle::{ObjectId, ResourceKind};
