use serde::{Deserialize, Serialize};

/// Identifier for one GPU resource within a context generation.
/// Assigned monotonically by the client -- the host never allocates these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub struct ObjectId(pub u64);

impl ObjectId {
    /// The reserved null id. Binding it clears a binding point.
    pub const NULL: ObjectId = ObjectId(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum ResourceKind {
    Buffer,
    Texture,
    Program,
    Shader,
    Framebuffer,
    Renderbuffer,
    Sampler,
    Query,
    Sync,
    TransformFeedback,
    VertexArray,
}

impl ResourceKind {
    /// Kinds whose remote delete is deferred until the last keep-alive
    /// reference (attachment, active binding) is released.
    pub fn is_ref_counted(&self) -> bool {
        matches!(self, ResourceKind::Program | ResourceKind::Shader)
    }
}
