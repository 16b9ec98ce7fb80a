//! Serialized GL-level enums shared by client and host.
//! Only the values the proxy actually validates and forwards; the host is
//! free to support more via raw parameter queries.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum BufferTarget {
    Array,
    ElementArray,
    CopyRead,
    CopyWrite,
    PixelPack,
    PixelUnpack,
    Uniform,
    TransformFeedback,
}

impl BufferTarget {
    /// The element-array target fixes a buffer's kind to Index on first bind.
    pub fn is_index(&self) -> bool {
        matches!(self, BufferTarget::ElementArray)
    }
}

/// Binding targets that address a numbered slot in addition to the general
/// binding point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum IndexedBufferTarget {
    Uniform,
    TransformFeedback,
}

impl IndexedBufferTarget {
    pub fn general(&self) -> BufferTarget {
        match self {
            IndexedBufferTarget::Uniform => BufferTarget::Uniform,
            IndexedBufferTarget::TransformFeedback => BufferTarget::TransformFeedback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum TextureTarget {
    Texture2D,
    CubeMap,
    Texture3D,
    Texture2DArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum FramebufferTarget {
    /// Binds both draw and read.
    Framebuffer,
    Draw,
    Read,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum Attachment {
    Color(u32),
    Depth,
    Stencil,
    DepthStencil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum Capability {
    Blend,
    CullFace,
    DepthTest,
    Dither,
    PolygonOffsetFill,
    SampleAlphaToCoverage,
    SampleCoverage,
    ScissorTest,
    StencilTest,
    RasterizerDiscard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum DrawMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum IndexType {
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum BufferUsage {
    StaticDraw,
    DynamicDraw,
    StreamDraw,
    StaticRead,
    DynamicRead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum PixelFormat {
    Alpha,
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Alpha => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum PixelType {
    UnsignedByte,
    Float,
}

impl PixelType {
    pub fn byte_size(&self) -> usize {
        match self {
            PixelType::UnsignedByte => 1,
            PixelType::Float => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum RenderbufferFormat {
    Rgba8,
    DepthComponent16,
    Depth24Stencil8,
    StencilIndex8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum QueryTarget {
    AnySamplesPassed,
    AnySamplesPassedConservative,
    TransformFeedbackPrimitivesWritten,
}

/// Texture and sampler parameter names that travel as `pname, value` pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum SamplerParam {
    MinFilter,
    MagFilter,
    WrapS,
    WrapT,
    WrapR,
    CompareMode,
    CompareFunc,
    MinLod,
    MaxLod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum BufferParam {
    Size,
    Usage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum RenderbufferParam {
    Width,
    Height,
    InternalFormat,
    Samples,
}

/// Queryable context state. `Mirrored*` names are answered client-side from
/// the state mirror; the rest require one round trip per generation (cached).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum Parameter {
    // Mirrored scalar state
    Viewport,
    ScissorBox,
    ClearColor,
    BlendColor,
    ColorWritemask,
    DepthWritemask,
    ActiveTexture,
    // Implementation limits and identity strings (round trip, cached)
    MaxTextureSize,
    MaxVertexAttribs,
    MaxCombinedTextureImageUnits,
    MaxUniformBufferBindings,
    MaxTransformFeedbackSeparateAttribs,
    Vendor,
    Renderer,
    Version,
    ShadingLanguageVersion,
}

impl Parameter {
    pub fn is_mirrored(&self) -> bool {
        matches!(
            self,
            Parameter::Viewport
                | Parameter::ScissorBox
                | Parameter::ClearColor
                | Parameter::BlendColor
                | Parameter::ColorWritemask
                | Parameter::DepthWritemask
                | Parameter::ActiveTexture
        )
    }
}

/// Error codes surfaced through the `get_error` queue, one per drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum GlError {
    NoError,
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
    InvalidFramebufferOperation,
    OutOfMemory,
    ContextLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum SyncWaitStatus {
    AlreadySignaled,
    TimeoutExpired,
    ConditionSatisfied,
    WaitFailed,
}

bitflags::bitflags! {
    /// Buffer selection bits for `clear`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearMask: u32 {
        const COLOR   = 0b0000_0001;
        const DEPTH   = 0b0000_0010;
        const STENCIL = 0b0000_0100;
    }
}
