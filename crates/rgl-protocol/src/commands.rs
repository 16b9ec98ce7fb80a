//! The serialized command and reply enums for the RGL protocol.
//!
//! Commands are fire-and-forget unless [`GlCommand::is_sync`] says otherwise;
//! synchronous commands must be preceded by a flush and block for a
//! [`GlReply`].

use serde::{Deserialize, Serialize};

use crate::bulk::BulkBytes;
use crate::handle::ObjectId;
use crate::types::{
    Attachment, BufferParam, BufferTarget, BufferUsage, Capability, DrawMode, FramebufferTarget,
    GlError, IndexType, IndexedBufferTarget, Parameter, PixelFormat, PixelType, QueryTarget,
    RenderbufferFormat, RenderbufferParam, SamplerParam, ShaderKind, SyncWaitStatus, TextureTarget,
};

/// Wire opcodes, grouped by command family. Each record starts with one of
/// these so a decoder can dispatch without deserializing the payload.
pub mod op {
    // ── Resource lifecycle ──────────────────────────────────
    pub const CREATE_BUFFER: u32 = 0x0100;
    pub const CREATE_TEXTURE: u32 = 0x0101;
    pub const CREATE_PROGRAM: u32 = 0x0102;
    pub const CREATE_SHADER: u32 = 0x0103;
    pub const CREATE_FRAMEBUFFER: u32 = 0x0104;
    pub const CREATE_RENDERBUFFER: u32 = 0x0105;
    pub const CREATE_SAMPLER: u32 = 0x0106;
    pub const CREATE_QUERY: u32 = 0x0107;
    pub const CREATE_VERTEX_ARRAY: u32 = 0x0108;
    pub const CREATE_TRANSFORM_FEEDBACK: u32 = 0x0109;
    pub const FENCE_SYNC: u32 = 0x010A;
    pub const DELETE_BUFFER: u32 = 0x0110;
    pub const DELETE_TEXTURE: u32 = 0x0111;
    pub const DELETE_PROGRAM: u32 = 0x0112;
    pub const DELETE_SHADER: u32 = 0x0113;
    pub const DELETE_FRAMEBUFFER: u32 = 0x0114;
    pub const DELETE_RENDERBUFFER: u32 = 0x0115;
    pub const DELETE_SAMPLER: u32 = 0x0116;
    pub const DELETE_QUERY: u32 = 0x0117;
    pub const DELETE_VERTEX_ARRAY: u32 = 0x0118;
    pub const DELETE_TRANSFORM_FEEDBACK: u32 = 0x0119;
    pub const DELETE_SYNC: u32 = 0x011A;

    // ── Binding ─────────────────────────────────────────────
    pub const BIND_BUFFER: u32 = 0x0200;
    pub const BIND_BUFFER_BASE: u32 = 0x0201;
    pub const BIND_TEXTURE: u32 = 0x0202;
    pub const ACTIVE_TEXTURE: u32 = 0x0203;
    pub const BIND_FRAMEBUFFER: u32 = 0x0204;
    pub const BIND_RENDERBUFFER: u32 = 0x0205;
    pub const BIND_SAMPLER: u32 = 0x0206;
    pub const BIND_VERTEX_ARRAY: u32 = 0x0207;
    pub const BIND_TRANSFORM_FEEDBACK: u32 = 0x0208;
    pub const USE_PROGRAM: u32 = 0x0209;
    pub const FRAMEBUFFER_TEXTURE_2D: u32 = 0x020A;
    pub const FRAMEBUFFER_RENDERBUFFER: u32 = 0x020B;

    // ── Scalar state ────────────────────────────────────────
    pub const VIEWPORT: u32 = 0x0300;
    pub const SCISSOR: u32 = 0x0301;
    pub const ENABLE: u32 = 0x0302;
    pub const DISABLE: u32 = 0x0303;
    pub const CLEAR_COLOR: u32 = 0x0304;
    pub const CLEAR_DEPTH: u32 = 0x0305;
    pub const CLEAR_STENCIL: u32 = 0x0306;
    pub const BLEND_COLOR: u32 = 0x0307;
    pub const COLOR_MASK: u32 = 0x0308;
    pub const DEPTH_MASK: u32 = 0x0309;
    pub const VERTEX_ATTRIB_4F: u32 = 0x030A;
    pub const TEX_PARAMETER_I: u32 = 0x030B;
    pub const SAMPLER_PARAMETER_I: u32 = 0x030C;
    pub const SAMPLER_PARAMETER_F: u32 = 0x030D;
    pub const RENDERBUFFER_STORAGE: u32 = 0x030E;

    // ── Data upload ─────────────────────────────────────────
    pub const BUFFER_DATA: u32 = 0x0400;
    pub const BUFFER_SUB_DATA: u32 = 0x0401;
    pub const TEX_IMAGE_2D: u32 = 0x0402;
    pub const TEX_SUB_IMAGE_2D: u32 = 0x0403;

    // ── Drawing ─────────────────────────────────────────────
    pub const CLEAR: u32 = 0x0500;
    pub const DRAW_ARRAYS: u32 = 0x0501;
    pub const DRAW_ELEMENTS: u32 = 0x0502;

    // ── Program pipeline ────────────────────────────────────
    pub const SHADER_SOURCE: u32 = 0x0600;
    pub const COMPILE_SHADER: u32 = 0x0601;
    pub const ATTACH_SHADER: u32 = 0x0602;
    pub const DETACH_SHADER: u32 = 0x0603;
    pub const LINK_PROGRAM: u32 = 0x0604;
    pub const UNIFORM_1I: u32 = 0x0605;
    pub const UNIFORM_1F: u32 = 0x0606;
    pub const UNIFORM_4F: u32 = 0x0607;
    pub const UNIFORM_MATRIX_4FV: u32 = 0x0608;

    // ── Queries ─────────────────────────────────────────────
    pub const BEGIN_QUERY: u32 = 0x0700;
    pub const END_QUERY: u32 = 0x0701;

    // ── Synchronous (round-trip) commands ───────────────────
    pub const GET_PARAMETER: u32 = 0x0800;
    pub const GET_BUFFER_PARAMETER: u32 = 0x0801;
    pub const GET_RENDERBUFFER_PARAMETER: u32 = 0x0802;
    pub const GET_SAMPLER_PARAMETER: u32 = 0x0803;
    pub const GET_SHADER_COMPILE_RESULT: u32 = 0x0804;
    pub const GET_PROGRAM_LINK_RESULT: u32 = 0x0805;
    pub const GET_UNIFORM_LOCATION: u32 = 0x0806;
    pub const READ_PIXELS: u32 = 0x0807;
    pub const GET_BUFFER_SUB_DATA: u32 = 0x0808;
    pub const CHECK_ERROR: u32 = 0x0809;
    pub const GET_SUPPORTED_EXTENSIONS: u32 = 0x080A;
    pub const GET_QUERY_AVAILABLE: u32 = 0x080B;
    pub const GET_QUERY_RESULT: u32 = 0x080C;
    pub const CLIENT_WAIT_SYNC: u32 = 0x080D;
    pub const GET_SYNC_STATUS: u32 = 0x080E;
    pub const FINISH: u32 = 0x080F;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum GlCommand {
    // ── Resource lifecycle ──────────────────────────────────
    CreateBuffer { id: ObjectId },
    CreateTexture { id: ObjectId },
    CreateProgram { id: ObjectId },
    CreateShader { id: ObjectId, kind: ShaderKind },
    CreateFramebuffer { id: ObjectId },
    CreateRenderbuffer { id: ObjectId },
    CreateSampler { id: ObjectId },
    CreateQuery { id: ObjectId },
    CreateVertexArray { id: ObjectId },
    CreateTransformFeedback { id: ObjectId },
    FenceSync { id: ObjectId },
    DeleteBuffer { id: ObjectId },
    DeleteTexture { id: ObjectId },
    DeleteProgram { id: ObjectId },
    DeleteShader { id: ObjectId },
    DeleteFramebuffer { id: ObjectId },
    DeleteRenderbuffer { id: ObjectId },
    DeleteSampler { id: ObjectId },
    DeleteQuery { id: ObjectId },
    DeleteVertexArray { id: ObjectId },
    DeleteTransformFeedback { id: ObjectId },
    DeleteSync { id: ObjectId },

    // ── Binding ─────────────────────────────────────────────
    BindBuffer { target: BufferTarget, buffer: ObjectId },
    BindBufferBase { target: IndexedBufferTarget, index: u32, buffer: ObjectId },
    BindTexture { target: TextureTarget, texture: ObjectId },
    ActiveTexture { unit: u32 },
    BindFramebuffer { target: FramebufferTarget, framebuffer: ObjectId },
    BindRenderbuffer { renderbuffer: ObjectId },
    BindSampler { unit: u32, sampler: ObjectId },
    BindVertexArray { vertex_array: ObjectId },
    BindTransformFeedback { transform_feedback: ObjectId },
    UseProgram { program: ObjectId },
    FramebufferTexture2D {
        target: FramebufferTarget,
        attachment: Attachment,
        texture: ObjectId,
        level: i32,
    },
    FramebufferRenderbuffer {
        target: FramebufferTarget,
        attachment: Attachment,
        renderbuffer: ObjectId,
    },

    // ── Scalar state ────────────────────────────────────────
    Viewport { x: i32, y: i32, width: i32, height: i32 },
    Scissor { x: i32, y: i32, width: i32, height: i32 },
    Enable { cap: Capability },
    Disable { cap: Capability },
    ClearColor { color: [f32; 4] },
    ClearDepth { depth: f32 },
    ClearStencil { stencil: i32 },
    BlendColor { color: [f32; 4] },
    ColorMask { mask: [bool; 4] },
    DepthMask { mask: bool },
    VertexAttrib4F { index: u32, value: [f32; 4] },
    TexParameterI { target: TextureTarget, pname: SamplerParam, value: i32 },
    SamplerParameterI { sampler: ObjectId, pname: SamplerParam, value: i32 },
    SamplerParameterF { sampler: ObjectId, pname: SamplerParam, value: f32 },
    RenderbufferStorage { format: RenderbufferFormat, width: i32, height: i32 },

    // ── Data upload ─────────────────────────────────────────
    BufferData { target: BufferTarget, data: BulkBytes, usage: BufferUsage },
    BufferSubData { target: BufferTarget, offset: u64, data: BulkBytes },
    TexImage2D {
        target: TextureTarget,
        level: i32,
        internal_format: PixelFormat,
        width: i32,
        height: i32,
        format: PixelFormat,
        ty: PixelType,
        pixels: Option<BulkBytes>,
    },
    TexSubImage2D {
        target: TextureTarget,
        level: i32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: PixelFormat,
        ty: PixelType,
        pixels: BulkBytes,
    },

    // ── Drawing ─────────────────────────────────────────────
    Clear { mask: u32 },
    DrawArrays { mode: DrawMode, first: i32, count: i32 },
    DrawElements { mode: DrawMode, count: i32, index_type: IndexType, offset: u64 },

    // ── Program pipeline ────────────────────────────────────
    ShaderSource { shader: ObjectId, source: String },
    CompileShader { shader: ObjectId },
    AttachShader { program: ObjectId, shader: ObjectId },
    DetachShader { program: ObjectId, shader: ObjectId },
    LinkProgram { program: ObjectId },
    Uniform1I { location: i32, v: i32 },
    Uniform1F { location: i32, v: f32 },
    Uniform4F { location: i32, v: [f32; 4] },
    UniformMatrix4Fv { location: i32, transpose: bool, values: Vec<f32> },

    // ── Queries ─────────────────────────────────────────────
    BeginQuery { target: QueryTarget, query: ObjectId },
    EndQuery { target: QueryTarget },

    // ── Synchronous (round-trip) commands ───────────────────
    GetParameter { param: Parameter },
    GetBufferParameter { target: BufferTarget, pname: BufferParam },
    GetRenderbufferParameter { pname: RenderbufferParam },
    GetSamplerParameter { sampler: ObjectId, pname: SamplerParam },
    GetShaderCompileResult { shader: ObjectId },
    GetProgramLinkResult { program: ObjectId },
    GetUniformLocation { program: ObjectId, name: String },
    ReadPixels { x: i32, y: i32, width: i32, height: i32, format: PixelFormat, ty: PixelType },
    GetBufferSubData { target: BufferTarget, offset: u64, length: u64 },
    CheckError,
    GetSupportedExtensions,
    GetQueryAvailable { query: ObjectId },
    GetQueryResult { query: ObjectId },
    ClientWaitSync { sync: ObjectId, timeout_ns: u64 },
    GetSyncStatus { sync: ObjectId },
    Finish,
}

impl GlCommand {
    /// Wire opcode written into the record header for this command.
    pub fn opcode(&self) -> u32 {
        match self {
            GlCommand::CreateBuffer { .. } => op::CREATE_BUFFER,
            GlCommand::CreateTexture { .. } => op::CREATE_TEXTURE,
            GlCommand::CreateProgram { .. } => op::CREATE_PROGRAM,
            GlCommand::CreateShader { .. } => op::CREATE_SHADER,
            GlCommand::CreateFramebuffer { .. } => op::CREATE_FRAMEBUFFER,
            GlCommand::CreateRenderbuffer { .. } => op::CREATE_RENDERBUFFER,
            GlCommand::CreateSampler { .. } => op::CREATE_SAMPLER,
            GlCommand::CreateQuery { .. } => op::CREATE_QUERY,
            GlCommand::CreateVertexArray { .. } => op::CREATE_VERTEX_ARRAY,
            GlCommand::CreateTransformFeedback { .. } => op::CREATE_TRANSFORM_FEEDBACK,
            GlCommand::FenceSync { .. } => op::FENCE_SYNC,
            GlCommand::DeleteBuffer { .. } => op::DELETE_BUFFER,
            GlCommand::DeleteTexture { .. } => op::DELETE_TEXTURE,
            GlCommand::DeleteProgram { .. } => op::DELETE_PROGRAM,
            GlCommand::DeleteShader { .. } => op::DELETE_SHADER,
            GlCommand::DeleteFramebuffer { .. } => op::DELETE_FRAMEBUFFER,
            GlCommand::DeleteRenderbuffer { .. } => op::DELETE_RENDERBUFFER,
            GlCommand::DeleteSampler { .. } => op::DELETE_SAMPLER,
            GlCommand::DeleteQuery { .. } => op::DELETE_QUERY,
            GlCommand::DeleteVertexArray { .. } => op::DELETE_VERTEX_ARRAY,
            GlCommand::DeleteTransformFeedback { .. } => op::DELETE_TRANSFORM_FEEDBACK,
            GlCommand::DeleteSync { .. } => op::DELETE_SYNC,
            GlCommand::BindBuffer { .. } => op::BIND_BUFFER,
            GlCommand::BindBufferBase { .. } => op::BIND_BUFFER_BASE,
            GlCommand::BindTexture { .. } => op::BIND_TEXTURE,
            GlCommand::ActiveTexture { .. } => op::ACTIVE_TEXTURE,
            GlCommand::BindFramebuffer { .. } => op::BIND_FRAMEBUFFER,
            GlCommand::BindRenderbuffer { .. } => op::BIND_RENDERBUFFER,
            GlCommand::BindSampler { .. } => op::BIND_SAMPLER,
            GlCommand::BindVertexArray { .. } => op::BIND_VERTEX_ARRAY,
            GlCommand::BindTransformFeedback { .. } => op::BIND_TRANSFORM_FEEDBACK,
            GlCommand::UseProgram { .. } => op::USE_PROGRAM,
            GlCommand::FramebufferTexture2D { .. } => op::FRAMEBUFFER_TEXTURE_2D,
            GlCommand::FramebufferRenderbuffer { .. } => op::FRAMEBUFFER_RENDERBUFFER,
            GlCommand::Viewport { .. } => op::VIEWPORT,
            GlCommand::Scissor { .. } => op::SCISSOR,
            GlCommand::Enable { .. } => op::ENABLE,
            GlCommand::Disable { .. } => op::DISABLE,
            GlCommand::ClearColor { .. } => op::CLEAR_COLOR,
            GlCommand::ClearDepth { .. } => op::CLEAR_DEPTH,
            GlCommand::ClearStencil { .. } => op::CLEAR_STENCIL,
            GlCommand::BlendColor { .. } => op::BLEND_COLOR,
            GlCommand::ColorMask { .. } => op::COLOR_MASK,
            GlCommand::DepthMask { .. } => op::DEPTH_MASK,
            GlCommand::VertexAttrib4F { .. } => op::VERTEX_ATTRIB_4F,
            GlCommand::TexParameterI { .. } => op::TEX_PARAMETER_I,
            GlCommand::SamplerParameterI { .. } => op::SAMPLER_PARAMETER_I,
            GlCommand::SamplerParameterF { .. } => op::SAMPLER_PARAMETER_F,
            GlCommand::RenderbufferStorage { .. } => op::RENDERBUFFER_STORAGE,
            GlCommand::BufferData { .. } => op::BUFFER_DATA,
            GlCommand::BufferSubData { .. } => op::BUFFER_SUB_DATA,
            GlCommand::TexImage2D { .. } => op::TEX_IMAGE_2D,
            GlCommand::TexSubImage2D { .. } => op::TEX_SUB_IMAGE_2D,
            GlCommand::Clear { .. } => op::CLEAR,
            GlCommand::DrawArrays { .. } => op::DRAW_ARRAYS,
            GlCommand::DrawElements { .. } => op::DRAW_ELEMENTS,
            GlCommand::ShaderSource { .. } => op::SHADER_SOURCE,
            GlCommand::CompileShader { .. } => op::COMPILE_SHADER,
            GlCommand::AttachShader { .. } => op::ATTACH_SHADER,
            GlCommand::DetachShader { .. } => op::DETACH_SHADER,
            GlCommand::LinkProgram { .. } => op::LINK_PROGRAM,
            GlCommand::Uniform1I { .. } => op::UNIFORM_1I,
            GlCommand::Uniform1F { .. } => op::UNIFORM_1F,
            GlCommand::Uniform4F { .. } => op::UNIFORM_4F,
            GlCommand::UniformMatrix4Fv { .. } => op::UNIFORM_MATRIX_4FV,
            GlCommand::BeginQuery { .. } => op::BEGIN_QUERY,
            GlCommand::EndQuery { .. } => op::END_QUERY,
            GlCommand::GetParameter { .. } => op::GET_PARAMETER,
            GlCommand::GetBufferParameter { .. } => op::GET_BUFFER_PARAMETER,
            GlCommand::GetRenderbufferParameter { .. } => op::GET_RENDERBUFFER_PARAMETER,
            GlCommand::GetSamplerParameter { .. } => op::GET_SAMPLER_PARAMETER,
            GlCommand::GetShaderCompileResult { .. } => op::GET_SHADER_COMPILE_RESULT,
            GlCommand::GetProgramLinkResult { .. } => op::GET_PROGRAM_LINK_RESULT,
            GlCommand::GetUniformLocation { .. } => op::GET_UNIFORM_LOCATION,
            GlCommand::ReadPixels { .. } => op::READ_PIXELS,
            GlCommand::GetBufferSubData { .. } => op::GET_BUFFER_SUB_DATA,
            GlCommand::CheckError => op::CHECK_ERROR,
            GlCommand::GetSupportedExtensions => op::GET_SUPPORTED_EXTENSIONS,
            GlCommand::GetQueryAvailable { .. } => op::GET_QUERY_AVAILABLE,
            GlCommand::GetQueryResult { .. } => op::GET_QUERY_RESULT,
            GlCommand::ClientWaitSync { .. } => op::CLIENT_WAIT_SYNC,
            GlCommand::GetSyncStatus { .. } => op::GET_SYNC_STATUS,
            GlCommand::Finish => op::FINISH,
        }
    }

    /// Whether this command blocks for a [`GlReply`].
    pub fn is_sync(&self) -> bool {
        self.opcode() >= op::GET_PARAMETER
    }
}

/// A host-computed value for a parameter query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    Float4([f32; 4]),
    Int4([i32; 4]),
    Bool4([bool; 4]),
    Str(String),
    /// A bound object reported by client-side mirror queries. The host never
    /// produces this variant.
    Object(ObjectId),
}

/// Outcome of a shader compile, fetched once per compile invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub struct CompileOutcome {
    pub success: bool,
    pub info_log: String,
}

/// Outcome of a program link, fetched once per link invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub struct LinkOutcome {
    pub success: bool,
    pub info_log: String,
}

/// Reply to a synchronous command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum GlReply {
    Unit,
    Param(ParamValue),
    Compile(CompileOutcome),
    Link(LinkOutcome),
    UniformLocation(Option<i32>),
    Pixels(BulkBytes),
    Bytes(BulkBytes),
    Error(GlError),
    Extensions(Vec<String>),
    Available(bool),
    QueryResult(u64),
    SyncWait(SyncWaitStatus),
    SyncStatus(bool),
}
