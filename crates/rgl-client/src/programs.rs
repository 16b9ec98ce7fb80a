//! Shaders, programs, and uniforms.
//!
//! Compile and link results live in the async result cache: one round trip
//! per invocation, invalidated by the next compile/link. Programs and
//! shaders are ref-counted; their remote delete is deferred until the last
//! attachment or binding releases its keep-alive token.

use rgl_protocol::commands::{CompileOutcome, GlCommand, GlReply, LinkOutcome, ParamValue};
use rgl_protocol::types::ShaderKind;
use rgl_protocol::ResourceKind;

use crate::context::ContextProxy;
use crate::error::ValidationError;
use crate::handle::{ObjectClass, ObjectHandle};

/// Client-side shader parameter queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderParam {
    CompileStatus,
    ShaderType,
    DeleteStatus,
}

/// Client-side program parameter queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramParam {
    LinkStatus,
    DeleteStatus,
}

/// An opaque post-link uniform location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLocation(pub(crate) i32);

impl ContextProxy {
    // ── Shaders ─────────────────────────────────────────────

    pub fn create_shader(&mut self, kind: ShaderKind) -> ObjectHandle {
        self.create_object(
            ObjectClass::Shader {
                kind,
                keep_alive: None,
            },
            |id| GlCommand::CreateShader { id, kind },
        )
    }

    pub fn shader_source(&mut self, shader: &ObjectHandle, source: &str) {
        if !self.check_usable(shader, ResourceKind::Shader) {
            return;
        }
        self.submit(GlCommand::ShaderSource {
            shader: shader.id(),
            source: source.to_string(),
        });
    }

    /// Kick off a compile. The outcome is fetched lazily on the first
    /// status/log query, except when a debugger front-end is attached, in
    /// which case it is fetched eagerly so logs are immediately available.
    pub fn compile_shader(&mut self, shader: &ObjectHandle) {
        if !self.check_usable(shader, ResourceKind::Shader) {
            return;
        }
        let id = shader.id();
        if !self.submit(GlCommand::CompileShader { shader: id }) {
            return;
        }
        if let Some(generation) = self.generation.as_mut() {
            generation.cache.begin_compile(id);
        }
        if self.attach_counter().is_active() {
            let _ = self.fetch_compile_outcome(shader);
        }
    }

    pub fn get_shader_parameter(
        &mut self,
        shader: &ObjectHandle,
        pname: ShaderParam,
    ) -> Option<ParamValue> {
        if !self.check_usable_query(shader, ResourceKind::Shader) {
            return None;
        }
        match pname {
            ShaderParam::DeleteStatus => Some(ParamValue::Bool(shader.delete_requested())),
            ShaderParam::ShaderType => shader.with_class(|class| match class {
                ObjectClass::Shader { kind, .. } => Some(ParamValue::Int(match kind {
                    ShaderKind::Vertex => 0,
                    ShaderKind::Fragment => 1,
                })),
                _ => None,
            }),
            ShaderParam::CompileStatus => self
                .fetch_compile_outcome(shader)
                .map(|o| ParamValue::Bool(o.success)),
        }
    }

    pub fn get_shader_info_log(&mut self, shader: &ObjectHandle) -> String {
        if !self.check_usable_query(shader, ResourceKind::Shader) {
            return String::new();
        }
        self.fetch_compile_outcome(shader)
            .map(|o| o.info_log)
            .unwrap_or_default()
    }

    fn fetch_compile_outcome(&mut self, shader: &ObjectHandle) -> Option<CompileOutcome> {
        let id = shader.id();
        {
            let generation = self.generation.as_ref()?;
            if !generation.cache.compile_requested(id) {
                // No compile was ever issued; nothing to fetch.
                return None;
            }
            if let Some(outcome) = generation.cache.compile_result(id) {
                return Some(outcome.clone());
            }
        }
        match self.sync_round_trip(GlCommand::GetShaderCompileResult { shader: id }) {
            Some(GlReply::Compile(outcome)) => {
                if let Some(generation) = self.generation.as_mut() {
                    generation.cache.resolve_compile(id, outcome.clone());
                }
                Some(outcome)
            }
            _ => None,
        }
    }

    pub fn delete_shader(&mut self, shader: &ObjectHandle) {
        self.delete_object(shader, ResourceKind::Shader);
    }

    pub fn is_shader(&self, shader: &ObjectHandle) -> bool {
        shader.kind() == ResourceKind::Shader && self.validate_handle(shader).is_ok()
    }

    // ── Programs ────────────────────────────────────────────

    pub fn create_program(&mut self) -> ObjectHandle {
        self.create_object(
            ObjectClass::Program {
                keep_alive: None,
                attached: Vec::new(),
            },
            |id| GlCommand::CreateProgram { id },
        )
    }

    /// Attach a shader. The program holds the shader's keep-alive token, so
    /// deleting an attached shader defers its remote delete until detach or
    /// program teardown.
    pub fn attach_shader(&mut self, program: &ObjectHandle, shader: &ObjectHandle) {
        if !self.check_usable(program, ResourceKind::Program)
            || !self.check_usable(shader, ResourceKind::Shader)
        {
            return;
        }
        if !program.attach(shader) {
            self.queue_validation_error(ValidationError::AlreadyAttached);
            return;
        }
        self.submit(GlCommand::AttachShader {
            program: program.id(),
            shader: shader.id(),
        });
    }

    pub fn detach_shader(&mut self, program: &ObjectHandle, shader: &ObjectHandle) {
        if !self.check_usable(program, ResourceKind::Program) {
            return;
        }
        if !program.detach(shader) {
            self.queue_validation_error(ValidationError::NotAttached);
            return;
        }
        self.submit(GlCommand::DetachShader {
            program: program.id(),
            shader: shader.id(),
        });
    }

    /// Kick off a link. Invalidates the cached link outcome and every
    /// cached uniform location for this program.
    pub fn link_program(&mut self, program: &ObjectHandle) {
        if !self.check_usable(program, ResourceKind::Program) {
            return;
        }
        let id = program.id();
        if !self.submit(GlCommand::LinkProgram { program: id }) {
            return;
        }
        if let Some(generation) = self.generation.as_mut() {
            generation.cache.begin_link(id);
        }
    }

    /// Install a program (or clear with `None`). Deleting the installed
    /// program later leaves this binding untouched.
    pub fn use_program(&mut self, program: Option<&ObjectHandle>) {
        let Some(id) = self.validate_binding(program, ResourceKind::Program) else {
            return;
        };
        let bound = program.cloned();
        self.submit_then(GlCommand::UseProgram { program: id }, |m| {
            m.set_program_binding(bound)
        });
    }

    pub fn get_program_parameter(
        &mut self,
        program: &ObjectHandle,
        pname: ProgramParam,
    ) -> Option<ParamValue> {
        if !self.check_usable_query(program, ResourceKind::Program) {
            return None;
        }
        match pname {
            ProgramParam::DeleteStatus => Some(ParamValue::Bool(program.delete_requested())),
            ProgramParam::LinkStatus => self
                .fetch_link_outcome(program)
                .map(|o| ParamValue::Bool(o.success)),
        }
    }

    pub fn get_program_info_log(&mut self, program: &ObjectHandle) -> String {
        if !self.check_usable_query(program, ResourceKind::Program) {
            return String::new();
        }
        self.fetch_link_outcome(program)
            .map(|o| o.info_log)
            .unwrap_or_default()
    }

    fn fetch_link_outcome(&mut self, program: &ObjectHandle) -> Option<LinkOutcome> {
        let id = program.id();
        {
            let generation = self.generation.as_ref()?;
            if let Some(outcome) = generation.cache.link_result(id) {
                return Some(outcome.clone());
            }
        }
        match self.sync_round_trip(GlCommand::GetProgramLinkResult { program: id }) {
            Some(GlReply::Link(outcome)) => {
                if let Some(generation) = self.generation.as_mut() {
                    generation.cache.resolve_link(id, outcome.clone());
                }
                Some(outcome)
            }
            _ => None,
        }
    }

    /// One round trip per distinct name per link version.
    pub fn get_uniform_location(
        &mut self,
        program: &ObjectHandle,
        name: &str,
    ) -> Option<UniformLocation> {
        if !self.check_usable_query(program, ResourceKind::Program) {
            return None;
        }
        let id = program.id();
        if let Some(generation) = self.generation.as_ref() {
            if let Some(cached) = generation.cache.uniform_location(id, name) {
                return cached.map(UniformLocation);
            }
        }
        match self.sync_round_trip(GlCommand::GetUniformLocation {
            program: id,
            name: name.to_string(),
        }) {
            Some(GlReply::UniformLocation(location)) => {
                if let Some(generation) = self.generation.as_mut() {
                    generation
                        .cache
                        .store_uniform_location(id, name.to_string(), location);
                }
                location.map(UniformLocation)
            }
            _ => None,
        }
    }

    pub fn delete_program(&mut self, program: &ObjectHandle) {
        self.delete_object(program, ResourceKind::Program);
    }

    pub fn is_program(&self, program: &ObjectHandle) -> bool {
        program.kind() == ResourceKind::Program && self.validate_handle(program).is_ok()
    }

    // ── Uniforms ────────────────────────────────────────────

    pub fn uniform_1i(&mut self, location: UniformLocation, v: i32) {
        if !self.require_program_in_use() {
            return;
        }
        self.submit(GlCommand::Uniform1I {
            location: location.0,
            v,
        });
    }

    pub fn uniform_1f(&mut self, location: UniformLocation, v: f32) {
        if !self.require_program_in_use() {
            return;
        }
        self.submit(GlCommand::Uniform1F {
            location: location.0,
            v,
        });
    }

    pub fn uniform_4f(&mut self, location: UniformLocation, v: [f32; 4]) {
        if !self.require_program_in_use() {
            return;
        }
        self.submit(GlCommand::Uniform4F {
            location: location.0,
            v,
        });
    }

    pub fn uniform_matrix_4fv(
        &mut self,
        location: UniformLocation,
        transpose: bool,
        values: &[f32],
    ) {
        if !self.require_program_in_use() {
            return;
        }
        if values.len() % 16 != 0 {
            self.queue_validation_error(ValidationError::InvalidDimension);
            return;
        }
        self.submit(GlCommand::UniformMatrix4Fv {
            location: location.0,
            transpose,
            values: values.to_vec(),
        });
    }

    fn require_program_in_use(&mut self) -> bool {
        let in_use = {
            let Some(generation) = self.generation.as_ref() else {
                return false;
            };
            generation.mirror.program_binding().is_some()
        };
        if !in_use {
            self.queue_validation_error(ValidationError::NoProgramInUse);
        }
        in_use
    }

    // ── Shared validation helpers ───────────────────────────

    /// Validate for a mutating call: silently false when lost, queues the
    /// error otherwise.
    pub(crate) fn check_usable(&mut self, handle: &ObjectHandle, kind: ResourceKind) -> bool {
        let res = {
            let Some(generation) = self.generation.as_ref() else {
                return false;
            };
            handle.validate_for(&generation.shared, kind)
        };
        match res {
            Ok(()) => true,
            Err(e) => {
                self.queue_validation_error(e);
                false
            }
        }
    }

    /// Validate for a getter: same policy, but the caller returns a default
    /// value rather than nothing happening.
    pub(crate) fn check_usable_query(&mut self, handle: &ObjectHandle, kind: ResourceKind) -> bool {
        self.check_usable(handle, kind)
    }
}
