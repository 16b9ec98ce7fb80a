//! Memoization for host-computed results and the availability scheduler.
//!
//! Compile/link outcomes, uniform locations, and parameter queries cost a
//! round trip; each is fetched at most once per version. A new compile or
//! link bumps the object's version, so stale results are never returned.

use std::collections::HashMap;

use rgl_protocol::commands::{CompileOutcome, LinkOutcome, ParamValue};
use rgl_protocol::types::{BufferParam, Parameter, RenderbufferParam, SamplerParam};
use rgl_protocol::ObjectId;

use crate::handle::{downgrade, upgrade, ObjectHandle, WeakRecord};

/// A lazily fetched host value. Resolved values are immutable for their
/// version.
#[derive(Debug, Clone)]
pub enum AsyncResult<T> {
    Pending,
    Resolved(T),
}

#[derive(Debug, Clone)]
struct Versioned<T> {
    version: u64,
    state: AsyncResult<T>,
}

/// Cache key for object-scoped parameter queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectParamKey {
    Buffer(BufferParam),
    Renderbuffer(RenderbufferParam),
    Sampler(SamplerParam),
}

#[derive(Default)]
pub struct AsyncResultCache {
    compile: HashMap<ObjectId, Versioned<CompileOutcome>>,
    link: HashMap<ObjectId, Versioned<LinkOutcome>>,
    /// Uniform locations keyed per program, valid for one link version.
    uniform_locations: HashMap<ObjectId, HashMap<String, Option<i32>>>,
    /// Context-wide limits and identity strings; immutable per generation.
    params: HashMap<Parameter, ParamValue>,
    /// Object parameter queries, invalidated by data-changing commands.
    object_params: HashMap<(ObjectId, ObjectParamKey), (u64, ParamValue)>,
    object_versions: HashMap<ObjectId, u64>,
    extensions: Option<Vec<String>>,
}

impl AsyncResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Compile results ─────────────────────────────────────

    /// A new compile invocation: invalidates any cached outcome.
    pub fn begin_compile(&mut self, shader: ObjectId) {
        let entry = self.compile.entry(shader).or_insert(Versioned {
            version: 0,
            state: AsyncResult::Pending,
        });
        entry.version += 1;
        entry.state = AsyncResult::Pending;
    }

    pub fn compile_result(&self, shader: ObjectId) -> Option<&CompileOutcome> {
        match self.compile.get(&shader) {
            Some(Versioned {
                state: AsyncResult::Resolved(outcome),
                ..
            }) => Some(outcome),
            _ => None,
        }
    }

    pub fn resolve_compile(&mut self, shader: ObjectId, outcome: CompileOutcome) {
        if let Some(entry) = self.compile.get_mut(&shader) {
            entry.state = AsyncResult::Resolved(outcome);
        }
    }

    /// Whether a compile was ever requested for this shader.
    pub fn compile_requested(&self, shader: ObjectId) -> bool {
        self.compile.contains_key(&shader)
    }

    // ── Link results ────────────────────────────────────────

    /// A new link invocation: invalidates the outcome and every cached
    /// uniform location for the program.
    pub fn begin_link(&mut self, program: ObjectId) {
        let entry = self.link.entry(program).or_insert(Versioned {
            version: 0,
            state: AsyncResult::Pending,
        });
        entry.version += 1;
        entry.state = AsyncResult::Pending;
        self.uniform_locations.remove(&program);
    }

    pub fn link_result(&self, program: ObjectId) -> Option<&LinkOutcome> {
        match self.link.get(&program) {
            Some(Versioned {
                state: AsyncResult::Resolved(outcome),
                ..
            }) => Some(outcome),
            _ => None,
        }
    }

    pub fn resolve_link(&mut self, program: ObjectId, outcome: LinkOutcome) {
        if let Some(entry) = self.link.get_mut(&program) {
            entry.state = AsyncResult::Resolved(outcome);
        }
    }

    // ── Uniform locations ───────────────────────────────────

    pub fn uniform_location(&self, program: ObjectId, name: &str) -> Option<Option<i32>> {
        self.uniform_locations
            .get(&program)
            .and_then(|m| m.get(name))
            .copied()
    }

    pub fn store_uniform_location(
        &mut self,
        program: ObjectId,
        name: String,
        location: Option<i32>,
    ) {
        self.uniform_locations
            .entry(program)
            .or_default()
            .insert(name, location);
    }

    // ── Context parameters and extensions ───────────────────

    pub fn param(&self, param: Parameter) -> Option<&ParamValue> {
        self.params.get(&param)
    }

    pub fn store_param(&mut self, param: Parameter, value: ParamValue) {
        self.params.insert(param, value);
    }

    pub fn extensions(&self) -> Option<&Vec<String>> {
        self.extensions.as_ref()
    }

    pub fn store_extensions(&mut self, extensions: Vec<String>) {
        self.extensions = Some(extensions);
    }

    // ── Object parameters ───────────────────────────────────

    fn object_version(&self, id: ObjectId) -> u64 {
        self.object_versions.get(&id).copied().unwrap_or(0)
    }

    /// Data-changing commands (buffer_data, renderbuffer_storage,
    /// sampler_parameter) bump the version, invalidating cached queries.
    pub fn bump_object_version(&mut self, id: ObjectId) {
        *self.object_versions.entry(id).or_insert(0) += 1;
    }

    pub fn object_param(&self, id: ObjectId, key: ObjectParamKey) -> Option<&ParamValue> {
        let (version, value) = self.object_params.get(&(id, key))?;
        (*version == self.object_version(id)).then_some(value)
    }

    pub fn store_object_param(&mut self, id: ObjectId, key: ObjectParamKey, value: ParamValue) {
        let version = self.object_version(id);
        self.object_params.insert((id, key), (version, value));
    }
}

/// Defers "became available" transitions for queries and fences to the next
/// task boundary. An in-flight asynchronous result is never observably
/// ready within the call that created it, even if the host already
/// finished.
#[derive(Default)]
pub struct AvailabilityScheduler {
    pending: Vec<WeakRecord>,
}

impl AvailabilityScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `handle` as not-yet-available and put it on the pending list.
    pub fn defer(&mut self, handle: &ObjectHandle) {
        handle.set_cannot_be_available(true);
        self.pending.push(downgrade(handle));
    }

    /// Clear the flag for everything deferred before this boundary.
    pub fn run_task_boundary(&mut self) {
        for weak in self.pending.drain(..) {
            if let Some(handle) = upgrade(&weak) {
                handle.set_cannot_be_available(false);
            }
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
