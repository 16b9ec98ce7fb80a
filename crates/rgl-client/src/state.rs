//! Client-cached copy of context binding and scalar state.
//!
//! The mirror answers cheap queries without a round trip and is the single
//! source of truth for what the remote side's state will be once the
//! encoded stream is fully executed. It is only mutated after the
//! corresponding command has been accepted for encoding.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rgl_protocol::commands::GlCommand;
use rgl_protocol::types::{
    BufferTarget, Capability, FramebufferTarget, IndexedBufferTarget, QueryTarget, TextureTarget,
};
use rgl_protocol::ObjectId;

use crate::handle::{KeepAlive, ObjectHandle};

/// Implementation minimums the mirror sizes its slot arrays from.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub texture_units: u32,
    pub uniform_buffer_slots: u32,
    pub transform_feedback_slots: u32,
    pub vertex_attribs: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            texture_units: 32,
            uniform_buffer_slots: 24,
            transform_feedback_slots: 4,
            vertex_attribs: 16,
        }
    }
}

/// The current program binding holds the program's keep-alive token so a
/// deleted-while-in-use program outlives its handle until rebound.
pub struct ProgramBinding {
    pub handle: ObjectHandle,
    _keep: Arc<KeepAlive>,
}

#[derive(Default)]
struct TextureUnit {
    bindings: HashMap<TextureTarget, ObjectHandle>,
}

pub struct StateMirror {
    limits: Limits,

    buffer_bindings: HashMap<BufferTarget, ObjectHandle>,
    indexed_uniform: Vec<Option<ObjectHandle>>,
    indexed_tf: Vec<Option<ObjectHandle>>,

    texture_units: Vec<TextureUnit>,
    samplers: Vec<Option<ObjectHandle>>,
    active_unit: u32,

    draw_framebuffer: Option<ObjectHandle>,
    read_framebuffer: Option<ObjectHandle>,
    renderbuffer: Option<ObjectHandle>,
    vertex_array: Option<ObjectHandle>,
    transform_feedback: Option<ObjectHandle>,
    program: Option<ProgramBinding>,

    active_queries: HashMap<QueryTarget, ObjectHandle>,

    viewport: [i32; 4],
    scissor: [i32; 4],
    clear_color: [f32; 4],
    clear_depth: f32,
    clear_stencil: i32,
    blend_color: [f32; 4],
    color_mask: [bool; 4],
    depth_mask: bool,
    enabled: HashSet<Capability>,
    vertex_attribs: Vec<[f32; 4]>,

    drawing_buffer_size: (u32, u32),
}

impl StateMirror {
    pub fn new(limits: Limits, drawing_buffer_size: (u32, u32)) -> Self {
        let (w, h) = drawing_buffer_size;
        let mut texture_units = Vec::with_capacity(limits.texture_units as usize);
        texture_units.resize_with(limits.texture_units as usize, TextureUnit::default);
        Self {
            limits,
            buffer_bindings: HashMap::new(),
            indexed_uniform: vec![None; limits.uniform_buffer_slots as usize],
            indexed_tf: vec![None; limits.transform_feedback_slots as usize],
            texture_units,
            samplers: vec![None; limits.texture_units as usize],
            active_unit: 0,
            draw_framebuffer: None,
            read_framebuffer: None,
            renderbuffer: None,
            vertex_array: None,
            transform_feedback: None,
            program: None,
            active_queries: HashMap::new(),
            // Initial viewport and scissor cover the drawing buffer.
            viewport: [0, 0, w as i32, h as i32],
            scissor: [0, 0, w as i32, h as i32],
            clear_color: [0.0; 4],
            clear_depth: 1.0,
            clear_stencil: 0,
            blend_color: [0.0; 4],
            color_mask: [true; 4],
            depth_mask: true,
            enabled: [Capability::Dither].into_iter().collect(),
            vertex_attribs: vec![[0.0, 0.0, 0.0, 1.0]; limits.vertex_attribs as usize],
            drawing_buffer_size,
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    // ── Buffer bindings ─────────────────────────────────────

    pub fn buffer_binding(&self, target: BufferTarget) -> Option<&ObjectHandle> {
        self.buffer_bindings.get(&target)
    }

    pub fn set_buffer_binding(&mut self, target: BufferTarget, handle: Option<ObjectHandle>) {
        match handle {
            Some(h) => {
                self.buffer_bindings.insert(target, h);
            }
            None => {
                self.buffer_bindings.remove(&target);
            }
        }
    }

    fn indexed_slots(&self, target: IndexedBufferTarget) -> &Vec<Option<ObjectHandle>> {
        match target {
            IndexedBufferTarget::Uniform => &self.indexed_uniform,
            IndexedBufferTarget::TransformFeedback => &self.indexed_tf,
        }
    }

    fn indexed_slots_mut(&mut self, target: IndexedBufferTarget) -> &mut Vec<Option<ObjectHandle>> {
        match target {
            IndexedBufferTarget::Uniform => &mut self.indexed_uniform,
            IndexedBufferTarget::TransformFeedback => &mut self.indexed_tf,
        }
    }

    pub fn indexed_slot_limit(&self, target: IndexedBufferTarget) -> u32 {
        self.indexed_slots(target).len() as u32
    }

    pub fn indexed_buffer_binding(
        &self,
        target: IndexedBufferTarget,
        index: u32,
    ) -> Option<&ObjectHandle> {
        self.indexed_slots(target)
            .get(index as usize)
            .and_then(|s| s.as_ref())
    }

    pub fn set_indexed_buffer_binding(
        &mut self,
        target: IndexedBufferTarget,
        index: u32,
        handle: Option<ObjectHandle>,
    ) {
        if let Some(slot) = self.indexed_slots_mut(target).get_mut(index as usize) {
            *slot = handle;
        }
    }

    // ── Texture units and samplers ──────────────────────────

    pub fn active_unit(&self) -> u32 {
        self.active_unit
    }

    pub fn set_active_unit(&mut self, unit: u32) {
        self.active_unit = unit;
    }

    pub fn texture_binding(&self, unit: u32, target: TextureTarget) -> Option<&ObjectHandle> {
        self.texture_units
            .get(unit as usize)
            .and_then(|u| u.bindings.get(&target))
    }

    pub fn set_texture_binding(
        &mut self,
        unit: u32,
        target: TextureTarget,
        handle: Option<ObjectHandle>,
    ) {
        if let Some(u) = self.texture_units.get_mut(unit as usize) {
            match handle {
                Some(h) => {
                    u.bindings.insert(target, h);
                }
                None => {
                    u.bindings.remove(&target);
                }
            }
        }
    }

    pub fn sampler_binding(&self, unit: u32) -> Option<&ObjectHandle> {
        self.samplers.get(unit as usize).and_then(|s| s.as_ref())
    }

    pub fn set_sampler_binding(&mut self, unit: u32, handle: Option<ObjectHandle>) {
        if let Some(slot) = self.samplers.get_mut(unit as usize) {
            *slot = handle;
        }
    }

    // ── Framebuffers and other container bindings ───────────

    pub fn framebuffer_binding(&self, target: FramebufferTarget) -> Option<&ObjectHandle> {
        match target {
            FramebufferTarget::Draw | FramebufferTarget::Framebuffer => {
                self.draw_framebuffer.as_ref()
            }
            FramebufferTarget::Read => self.read_framebuffer.as_ref(),
        }
    }

    pub fn set_framebuffer_binding(
        &mut self,
        target: FramebufferTarget,
        handle: Option<ObjectHandle>,
    ) {
        match target {
            FramebufferTarget::Framebuffer => {
                self.draw_framebuffer = handle.clone();
                self.read_framebuffer = handle;
            }
            FramebufferTarget::Draw => self.draw_framebuffer = handle,
            FramebufferTarget::Read => self.read_framebuffer = handle,
        }
    }

    /// The framebuffers a texture/renderbuffer delete must detach from:
    /// only currently bound ones, draw first.
    pub fn bound_framebuffers(&self) -> Vec<(FramebufferTarget, ObjectHandle)> {
        let mut out = Vec::new();
        if let Some(fb) = &self.draw_framebuffer {
            out.push((FramebufferTarget::Draw, fb.clone()));
        }
        if let Some(fb) = &self.read_framebuffer {
            if Some(fb) != self.draw_framebuffer.as_ref() {
                out.push((FramebufferTarget::Read, fb.clone()));
            }
        }
        out
    }

    pub fn renderbuffer_binding(&self) -> Option<&ObjectHandle> {
        self.renderbuffer.as_ref()
    }

    pub fn set_renderbuffer_binding(&mut self, handle: Option<ObjectHandle>) {
        self.renderbuffer = handle;
    }

    pub fn vertex_array_binding(&self) -> Option<&ObjectHandle> {
        self.vertex_array.as_ref()
    }

    pub fn set_vertex_array_binding(&mut self, handle: Option<ObjectHandle>) {
        self.vertex_array = handle;
    }

    pub fn transform_feedback_binding(&self) -> Option<&ObjectHandle> {
        self.transform_feedback.as_ref()
    }

    pub fn set_transform_feedback_binding(&mut self, handle: Option<ObjectHandle>) {
        self.transform_feedback = handle;
    }

    pub fn program_binding(&self) -> Option<&ObjectHandle> {
        self.program.as_ref().map(|p| &p.handle)
    }

    pub fn set_program_binding(&mut self, handle: Option<ObjectHandle>) {
        self.program = handle.and_then(|h| {
            let keep = h.keep_alive()?;
            Some(ProgramBinding {
                handle: h,
                _keep: keep,
            })
        });
    }

    // ── Queries ─────────────────────────────────────────────

    pub fn active_query(&self, target: QueryTarget) -> Option<&ObjectHandle> {
        self.active_queries.get(&target)
    }

    pub fn set_active_query(&mut self, target: QueryTarget, handle: Option<ObjectHandle>) {
        match handle {
            Some(h) => {
                self.active_queries.insert(target, h);
            }
            None => {
                self.active_queries.remove(&target);
            }
        }
    }

    // ── Scalar state ────────────────────────────────────────

    pub fn viewport(&self) -> [i32; 4] {
        self.viewport
    }

    pub fn set_viewport(&mut self, rect: [i32; 4]) {
        self.viewport = rect;
    }

    pub fn scissor(&self) -> [i32; 4] {
        self.scissor
    }

    pub fn set_scissor(&mut self, rect: [i32; 4]) {
        self.scissor = rect;
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    pub fn clear_depth(&self) -> f32 {
        self.clear_depth
    }

    pub fn set_clear_depth(&mut self, depth: f32) {
        self.clear_depth = depth;
    }

    pub fn clear_stencil(&self) -> i32 {
        self.clear_stencil
    }

    pub fn set_clear_stencil(&mut self, stencil: i32) {
        self.clear_stencil = stencil;
    }

    pub fn blend_color(&self) -> [f32; 4] {
        self.blend_color
    }

    pub fn set_blend_color(&mut self, color: [f32; 4]) {
        self.blend_color = color;
    }

    pub fn color_mask(&self) -> [bool; 4] {
        self.color_mask
    }

    pub fn set_color_mask(&mut self, mask: [bool; 4]) {
        self.color_mask = mask;
    }

    pub fn depth_mask(&self) -> bool {
        self.depth_mask
    }

    pub fn set_depth_mask(&mut self, mask: bool) {
        self.depth_mask = mask;
    }

    pub fn is_enabled(&self, cap: Capability) -> bool {
        self.enabled.contains(&cap)
    }

    pub fn set_enabled(&mut self, cap: Capability, on: bool) {
        if on {
            self.enabled.insert(cap);
        } else {
            self.enabled.remove(&cap);
        }
    }

    pub fn vertex_attrib(&self, index: u32) -> Option<[f32; 4]> {
        self.vertex_attribs.get(index as usize).copied()
    }

    pub fn set_vertex_attrib(&mut self, index: u32, value: [f32; 4]) {
        if let Some(slot) = self.vertex_attribs.get_mut(index as usize) {
            *slot = value;
        }
    }

    pub fn active_texture_unit_param(&self) -> u32 {
        self.active_unit
    }

    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        self.drawing_buffer_size
    }

    pub fn set_drawing_buffer_size(&mut self, size: (u32, u32)) {
        self.drawing_buffer_size = size;
    }

    // ── Unbind-before-delete support ────────────────────────

    /// The implicit unbind commands a delete of `handle` must issue, in the
    /// order they must be encoded. Compound side effects (switching the
    /// active texture unit to reach a non-active binding) restore the prior
    /// state afterwards.
    pub fn unbind_commands(&self, handle: &ObjectHandle) -> Vec<GlCommand> {
        let mut cmds = Vec::new();
        match handle.kind() {
            rgl_protocol::ResourceKind::Buffer => {
                for (target, bound) in &self.buffer_bindings {
                    if bound == handle {
                        cmds.push(GlCommand::BindBuffer {
                            target: *target,
                            buffer: ObjectId::NULL,
                        });
                    }
                }
                for target in [
                    IndexedBufferTarget::Uniform,
                    IndexedBufferTarget::TransformFeedback,
                ] {
                    for (i, slot) in self.indexed_slots(target).iter().enumerate() {
                        if slot.as_ref() == Some(handle) {
                            cmds.push(GlCommand::BindBufferBase {
                                target,
                                index: i as u32,
                                buffer: ObjectId::NULL,
                            });
                        }
                    }
                }
            }
            rgl_protocol::ResourceKind::Texture => {
                for (unit, state) in self.texture_units.iter().enumerate() {
                    for (target, bound) in &state.bindings {
                        if bound == handle {
                            if unit as u32 != self.active_unit {
                                cmds.push(GlCommand::ActiveTexture { unit: unit as u32 });
                            }
                            cmds.push(GlCommand::BindTexture {
                                target: *target,
                                texture: ObjectId::NULL,
                            });
                            if unit as u32 != self.active_unit {
                                cmds.push(GlCommand::ActiveTexture {
                                    unit: self.active_unit,
                                });
                            }
                        }
                    }
                }
            }
            rgl_protocol::ResourceKind::Sampler => {
                for (unit, slot) in self.samplers.iter().enumerate() {
                    if slot.as_ref() == Some(handle) {
                        cmds.push(GlCommand::BindSampler {
                            unit: unit as u32,
                            sampler: ObjectId::NULL,
                        });
                    }
                }
            }
            rgl_protocol::ResourceKind::Framebuffer => {
                if self.draw_framebuffer.as_ref() == Some(handle)
                    && self.read_framebuffer.as_ref() == Some(handle)
                {
                    cmds.push(GlCommand::BindFramebuffer {
                        target: FramebufferTarget::Framebuffer,
                        framebuffer: ObjectId::NULL,
                    });
                } else {
                    if self.draw_framebuffer.as_ref() == Some(handle) {
                        cmds.push(GlCommand::BindFramebuffer {
                            target: FramebufferTarget::Draw,
                            framebuffer: ObjectId::NULL,
                        });
                    }
                    if self.read_framebuffer.as_ref() == Some(handle) {
                        cmds.push(GlCommand::BindFramebuffer {
                            target: FramebufferTarget::Read,
                            framebuffer: ObjectId::NULL,
                        });
                    }
                }
            }
            rgl_protocol::ResourceKind::Renderbuffer => {
                if self.renderbuffer.as_ref() == Some(handle) {
                    cmds.push(GlCommand::BindRenderbuffer {
                        renderbuffer: ObjectId::NULL,
                    });
                }
            }
            rgl_protocol::ResourceKind::VertexArray => {
                if self.vertex_array.as_ref() == Some(handle) {
                    cmds.push(GlCommand::BindVertexArray {
                        vertex_array: ObjectId::NULL,
                    });
                }
            }
            rgl_protocol::ResourceKind::TransformFeedback => {
                if self.transform_feedback.as_ref() == Some(handle) {
                    cmds.push(GlCommand::BindTransformFeedback {
                        transform_feedback: ObjectId::NULL,
                    });
                }
            }
            // Program bindings survive deletion; queries and syncs are not
            // binding points.
            _ => {}
        }
        cmds
    }

    /// Clear every slot referencing `handle`. Called once the unbind
    /// commands have been accepted for encoding.
    pub fn remove_references(&mut self, handle: &ObjectHandle) {
        self.buffer_bindings.retain(|_, bound| bound != handle);
        for slot in self
            .indexed_uniform
            .iter_mut()
            .chain(self.indexed_tf.iter_mut())
        {
            if slot.as_ref() == Some(handle) {
                *slot = None;
            }
        }
        for unit in &mut self.texture_units {
            unit.bindings.retain(|_, bound| bound != handle);
        }
        for slot in &mut self.samplers {
            if slot.as_ref() == Some(handle) {
                *slot = None;
            }
        }
        if self.draw_framebuffer.as_ref() == Some(handle) {
            self.draw_framebuffer = None;
        }
        if self.read_framebuffer.as_ref() == Some(handle) {
            self.read_framebuffer = None;
        }
        if self.renderbuffer.as_ref() == Some(handle) {
            self.renderbuffer = None;
        }
        if self.vertex_array.as_ref() == Some(handle) {
            self.vertex_array = None;
        }
        if self.transform_feedback.as_ref() == Some(handle) {
            self.transform_feedback = None;
        }
        self.active_queries.retain(|_, bound| bound != handle);
    }
}
