//! Scalar state, capabilities, clears, draws, readback, and the
//! mirrored/expensive split for `get_parameter`.

use rgl_protocol::commands::{GlCommand, GlReply, ParamValue};
use rgl_protocol::types::{
    Capability, ClearMask, DrawMode, IndexType, Parameter, PixelFormat, PixelType,
};

use crate::context::ContextProxy;
use crate::error::ValidationError;

impl ContextProxy {
    // ── Scalar state ────────────────────────────────────────

    pub fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        if width < 0 || height < 0 {
            if self.generation.is_some() {
                self.queue_validation_error(ValidationError::InvalidDimension);
            }
            return;
        }
        self.submit_then(
            GlCommand::Viewport {
                x,
                y,
                width,
                height,
            },
            |m| m.set_viewport([x, y, width, height]),
        );
    }

    pub fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        if width < 0 || height < 0 {
            if self.generation.is_some() {
                self.queue_validation_error(ValidationError::InvalidDimension);
            }
            return;
        }
        self.submit_then(
            GlCommand::Scissor {
                x,
                y,
                width,
                height,
            },
            |m| m.set_scissor([x, y, width, height]),
        );
    }

    pub fn enable(&mut self, cap: Capability) {
        self.submit_then(GlCommand::Enable { cap }, |m| m.set_enabled(cap, true));
    }

    pub fn disable(&mut self, cap: Capability) {
        self.submit_then(GlCommand::Disable { cap }, |m| m.set_enabled(cap, false));
    }

    /// Answered from the mirror; no round trip.
    pub fn is_enabled(&self, cap: Capability) -> bool {
        self.generation
            .as_ref()
            .map(|g| g.mirror.is_enabled(cap))
            .unwrap_or(false)
    }

    pub fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.submit_then(GlCommand::ClearColor { color: [r, g, b, a] }, |m| {
            m.set_clear_color([r, g, b, a])
        });
    }

    pub fn clear_depth(&mut self, depth: f32) {
        self.submit_then(GlCommand::ClearDepth { depth }, |m| m.set_clear_depth(depth));
    }

    pub fn clear_stencil(&mut self, stencil: i32) {
        self.submit_then(GlCommand::ClearStencil { stencil }, |m| {
            m.set_clear_stencil(stencil)
        });
    }

    pub fn blend_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.submit_then(GlCommand::BlendColor { color: [r, g, b, a] }, |m| {
            m.set_blend_color([r, g, b, a])
        });
    }

    pub fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        self.submit_then(GlCommand::ColorMask { mask: [r, g, b, a] }, |m| {
            m.set_color_mask([r, g, b, a])
        });
    }

    pub fn depth_mask(&mut self, mask: bool) {
        self.submit_then(GlCommand::DepthMask { mask }, |m| m.set_depth_mask(mask));
    }

    pub fn vertex_attrib_4f(&mut self, index: u32, x: f32, y: f32, z: f32, w: f32) {
        let limit = match self.generation.as_ref() {
            Some(g) => g.mirror.limits().vertex_attribs,
            None => return,
        };
        if index >= limit {
            self.queue_validation_error(ValidationError::SlotOutOfRange { index, limit });
            return;
        }
        self.submit_then(
            GlCommand::VertexAttrib4F {
                index,
                value: [x, y, z, w],
            },
            |m| m.set_vertex_attrib(index, [x, y, z, w]),
        );
    }

    // ── Drawing and readback ────────────────────────────────

    pub fn clear(&mut self, mask: ClearMask) {
        self.submit(GlCommand::Clear { mask: mask.bits() });
    }

    pub fn draw_arrays(&mut self, mode: DrawMode, first: i32, count: i32) {
        if first < 0 || count < 0 {
            if self.generation.is_some() {
                self.queue_validation_error(ValidationError::InvalidDimension);
            }
            return;
        }
        self.submit(GlCommand::DrawArrays { mode, first, count });
    }

    pub fn draw_elements(&mut self, mode: DrawMode, count: i32, index_type: IndexType, offset: u64) {
        if count < 0 {
            if self.generation.is_some() {
                self.queue_validation_error(ValidationError::InvalidDimension);
            }
            return;
        }
        self.submit(GlCommand::DrawElements {
            mode,
            count,
            index_type,
            offset,
        });
    }

    /// Synchronous readback from the read framebuffer. Empty on error or
    /// when the context is lost.
    pub fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: PixelFormat,
        ty: PixelType,
    ) -> Vec<u8> {
        if width < 0 || height < 0 {
            if self.generation.is_some() {
                self.queue_validation_error(ValidationError::InvalidDimension);
            }
            return Vec::new();
        }
        match self.sync_round_trip(GlCommand::ReadPixels {
            x,
            y,
            width,
            height,
            format,
            ty,
        }) {
            Some(GlReply::Pixels(pixels)) => {
                pixels.unpack().map(|b| b.into_owned()).unwrap_or_default()
            }
            _ => Vec::new(),
        }
    }

    // ── get_parameter ───────────────────────────────────────

    /// Mirrored parameters are answered locally; the rest cost one round
    /// trip per generation and are cached.
    pub fn get_parameter(&mut self, param: Parameter) -> Option<ParamValue> {
        let generation = self.generation.as_ref()?;
        if param.is_mirrored() {
            let m = &generation.mirror;
            return Some(match param {
                Parameter::Viewport => ParamValue::Int4(m.viewport()),
                Parameter::ScissorBox => ParamValue::Int4(m.scissor()),
                Parameter::ClearColor => ParamValue::Float4(m.clear_color()),
                Parameter::BlendColor => ParamValue::Float4(m.blend_color()),
                Parameter::ColorWritemask => ParamValue::Bool4(m.color_mask()),
                Parameter::DepthWritemask => ParamValue::Bool(m.depth_mask()),
                Parameter::ActiveTexture => ParamValue::Int(m.active_unit() as i64),
                // is_mirrored() and this arm must stay in agreement.
                _ => return None,
            });
        }
        if let Some(value) = generation.cache.param(param) {
            return Some(value.clone());
        }
        match self.sync_round_trip(GlCommand::GetParameter { param }) {
            Some(GlReply::Param(value)) => {
                if let Some(generation) = self.generation.as_mut() {
                    generation.cache.store_param(param, value.clone());
                }
                Some(value)
            }
            _ => None,
        }
    }

    /// Bound-object queries, answered from the mirror.
    pub fn get_buffer_binding(
        &self,
        target: rgl_protocol::types::BufferTarget,
    ) -> Option<ParamValue> {
        let generation = self.generation.as_ref()?;
        Some(
            generation
                .mirror
                .buffer_binding(target)
                .map(|h| ParamValue::Object(h.id()))
                .unwrap_or(ParamValue::Object(rgl_protocol::ObjectId::NULL)),
        )
    }

}
