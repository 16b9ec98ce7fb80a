//! Textures and samplers: lifecycle, per-unit binding, uploads, parameters.

use rgl_protocol::bulk::BulkBytes;
use rgl_protocol::commands::{GlCommand, GlReply, ParamValue};
use rgl_protocol::types::{PixelFormat, SamplerParam, TextureTarget};
use rgl_protocol::ResourceKind;

use crate::cache::ObjectParamKey;
use crate::context::ContextProxy;
use crate::error::ValidationError;
use crate::handle::{ObjectClass, ObjectHandle};
use crate::host::TexelSource;

impl ContextProxy {
    pub fn create_texture(&mut self) -> ObjectHandle {
        self.create_object(ObjectClass::Texture { bound_target: None }, |id| {
            GlCommand::CreateTexture { id }
        })
    }

    /// Select the active texture unit.
    pub fn active_texture(&mut self, unit: u32) {
        let limit = match self.generation.as_ref() {
            Some(g) => g.mirror.limits().texture_units,
            None => return,
        };
        if unit >= limit {
            self.queue_validation_error(ValidationError::SlotOutOfRange { index: unit, limit });
            return;
        }
        self.submit_then(GlCommand::ActiveTexture { unit }, |m| {
            m.set_active_unit(unit)
        });
    }

    /// Bind `texture` to `target` on the active unit. A texture's target is
    /// fixed at first bind.
    pub fn bind_texture(&mut self, target: TextureTarget, texture: Option<&ObjectHandle>) {
        let Some(id) = self.validate_binding(texture, ResourceKind::Texture) else {
            return;
        };
        if let Some(h) = texture {
            if let Err(e) = h.texture_bind_check(target) {
                self.queue_validation_error(e);
                return;
            }
        }
        let bound = texture.cloned();
        let ok = self.submit_then(GlCommand::BindTexture { target, texture: id }, |m| {
            let unit = m.active_unit();
            m.set_texture_binding(unit, target, bound);
        });
        if ok {
            if let Some(h) = texture {
                h.fix_texture_target(target);
            }
        }
    }

    /// Define level `level` of the texture bound at `target` from a texel
    /// source. The descriptor must agree with the payload size.
    pub fn tex_image_2d(
        &mut self,
        target: TextureTarget,
        level: i32,
        internal_format: PixelFormat,
        source: &dyn TexelSource,
    ) {
        if !self.texture_bound(target) {
            return;
        }
        let desc = source.descriptor();
        let texels = source.texels();
        if desc.width < 0 || desc.height < 0 || level < 0 {
            self.queue_validation_error(ValidationError::InvalidDimension);
            return;
        }
        if texels.len() != desc.byte_len() {
            self.queue_validation_error(ValidationError::TexelSizeMismatch);
            return;
        }
        self.submit(GlCommand::TexImage2D {
            target,
            level,
            internal_format,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            ty: desc.ty,
            pixels: Some(BulkBytes::pack(&texels)),
        });
    }

    pub fn tex_sub_image_2d(
        &mut self,
        target: TextureTarget,
        level: i32,
        x: i32,
        y: i32,
        source: &dyn TexelSource,
    ) {
        if !self.texture_bound(target) {
            return;
        }
        let desc = source.descriptor();
        let texels = source.texels();
        if desc.width < 0 || desc.height < 0 || level < 0 || x < 0 || y < 0 {
            self.queue_validation_error(ValidationError::InvalidDimension);
            return;
        }
        if texels.len() != desc.byte_len() {
            self.queue_validation_error(ValidationError::TexelSizeMismatch);
            return;
        }
        self.submit(GlCommand::TexSubImage2D {
            target,
            level,
            x,
            y,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            ty: desc.ty,
            pixels: BulkBytes::pack(&texels),
        });
    }

    pub fn tex_parameter_i(&mut self, target: TextureTarget, pname: SamplerParam, value: i32) {
        if !self.texture_bound(target) {
            return;
        }
        self.submit(GlCommand::TexParameterI {
            target,
            pname,
            value,
        });
    }

    pub fn delete_texture(&mut self, texture: &ObjectHandle) {
        self.delete_object(texture, ResourceKind::Texture);
    }

    pub fn is_texture(&self, texture: &ObjectHandle) -> bool {
        texture.kind() == ResourceKind::Texture
            && self.validate_handle(texture).is_ok()
            && texture.has_been_bound()
    }

    fn texture_bound(&mut self, target: TextureTarget) -> bool {
        let bound = {
            let Some(generation) = self.generation.as_ref() else {
                return false;
            };
            let unit = generation.mirror.active_unit();
            generation.mirror.texture_binding(unit, target).is_some()
        };
        if !bound {
            self.queue_validation_error(ValidationError::NothingBound);
        }
        bound
    }

    // ── Samplers ────────────────────────────────────────────

    pub fn create_sampler(&mut self) -> ObjectHandle {
        self.create_object(ObjectClass::Sampler, |id| GlCommand::CreateSampler { id })
    }

    pub fn bind_sampler(&mut self, unit: u32, sampler: Option<&ObjectHandle>) {
        let Some(id) = self.validate_binding(sampler, ResourceKind::Sampler) else {
            return;
        };
        let limit = match self.generation.as_ref() {
            Some(g) => g.mirror.limits().texture_units,
            None => return,
        };
        if unit >= limit {
            self.queue_validation_error(ValidationError::SlotOutOfRange { index: unit, limit });
            return;
        }
        let bound = sampler.cloned();
        self.submit_then(GlCommand::BindSampler { unit, sampler: id }, |m| {
            m.set_sampler_binding(unit, bound)
        });
    }

    pub fn sampler_parameter_i(&mut self, sampler: &ObjectHandle, pname: SamplerParam, value: i32) {
        if self.generation.is_none() {
            return;
        }
        if let Err(e) = self.usable_sampler(sampler) {
            self.queue_validation_error(e);
            return;
        }
        if self.submit(GlCommand::SamplerParameterI {
            sampler: sampler.id(),
            pname,
            value,
        }) {
            if let Some(generation) = self.generation.as_mut() {
                generation.cache.bump_object_version(sampler.id());
            }
        }
    }

    pub fn sampler_parameter_f(&mut self, sampler: &ObjectHandle, pname: SamplerParam, value: f32) {
        if self.generation.is_none() {
            return;
        }
        if let Err(e) = self.usable_sampler(sampler) {
            self.queue_validation_error(e);
            return;
        }
        if self.submit(GlCommand::SamplerParameterF {
            sampler: sampler.id(),
            pname,
            value,
        }) {
            if let Some(generation) = self.generation.as_mut() {
                generation.cache.bump_object_version(sampler.id());
            }
        }
    }

    pub fn get_sampler_parameter(
        &mut self,
        sampler: &ObjectHandle,
        pname: SamplerParam,
    ) -> Option<ParamValue> {
        self.generation.as_ref()?;
        if let Err(e) = self.usable_sampler(sampler) {
            self.queue_validation_error(e);
            return None;
        }
        let key = ObjectParamKey::Sampler(pname);
        if let Some(generation) = self.generation.as_ref() {
            if let Some(value) = generation.cache.object_param(sampler.id(), key) {
                return Some(value.clone());
            }
        }
        match self.sync_round_trip(GlCommand::GetSamplerParameter {
            sampler: sampler.id(),
            pname,
        }) {
            Some(GlReply::Param(value)) => {
                if let Some(generation) = self.generation.as_mut() {
                    generation
                        .cache
                        .store_object_param(sampler.id(), key, value.clone());
                }
                Some(value)
            }
            _ => None,
        }
    }

    pub fn delete_sampler(&mut self, sampler: &ObjectHandle) {
        self.delete_object(sampler, ResourceKind::Sampler);
    }

    pub fn is_sampler(&self, sampler: &ObjectHandle) -> bool {
        sampler.kind() == ResourceKind::Sampler && self.validate_handle(sampler).is_ok()
    }

    fn usable_sampler(&self, sampler: &ObjectHandle) -> Result<(), ValidationError> {
        match self.generation.as_ref() {
            Some(generation) => sampler.validate_for(&generation.shared, ResourceKind::Sampler),
            None => Err(ValidationError::WrongContext),
        }
    }
}
