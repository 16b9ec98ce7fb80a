//! Framebuffers and renderbuffers: lifecycle, binding, attachments.

use rgl_protocol::commands::{GlCommand, GlReply, ParamValue};
use rgl_protocol::types::{Attachment, FramebufferTarget, RenderbufferFormat, RenderbufferParam};
use rgl_protocol::{ObjectId, ResourceKind};

use crate::cache::ObjectParamKey;
use crate::context::ContextProxy;
use crate::error::ValidationError;
use crate::handle::{AttachmentRef, ObjectClass, ObjectHandle};

impl ContextProxy {
    pub fn create_framebuffer(&mut self) -> ObjectHandle {
        self.create_object(
            ObjectClass::Framebuffer {
                is_opaque: false,
                has_been_bound: false,
                attachments: Vec::new(),
            },
            |id| GlCommand::CreateFramebuffer { id },
        )
    }

    /// An opaque (XR-style) framebuffer: owned by the platform layer and
    /// guarded against accidental deletion.
    pub fn create_opaque_framebuffer(&mut self) -> ObjectHandle {
        self.create_object(
            ObjectClass::Framebuffer {
                is_opaque: true,
                has_been_bound: false,
                attachments: Vec::new(),
            },
            |id| GlCommand::CreateFramebuffer { id },
        )
    }

    pub fn bind_framebuffer(
        &mut self,
        target: FramebufferTarget,
        framebuffer: Option<&ObjectHandle>,
    ) {
        let Some(id) = self.validate_binding(framebuffer, ResourceKind::Framebuffer) else {
            return;
        };
        let bound = framebuffer.cloned();
        let ok = self.submit_then(
            GlCommand::BindFramebuffer {
                target,
                framebuffer: id,
            },
            |m| m.set_framebuffer_binding(target, bound),
        );
        if ok {
            if let Some(h) = framebuffer {
                h.mark_bound();
            }
        }
    }

    /// Attach level `level` of `texture` (or detach with `None`) to the
    /// framebuffer bound at `target`.
    pub fn framebuffer_texture_2d(
        &mut self,
        target: FramebufferTarget,
        attachment: Attachment,
        texture: Option<&ObjectHandle>,
        level: i32,
    ) {
        let Some(id) = self.validate_binding(texture, ResourceKind::Texture) else {
            return;
        };
        let Some(fb) = self.bound_framebuffer(target) else {
            return;
        };
        let ok = self.submit(GlCommand::FramebufferTexture2D {
            target,
            attachment,
            texture: id,
            level,
        });
        if ok {
            fb.set_attachment(attachment, texture.map(|h| AttachmentRef::Texture(h.clone())));
        }
    }

    pub fn framebuffer_renderbuffer(
        &mut self,
        target: FramebufferTarget,
        attachment: Attachment,
        renderbuffer: Option<&ObjectHandle>,
    ) {
        let Some(id) = self.validate_binding(renderbuffer, ResourceKind::Renderbuffer) else {
            return;
        };
        let Some(fb) = self.bound_framebuffer(target) else {
            return;
        };
        let ok = self.submit(GlCommand::FramebufferRenderbuffer {
            target,
            attachment,
            renderbuffer: id,
        });
        if ok {
            fb.set_attachment(
                attachment,
                renderbuffer.map(|h| AttachmentRef::Renderbuffer(h.clone())),
            );
        }
    }

    /// Delete a framebuffer. Opaque framebuffers are rejected unless the
    /// caller explicitly asserts `can_delete_opaque`.
    pub fn delete_framebuffer(&mut self, framebuffer: &ObjectHandle, can_delete_opaque: bool) {
        if framebuffer.framebuffer_is_opaque() && !can_delete_opaque {
            if self.generation.is_some() {
                self.queue_validation_error(ValidationError::OpaqueFramebuffer);
            }
            return;
        }
        self.delete_object(framebuffer, ResourceKind::Framebuffer);
    }

    pub fn is_framebuffer(&self, framebuffer: &ObjectHandle) -> bool {
        framebuffer.kind() == ResourceKind::Framebuffer
            && self.validate_handle(framebuffer).is_ok()
            && framebuffer.has_been_bound()
    }

    fn bound_framebuffer(&mut self, target: FramebufferTarget) -> Option<ObjectHandle> {
        let bound = {
            let generation = self.generation.as_ref()?;
            generation.mirror.framebuffer_binding(target).cloned()
        };
        if bound.is_none() {
            self.queue_validation_error(ValidationError::NothingBound);
        }
        bound
    }

    // ── Renderbuffers ───────────────────────────────────────

    pub fn create_renderbuffer(&mut self) -> ObjectHandle {
        self.create_object(
            ObjectClass::Renderbuffer {
                has_been_bound: false,
            },
            |id| GlCommand::CreateRenderbuffer { id },
        )
    }

    pub fn bind_renderbuffer(&mut self, renderbuffer: Option<&ObjectHandle>) {
        let Some(id) = self.validate_binding(renderbuffer, ResourceKind::Renderbuffer) else {
            return;
        };
        let bound = renderbuffer.cloned();
        let ok = self.submit_then(GlCommand::BindRenderbuffer { renderbuffer: id }, |m| {
            m.set_renderbuffer_binding(bound)
        });
        if ok {
            if let Some(h) = renderbuffer {
                h.mark_bound();
            }
        }
    }

    /// Allocate storage for the bound renderbuffer.
    pub fn renderbuffer_storage(&mut self, format: RenderbufferFormat, width: i32, height: i32) {
        let bound = match self.bound_renderbuffer_id() {
            Some(id) => id,
            None => return,
        };
        if width < 0 || height < 0 {
            self.queue_validation_error(ValidationError::InvalidDimension);
            return;
        }
        let ok = self.submit(GlCommand::RenderbufferStorage {
            format,
            width,
            height,
        });
        if ok {
            if let Some(generation) = self.generation.as_mut() {
                generation.cache.bump_object_version(bound);
            }
        }
    }

    pub fn get_renderbuffer_parameter(&mut self, pname: RenderbufferParam) -> Option<ParamValue> {
        let bound = self.bound_renderbuffer_id()?;
        let key = ObjectParamKey::Renderbuffer(pname);
        if let Some(generation) = self.generation.as_ref() {
            if let Some(value) = generation.cache.object_param(bound, key) {
                return Some(value.clone());
            }
        }
        match self.sync_round_trip(GlCommand::GetRenderbufferParameter { pname }) {
            Some(GlReply::Param(value)) => {
                if let Some(generation) = self.generation.as_mut() {
                    generation.cache.store_object_param(bound, key, value.clone());
                }
                Some(value)
            }
            _ => None,
        }
    }

    pub fn delete_renderbuffer(&mut self, renderbuffer: &ObjectHandle) {
        self.delete_object(renderbuffer, ResourceKind::Renderbuffer);
    }

    pub fn is_renderbuffer(&self, renderbuffer: &ObjectHandle) -> bool {
        renderbuffer.kind() == ResourceKind::Renderbuffer
            && self.validate_handle(renderbuffer).is_ok()
            && renderbuffer.has_been_bound()
    }

    fn bound_renderbuffer_id(&mut self) -> Option<ObjectId> {
        let bound = {
            let generation = self.generation.as_ref()?;
            generation.mirror.renderbuffer_binding().map(|h| h.id())
        };
        match bound {
            Some(id) => Some(id),
            None => {
                self.queue_validation_error(ValidationError::NothingBound);
                None
            }
        }
    }
}
