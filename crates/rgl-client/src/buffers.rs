//! Buffer objects: lifecycle, binding, uploads, and readback.

use rgl_protocol::bulk::BulkBytes;
use rgl_protocol::commands::{GlCommand, GlReply, ParamValue};
use rgl_protocol::types::{BufferParam, BufferTarget, BufferUsage, IndexedBufferTarget};
use rgl_protocol::{ObjectId, ResourceKind};

use crate::cache::ObjectParamKey;
use crate::context::ContextProxy;
use crate::error::ValidationError;
use crate::handle::{BufferKind, ObjectClass, ObjectHandle};

impl ContextProxy {
    pub fn create_buffer(&mut self) -> ObjectHandle {
        self.create_object(
            ObjectClass::Buffer {
                kind: BufferKind::Undefined,
            },
            |id| GlCommand::CreateBuffer { id },
        )
    }

    /// Bind `buffer` to `target`, or clear the binding with `None`. A buffer
    /// keeps the kind (index / non-index) of its first bind forever; a
    /// mismatched rebind is rejected and leaves the binding unchanged.
    pub fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<&ObjectHandle>) {
        let Some(id) = self.validate_binding(buffer, ResourceKind::Buffer) else {
            return;
        };
        if let Some(h) = buffer {
            if let Err(e) = h.buffer_bind_check(target) {
                self.queue_validation_error(e);
                return;
            }
        }
        let bound = buffer.cloned();
        let ok = self.submit_then(GlCommand::BindBuffer { target, buffer: id }, |m| {
            m.set_buffer_binding(target, bound)
        });
        if ok {
            if let Some(h) = buffer {
                h.fix_buffer_kind(target);
            }
        }
    }

    /// Bind to an indexed slot. Also rebinds the general target, matching
    /// the remote side's semantics.
    pub fn bind_buffer_base(
        &mut self,
        target: IndexedBufferTarget,
        index: u32,
        buffer: Option<&ObjectHandle>,
    ) {
        let Some(id) = self.validate_binding(buffer, ResourceKind::Buffer) else {
            return;
        };
        let limit = match self.generation.as_ref() {
            Some(g) => g.mirror.indexed_slot_limit(target),
            None => return,
        };
        if index >= limit {
            self.queue_validation_error(ValidationError::SlotOutOfRange { index, limit });
            return;
        }
        if let Some(h) = buffer {
            if let Err(e) = h.buffer_bind_check(target.general()) {
                self.queue_validation_error(e);
                return;
            }
        }
        let bound = buffer.cloned();
        let ok = self.submit_then(
            GlCommand::BindBufferBase {
                target,
                index,
                buffer: id,
            },
            |m| {
                m.set_indexed_buffer_binding(target, index, bound.clone());
                m.set_buffer_binding(target.general(), bound);
            },
        );
        if ok {
            if let Some(h) = buffer {
                h.fix_buffer_kind(target.general());
            }
        }
    }

    /// Upload `data` to the buffer bound at `target`.
    pub fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let bound = match self.bound_buffer_id(target) {
            Some(id) => id,
            None => return,
        };
        let cmd = GlCommand::BufferData {
            target,
            data: BulkBytes::pack(data),
            usage,
        };
        if self.submit(cmd) {
            if let Some(generation) = self.generation.as_mut() {
                generation.cache.bump_object_version(bound);
            }
        }
    }

    pub fn buffer_sub_data(&mut self, target: BufferTarget, offset: u64, data: &[u8]) {
        if self.bound_buffer_id(target).is_none() {
            return;
        }
        self.submit(GlCommand::BufferSubData {
            target,
            offset,
            data: BulkBytes::pack(data),
        });
    }

    /// Synchronous readback of `length` bytes at `offset` from the buffer
    /// bound at `target`. Empty on error.
    pub fn get_buffer_sub_data(&mut self, target: BufferTarget, offset: u64, length: u64) -> Vec<u8> {
        if self.bound_buffer_id(target).is_none() {
            return Vec::new();
        }
        match self.sync_round_trip(GlCommand::GetBufferSubData {
            target,
            offset,
            length,
        }) {
            Some(GlReply::Bytes(bytes)) => bytes.unpack().map(|b| b.into_owned()).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Parameter query for the buffer bound at `target`; one round trip per
    /// distinct key until the buffer's contents change.
    pub fn get_buffer_parameter(
        &mut self,
        target: BufferTarget,
        pname: BufferParam,
    ) -> Option<ParamValue> {
        let bound = self.bound_buffer_id(target)?;
        let key = ObjectParamKey::Buffer(pname);
        if let Some(generation) = self.generation.as_ref() {
            if let Some(value) = generation.cache.object_param(bound, key) {
                return Some(value.clone());
            }
        }
        match self.sync_round_trip(GlCommand::GetBufferParameter { target, pname }) {
            Some(GlReply::Param(value)) => {
                if let Some(generation) = self.generation.as_mut() {
                    generation.cache.store_object_param(bound, key, value.clone());
                }
                Some(value)
            }
            _ => None,
        }
    }

    pub fn delete_buffer(&mut self, buffer: &ObjectHandle) {
        self.delete_object(buffer, ResourceKind::Buffer);
    }

    pub fn is_buffer(&self, buffer: &ObjectHandle) -> bool {
        buffer.kind() == ResourceKind::Buffer
            && self.validate_handle(buffer).is_ok()
            && buffer.has_been_bound()
    }

    fn bound_buffer_id(&mut self, target: BufferTarget) -> Option<ObjectId> {
        let bound = {
            let generation = self.generation.as_ref()?;
            generation.mirror.buffer_binding(target).map(|h| h.id())
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
