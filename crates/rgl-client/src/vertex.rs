//! Vertex array and transform feedback container objects.

use rgl_protocol::commands::GlCommand;
use rgl_protocol::ResourceKind;

use crate::context::ContextProxy;
use crate::handle::{ObjectClass, ObjectHandle};

impl ContextProxy {
    // ── Vertex arrays ───────────────────────────────────────

    pub fn create_vertex_array(&mut self) -> ObjectHandle {
        self.create_object(
            ObjectClass::VertexArray {
                has_been_bound: false,
            },
            |id| GlCommand::CreateVertexArray { id },
        )
    }

    pub fn bind_vertex_array(&mut self, vertex_array: Option<&ObjectHandle>) {
        let Some(id) = self.validate_binding(vertex_array, ResourceKind::VertexArray) else {
            return;
        };
        let bound = vertex_array.cloned();
        let ok = self.submit_then(GlCommand::BindVertexArray { vertex_array: id }, |m| {
            m.set_vertex_array_binding(bound)
        });
        if ok {
            if let Some(h) = vertex_array {
                h.mark_bound();
            }
        }
    }

    pub fn delete_vertex_array(&mut self, vertex_array: &ObjectHandle) {
        self.delete_object(vertex_array, ResourceKind::VertexArray);
    }

    pub fn is_vertex_array(&self, vertex_array: &ObjectHandle) -> bool {
        vertex_array.kind() == ResourceKind::VertexArray
            && self.validate_handle(vertex_array).is_ok()
            && vertex_array.has_been_bound()
    }

    // ── Transform feedback ──────────────────────────────────

    pub fn create_transform_feedback(&mut self) -> ObjectHandle {
        self.create_object(
            ObjectClass::TransformFeedback {
                has_been_bound: false,
            },
            |id| GlCommand::CreateTransformFeedback { id },
        )
    }

    pub fn bind_transform_feedback(&mut self, transform_feedback: Option<&ObjectHandle>) {
        let Some(id) = self.validate_binding(transform_feedback, ResourceKind::TransformFeedback)
        else {
            return;
        };
        let bound = transform_feedback.cloned();
        let ok = self.submit_then(
            GlCommand::BindTransformFeedback {
                transform_feedback: id,
            },
            |m| m.set_transform_feedback_binding(bound),
        );
        if ok {
            if let Some(h) = transform_feedback {
                h.mark_bound();
            }
        }
    }

    pub fn delete_transform_feedback(&mut self, transform_feedback: &ObjectHandle) {
        self.delete_object(transform_feedback, ResourceKind::TransformFeedback);
    }

    pub fn is_transform_feedback(&self, transform_feedback: &ObjectHandle) -> bool {
        transform_feedback.kind() == ResourceKind::TransformFeedback
            && self.validate_handle(transform_feedback).is_ok()
            && transform_feedback.has_been_bound()
    }
}
