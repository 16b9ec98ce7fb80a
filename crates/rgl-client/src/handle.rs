//! Client-side handles for GPU resources.
//!
//! A handle is a small shared record carrying the wire id, a weak reference
//! to the generation that created it, and object-class flags. Handles may be
//! compared and checked for usability from any thread; everything else
//! happens on the owner thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::Mutex;

use rgl_protocol::types::{Attachment, BufferTarget, QueryTarget, ShaderKind, TextureTarget};
use rgl_protocol::{ObjectId, ResourceKind};

use crate::error::ValidationError;

/// State shared by one context generation and everything it created.
/// Outlives the generation itself only through `Weak` references held by
/// handles, which is exactly how stale handles are detected.
pub struct GenerationShared {
    context_id: u64,
    next_id: AtomicU64,
    lost: AtomicBool,
    /// Remote deletes owed by dropped keep-alive tokens, drained by the
    /// owner thread before the next encode or flush.
    deferred_deletes: Mutex<Vec<(ResourceKind, ObjectId)>>,
    /// Registry of every live object, for accounting and diagnostics.
    live: DashMap<u64, Weak<ObjectRecord>>,
}

impl GenerationShared {
    pub fn new(context_id: u64) -> Arc<Self> {
        Arc::new(Self {
            context_id,
            // 0 is the reserved null id.
            next_id: AtomicU64::new(1),
            lost: AtomicBool::new(false),
            deferred_deletes: Mutex::new(Vec::new()),
            live: DashMap::new(),
        })
    }

    pub fn context_id(&self) -> u64 {
        self.context_id
    }

    pub fn alloc_id(&self) -> ObjectId {
        ObjectId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn mark_lost(&self) {
        self.lost.store(true, Ordering::Release);
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    pub fn push_deferred_delete(&self, kind: ResourceKind, id: ObjectId) {
        self.deferred_deletes.lock().push((kind, id));
    }

    pub fn take_deferred_deletes(&self) -> Vec<(ResourceKind, ObjectId)> {
        std::mem::take(&mut *self.deferred_deletes.lock())
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    fn register(&self, record: &Arc<ObjectRecord>) {
        self.live.insert(record.id.0, Arc::downgrade(record));
    }

    pub(crate) fn unregister(&self, id: ObjectId) {
        self.live.remove(&id.0);
    }
}

/// Shared ownership token for ref-counted object kinds (programs, shaders).
/// The remote delete command is owed once the last clone drops; it is routed
/// through the generation's deferred-delete queue so the actual encode stays
/// on the owner thread.
pub struct KeepAlive {
    kind: ResourceKind,
    id: ObjectId,
    shared: Weak<GenerationShared>,
}

impl KeepAlive {
    fn new(kind: ResourceKind, id: ObjectId, shared: &Arc<GenerationShared>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            id,
            shared: Arc::downgrade(shared),
        })
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            if !shared.is_lost() {
                shared.push_deferred_delete(self.kind, self.id);
                shared.unregister(self.id);
            }
        }
    }
}

/// What a buffer has been used as. Fixed at first bind; rebinding across the
/// index/non-index divide is a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Undefined,
    Index,
    NonIndex,
}

#[derive(Clone)]
pub enum AttachmentRef {
    Texture(ObjectHandle),
    Renderbuffer(ObjectHandle),
}

impl AttachmentRef {
    pub fn handle(&self) -> &ObjectHandle {
        match self {
            AttachmentRef::Texture(h) => h,
            AttachmentRef::Renderbuffer(h) => h,
        }
    }
}

/// Per-class cached flags and deletion-hook data.
pub enum ObjectClass {
    Buffer {
        kind: BufferKind,
    },
    Texture {
        bound_target: Option<TextureTarget>,
    },
    Program {
        keep_alive: Option<Arc<KeepAlive>>,
        attached: Vec<(ObjectHandle, Arc<KeepAlive>)>,
    },
    Shader {
        kind: ShaderKind,
        keep_alive: Option<Arc<KeepAlive>>,
    },
    Framebuffer {
        is_opaque: bool,
        has_been_bound: bool,
        attachments: Vec<(Attachment, AttachmentRef)>,
    },
    Renderbuffer {
        has_been_bound: bool,
    },
    Sampler,
    Query {
        target: Option<QueryTarget>,
        active: bool,
        cannot_be_available_yet: bool,
        known_available: bool,
    },
    Sync {
        cannot_be_available_yet: bool,
        known_signaled: bool,
    },
    TransformFeedback {
        has_been_bound: bool,
    },
    VertexArray {
        has_been_bound: bool,
    },
}

impl ObjectClass {
    fn kind(&self) -> ResourceKind {
        match self {
            ObjectClass::Buffer { .. } => ResourceKind::Buffer,
            ObjectClass::Texture { .. } => ResourceKind::Texture,
            ObjectClass::Program { .. } => ResourceKind::Program,
            ObjectClass::Shader { .. } => ResourceKind::Shader,
            ObjectClass::Framebuffer { .. } => ResourceKind::Framebuffer,
            ObjectClass::Renderbuffer { .. } => ResourceKind::Renderbuffer,
            ObjectClass::Sampler => ResourceKind::Sampler,
            ObjectClass::Query { .. } => ResourceKind::Query,
            ObjectClass::Sync { .. } => ResourceKind::Sync,
            ObjectClass::TransformFeedback { .. } => ResourceKind::TransformFeedback,
            ObjectClass::VertexArray { .. } => ResourceKind::VertexArray,
        }
    }
}

pub struct ObjectRecord {
    id: ObjectId,
    kind: ResourceKind,
    generation: Weak<GenerationShared>,
    delete_requested: AtomicBool,
    class: Mutex<ObjectClass>,
}

/// Cloneable reference to one GPU resource. Equality is identity: two
/// handles are equal when they refer to the same record.
#[derive(Clone)]
pub struct ObjectHandle {
    record: Arc<ObjectRecord>,
}

impl PartialEq for ObjectHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.record, &other.record)
    }
}

impl Eq for ObjectHandle {}

impl std::fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("id", &self.record.id)
            .field("kind", &self.record.kind)
            .field("deleted", &self.record.delete_requested.load(Ordering::Relaxed))
            .finish()
    }
}

impl ObjectHandle {
    /// Allocate a fresh handle under `shared`. The caller is responsible for
    /// issuing the matching create command.
    pub(crate) fn create(shared: &Arc<GenerationShared>, class: ObjectClass) -> Self {
        let id = shared.alloc_id();
        let kind = class.kind();
        let class = match class {
            // Ref-counted kinds get their keep-alive token at birth.
            ObjectClass::Program { attached, .. } => ObjectClass::Program {
                keep_alive: Some(KeepAlive::new(kind, id, shared)),
                attached,
            },
            ObjectClass::Shader { kind: shader_kind, .. } => ObjectClass::Shader {
                kind: shader_kind,
                keep_alive: Some(KeepAlive::new(kind, id, shared)),
            },
            other => other,
        };
        let record = Arc::new(ObjectRecord {
            id,
            kind,
            generation: Arc::downgrade(shared),
            delete_requested: AtomicBool::new(false),
            class: Mutex::new(class),
        });
        shared.register(&record);
        Self { record }
    }

    /// A permanently unusable handle, returned by create calls made against
    /// a lost context.
    pub(crate) fn dead(class: ObjectClass) -> Self {
        let kind = class.kind();
        Self {
            record: Arc::new(ObjectRecord {
                id: ObjectId::NULL,
                kind,
                generation: Weak::new(),
                delete_requested: AtomicBool::new(false),
                class: Mutex::new(class),
            }),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.record.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.record.kind
    }

    pub fn delete_requested(&self) -> bool {
        self.record.delete_requested.load(Ordering::Acquire)
    }

    /// Mark deletion requested. Returns true exactly once.
    pub(crate) fn request_delete(&self) -> bool {
        !self.record.delete_requested.swap(true, Ordering::AcqRel)
    }

    /// Does this handle belong to `shared` and is that generation still the
    /// live one?
    pub fn belongs_to(&self, shared: &Arc<GenerationShared>) -> bool {
        self.record
            .generation
            .upgrade()
            .is_some_and(|g| Arc::ptr_eq(&g, shared))
    }

    /// Usable: belongs to a live, non-lost generation and not deleted.
    pub fn is_usable(&self) -> bool {
        !self.delete_requested()
            && self
                .record
                .generation
                .upgrade()
                .is_some_and(|g| !g.is_lost())
    }

    pub(crate) fn validate_for(
        &self,
        shared: &Arc<GenerationShared>,
        expected: ResourceKind,
    ) -> Result<(), ValidationError> {
        if self.record.kind != expected {
            return Err(ValidationError::WrongKind {
                expected,
                actual: self.record.kind,
            });
        }
        if !self.belongs_to(shared) || shared.is_lost() {
            return Err(ValidationError::WrongContext);
        }
        if self.delete_requested() {
            return Err(ValidationError::AlreadyDeleted);
        }
        Ok(())
    }

    pub(crate) fn with_class<R>(&self, f: impl FnOnce(&mut ObjectClass) -> R) -> R {
        f(&mut self.record.class.lock())
    }

    // ── Buffer flags ────────────────────────────────────────

    /// Enforce kind immutability: a buffer first bound to the index target
    /// can never be bound to a non-index target, and vice versa.
    pub(crate) fn buffer_bind_check(&self, target: BufferTarget) -> Result<(), ValidationError> {
        self.with_class(|class| match class {
            ObjectClass::Buffer { kind } => match (*kind, target.is_index()) {
                (BufferKind::Undefined, _) => Ok(()),
                (BufferKind::Index, true) | (BufferKind::NonIndex, false) => Ok(()),
                _ => Err(ValidationError::KindMismatch),
            },
            _ => Ok(()),
        })
    }

    pub(crate) fn fix_buffer_kind(&self, target: BufferTarget) {
        self.with_class(|class| {
            if let ObjectClass::Buffer { kind } = class {
                if *kind == BufferKind::Undefined {
                    *kind = if target.is_index() {
                        BufferKind::Index
                    } else {
                        BufferKind::NonIndex
                    };
                }
            }
        });
    }

    // ── Texture flags ───────────────────────────────────────

    pub(crate) fn texture_bind_check(&self, target: TextureTarget) -> Result<(), ValidationError> {
        self.with_class(|class| match class {
            ObjectClass::Texture { bound_target } => match bound_target {
                None => Ok(()),
                Some(t) if *t == target => Ok(()),
                Some(_) => Err(ValidationError::TargetMismatch),
            },
            _ => Ok(()),
        })
    }

    pub(crate) fn fix_texture_target(&self, target: TextureTarget) {
        self.with_class(|class| {
            if let ObjectClass::Texture { bound_target } = class {
                bound_target.get_or_insert(target);
            }
        });
    }

    // ── Bound-at-least-once flags ───────────────────────────

    pub(crate) fn mark_bound(&self) {
        self.with_class(|class| match class {
            ObjectClass::Framebuffer { has_been_bound, .. }
            | ObjectClass::Renderbuffer { has_been_bound }
            | ObjectClass::TransformFeedback { has_been_bound }
            | ObjectClass::VertexArray { has_been_bound } => *has_been_bound = true,
            _ => {}
        });
    }

    pub(crate) fn has_been_bound(&self) -> bool {
        self.with_class(|class| match class {
            ObjectClass::Framebuffer { has_been_bound, .. }
            | ObjectClass::Renderbuffer { has_been_bound }
            | ObjectClass::TransformFeedback { has_been_bound }
            | ObjectClass::VertexArray { has_been_bound } => *has_been_bound,
            ObjectClass::Buffer { kind } => *kind != BufferKind::Undefined,
            ObjectClass::Texture { bound_target } => bound_target.is_some(),
            _ => false,
        })
    }

    // ── Framebuffer flags ───────────────────────────────────

    pub(crate) fn framebuffer_is_opaque(&self) -> bool {
        self.with_class(|class| match class {
            ObjectClass::Framebuffer { is_opaque, .. } => *is_opaque,
            _ => false,
        })
    }

    pub(crate) fn set_attachment(&self, attachment: Attachment, reference: Option<AttachmentRef>) {
        self.with_class(|class| {
            if let ObjectClass::Framebuffer { attachments, .. } = class {
                attachments.retain(|(a, _)| *a != attachment);
                if let Some(r) = reference {
                    attachments.push((attachment, r));
                }
            }
        });
    }

    /// Attachment points currently referencing `target`, removing them.
    pub(crate) fn take_attachments_of(&self, target: &ObjectHandle) -> Vec<Attachment> {
        self.with_class(|class| {
            if let ObjectClass::Framebuffer { attachments, .. } = class {
                let mut hit = Vec::new();
                attachments.retain(|(a, r)| {
                    if r.handle() == target {
                        hit.push(*a);
                        false
                    } else {
                        true
                    }
                });
                hit
            } else {
                Vec::new()
            }
        })
    }

    // ── Keep-alive plumbing (programs, shaders) ─────────────

    pub(crate) fn keep_alive(&self) -> Option<Arc<KeepAlive>> {
        self.with_class(|class| match class {
            ObjectClass::Program { keep_alive, .. } | ObjectClass::Shader { keep_alive, .. } => {
                keep_alive.clone()
            }
            _ => None,
        })
    }

    /// Release this handle's own keep-alive reference. The remote delete
    /// fires once attachments and bindings release theirs.
    pub(crate) fn drop_keep_alive(&self) {
        self.with_class(|class| match class {
            ObjectClass::Program { keep_alive, .. } | ObjectClass::Shader { keep_alive, .. } => {
                *keep_alive = None;
            }
            _ => {}
        });
    }

    pub(crate) fn attach(&self, shader: &ObjectHandle) -> bool {
        let Some(token) = shader.keep_alive() else {
            return false;
        };
        self.with_class(|class| {
            if let ObjectClass::Program { attached, .. } = class {
                if attached.iter().any(|(s, _)| s == shader) {
                    return false;
                }
                attached.push((shader.clone(), token));
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn detach(&self, shader: &ObjectHandle) -> bool {
        self.with_class(|class| {
            if let ObjectClass::Program { attached, .. } = class {
                let before = attached.len();
                attached.retain(|(s, _)| s != shader);
                attached.len() != before
            } else {
                false
            }
        })
    }

    // ── Query/sync availability flags ───────────────────────

    pub(crate) fn set_cannot_be_available(&self, value: bool) {
        self.with_class(|class| match class {
            ObjectClass::Query {
                cannot_be_available_yet,
                ..
            }
            | ObjectClass::Sync {
                cannot_be_available_yet,
                ..
            } => *cannot_be_available_yet = value,
            _ => {}
        });
    }

    pub(crate) fn cannot_be_available(&self) -> bool {
        self.with_class(|class| match class {
            ObjectClass::Query {
                cannot_be_available_yet,
                ..
            }
            | ObjectClass::Sync {
                cannot_be_available_yet,
                ..
            } => *cannot_be_available_yet,
            _ => false,
        })
    }
}

/// Weak handle used by the availability scheduler's pending list.
pub(crate) type WeakRecord = Weak<ObjectRecord>;

pub(crate) fn downgrade(handle: &ObjectHandle) -> WeakRecord {
    Arc::downgrade(&handle.record)
}

pub(crate) fn upgrade(weak: &WeakRecord) -> Option<ObjectHandle> {
    weak.upgrade().map(|record| ObjectHandle { record })
}
