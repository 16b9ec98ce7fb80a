//! Context generations, the loss/restore state machine, and the public
//! proxy surface's lifecycle and diagnostic entry points.
//!
//! A generation owns the state mirror, the backend, and the async result
//! cache for one epoch of a usable context. Loss replaces the whole
//! generation; every handle created under it becomes permanently unusable.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use rgl_common::counters::{process_attach_counter, AttachCounter};
use rgl_protocol::commands::{GlCommand, GlReply};
use rgl_protocol::types::GlError;
use rgl_protocol::{ObjectId, ResourceKind};

use crate::backend::Backend;
use crate::cache::{AsyncResultCache, AvailabilityScheduler};
use crate::config::ProxyConfig;
use crate::error::{BackendError, ErrorQueue, ValidationError};
use crate::handle::{GenerationShared, ObjectClass, ObjectHandle};
use crate::host::{ContextInfo, ContextInit};
use crate::state::{Limits, StateMirror};

/// Why a context was lost. `Guilty` losses are never restorable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossReason {
    /// Explicit client request.
    Manual,
    /// Backend-reported fatal error or allocation failure.
    Unknown,
    /// The execution endpoint itself went away.
    Guilty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossState {
    Ready,
    Lost(LossReason),
    LostForever,
}

impl LossState {
    pub fn is_ready(&self) -> bool {
        matches!(self, LossState::Ready)
    }
}

/// Observer response to a lost notification. Returning `Default` means the
/// loss is final; `AllowRestore` keeps the context restorable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossResponse {
    Default,
    AllowRestore,
}

pub trait ContextObserver {
    fn context_lost(&mut self, _reason: LossReason) -> LossResponse {
        LossResponse::Default
    }

    fn context_restored(&mut self) {}
}

/// Creates the execution backend for a generation. Called once at proxy
/// construction and again on every restore attempt, with the last-known
/// init options.
pub trait BackendFactory {
    fn create(&mut self, init: &ContextInit) -> Result<(Box<dyn Backend>, ContextInfo), String>;
}

impl<F> BackendFactory for F
where
    F: FnMut(&ContextInit) -> Result<(Box<dyn Backend>, ContextInfo), String>,
{
    fn create(&mut self, init: &ContextInit) -> Result<(Box<dyn Backend>, ContextInfo), String> {
        self(init)
    }
}

/// One epoch of a usable context.
pub struct ContextGeneration {
    pub(crate) shared: Arc<GenerationShared>,
    pub(crate) backend: Box<dyn Backend>,
    pub(crate) mirror: StateMirror,
    pub(crate) cache: AsyncResultCache,
    pub(crate) scheduler: AvailabilityScheduler,
    /// How many synchronous round trips this generation has completed; a
    /// watermark for everything the host has acknowledged executing.
    completed_sync_id: u64,
}

enum DeferredTask {
    NotifyLost(LossReason),
    AttemptRestore,
}

pub struct ContextProxy {
    factory: Box<dyn BackendFactory>,
    init: ContextInit,
    config: ProxyConfig,
    attach_counter: Arc<AttachCounter>,

    /// `Some` exactly while the loss state is `Ready`.
    pub(crate) generation: Option<ContextGeneration>,
    loss: LossState,
    restoring: bool,
    deferred: VecDeque<DeferredTask>,
    observer: Option<Box<dyn ContextObserver>>,

    pub(crate) errors: ErrorQueue,
    next_context_id: u64,
    unflushed_wait_warned: u32,
}

impl ContextProxy {
    pub fn new(
        factory: Box<dyn BackendFactory>,
        init: ContextInit,
        config: ProxyConfig,
    ) -> Result<Self, String> {
        let max_error_queue = config.max_error_queue;
        let mut proxy = Self {
            factory,
            init,
            config,
            attach_counter: process_attach_counter(),
            generation: None,
            loss: LossState::Ready,
            restoring: false,
            deferred: VecDeque::new(),
            observer: None,
            errors: ErrorQueue::new(max_error_queue),
            next_context_id: 1,
            unflushed_wait_warned: 0,
        };
        let generation = proxy.create_generation()?;
        proxy.generation = Some(generation);
        Ok(proxy)
    }

    /// Replace the process-wide attach counter with an injected one.
    pub fn set_attach_counter(&mut self, counter: Arc<AttachCounter>) {
        self.attach_counter = counter;
    }

    pub fn set_observer(&mut self, observer: Box<dyn ContextObserver>) {
        self.observer = Some(observer);
    }

    pub(crate) fn attach_counter(&self) -> &AttachCounter {
        &self.attach_counter
    }

    fn create_generation(&mut self) -> Result<ContextGeneration, String> {
        let (backend, info) = self.factory.create(&self.init)?;
        let context_id = self.next_context_id;
        self.next_context_id += 1;
        info!(
            context_id,
            size = ?info.drawing_buffer_size,
            "context generation created"
        );
        Ok(ContextGeneration {
            shared: GenerationShared::new(context_id),
            backend,
            mirror: StateMirror::new(Limits::default(), info.drawing_buffer_size),
            cache: AsyncResultCache::new(),
            scheduler: AvailabilityScheduler::new(),
            completed_sync_id: 0,
        })
    }

    // ── Loss state machine ──────────────────────────────────

    pub fn is_context_lost(&self) -> bool {
        !self.loss.is_ready()
    }

    pub fn loss_state(&self) -> LossState {
        self.loss
    }

    /// Explicit client-requested loss. Losing an already-lost context is a
    /// no-op that queues one warning and no second notification.
    pub fn lose_context(&mut self) {
        if self.is_context_lost() {
            self.queue_error(ValidationError::NotLost.gl_error());
            return;
        }
        self.force_loss(LossReason::Manual);
    }

    /// Restorable only while `Lost`/`LostManually`; concurrent requests are
    /// coalesced into one pending restore task.
    pub fn restore_context(&mut self) {
        match self.loss {
            LossState::Lost(_) => {
                if !self.restoring {
                    self.restoring = true;
                    self.deferred.push_back(DeferredTask::AttemptRestore);
                }
            }
            LossState::Ready | LossState::LostForever => {
                self.queue_error(GlError::InvalidOperation);
            }
        }
    }

    pub(crate) fn force_loss(&mut self, reason: LossReason) {
        if self.is_context_lost() {
            return;
        }
        warn!(?reason, "context lost");
        if let Some(generation) = self.generation.take() {
            generation.shared.mark_lost();
        }
        self.loss = LossState::Lost(reason);
        self.errors.push(GlError::ContextLost);
        // Observers hear about it asynchronously, never within the call
        // that caused the loss.
        self.deferred.push_back(DeferredTask::NotifyLost(reason));
    }

    pub(crate) fn note_backend_error(&mut self, err: BackendError) {
        let reason = err.loss_reason();
        error!("fatal backend error: {err}");
        self.force_loss(reason);
    }

    /// Run everything deferred to the next task boundary: availability
    /// transitions, loss notifications, and restore attempts.
    pub fn run_task_boundary(&mut self) {
        if let Some(generation) = &mut self.generation {
            generation.scheduler.run_task_boundary();
        }

        // Only tasks queued before this boundary; anything an observer
        // queues runs at the next one.
        let mut tasks: VecDeque<_> = std::mem::take(&mut self.deferred);
        while let Some(task) = tasks.pop_front() {
            match task {
                DeferredTask::NotifyLost(reason) => self.notify_lost(reason),
                DeferredTask::AttemptRestore => self.attempt_restore(),
            }
        }
    }

    fn notify_lost(&mut self, reason: LossReason) {
        let mut observer = self.observer.take();
        let response = observer
            .as_mut()
            .map(|o| o.context_lost(reason))
            .unwrap_or(LossResponse::Default);
        self.observer = observer;

        if reason == LossReason::Guilty || response == LossResponse::Default {
            info!(?reason, "loss is final");
            self.loss = LossState::LostForever;
            self.restoring = false;
        }
    }

    fn attempt_restore(&mut self) {
        self.restoring = false;
        if !matches!(self.loss, LossState::Lost(_)) {
            return;
        }
        match self.create_generation() {
            Ok(generation) => {
                self.generation = Some(generation);
                self.loss = LossState::Ready;
                info!("context restored");
                let mut observer = self.observer.take();
                if let Some(o) = observer.as_mut() {
                    o.context_restored();
                }
                self.observer = observer;
            }
            Err(e) => {
                error!("restore failed: {e}");
                self.loss = LossState::LostForever;
            }
        }
    }

    // ── Validation plumbing ─────────────────────────────────

    pub(crate) fn queue_error(&mut self, error: GlError) {
        debug!(?error, "queueing validation error");
        self.errors.push(error);
    }

    pub(crate) fn queue_validation_error(&mut self, error: ValidationError) {
        debug!(%error, "call rejected");
        self.errors.push(error.gl_error());
    }

    /// Does `handle` belong to the current generation and remain usable?
    pub fn validate_handle(&self, handle: &ObjectHandle) -> Result<(), ValidationError> {
        match &self.generation {
            Some(generation) => handle.validate_for(&generation.shared, handle.kind()),
            None => Err(ValidationError::WrongContext),
        }
    }

    /// Common bind-call validation: a `None` handle clears the binding, a
    /// `Some` handle must be a usable object of the expected kind. Queues
    /// the GL error and returns `None` on rejection (and silently when the
    /// context is lost).
    pub(crate) fn validate_binding(
        &mut self,
        handle: Option<&ObjectHandle>,
        kind: ResourceKind,
    ) -> Option<ObjectId> {
        let res = {
            let Some(generation) = self.generation.as_ref() else {
                return None;
            };
            match handle {
                Some(h) => h.validate_for(&generation.shared, kind),
                None => Ok(()),
            }
        };
        match res {
            Ok(()) => Some(handle.map(|h| h.id()).unwrap_or(ObjectId::NULL)),
            Err(e) => {
                self.queue_validation_error(e);
                None
            }
        }
    }

    // ── Encode plumbing ─────────────────────────────────────

    fn drain_deferred(generation: &mut ContextGeneration) -> Result<(), BackendError> {
        for (kind, id) in generation.shared.take_deferred_deletes() {
            generation.backend.submit(&delete_command(kind, id))?;
        }
        Ok(())
    }

    /// Encode one fire-and-forget command. Returns false if the context is
    /// lost (before or because of this call).
    pub(crate) fn submit(&mut self, cmd: GlCommand) -> bool {
        let err = {
            let Some(generation) = self.generation.as_mut() else {
                return false;
            };
            Self::drain_deferred(generation)
                .and_then(|_| generation.backend.submit(&cmd))
                .err()
        };
        match err {
            None => true,
            Some(e) => {
                self.note_backend_error(e);
                false
            }
        }
    }

    /// Encode a command and, only once it is accepted, apply the matching
    /// mirror update.
    pub(crate) fn submit_then(
        &mut self,
        cmd: GlCommand,
        apply: impl FnOnce(&mut StateMirror),
    ) -> bool {
        let err = {
            let Some(generation) = self.generation.as_mut() else {
                return false;
            };
            match Self::drain_deferred(generation)
                .and_then(|_| generation.backend.submit(&cmd))
            {
                Ok(()) => {
                    apply(&mut generation.mirror);
                    None
                }
                Err(e) => Some(e),
            }
        };
        match err {
            None => true,
            Some(e) => {
                self.note_backend_error(e);
                false
            }
        }
    }

    /// Flush, then execute a synchronous command and block for the reply.
    pub(crate) fn sync_round_trip(&mut self, cmd: GlCommand) -> Option<GlReply> {
        let res = {
            let Some(generation) = self.generation.as_mut() else {
                return None;
            };
            Self::drain_deferred(generation)
                .and_then(|_| generation.backend.round_trip(&cmd))
                .inspect(|_| generation.completed_sync_id += 1)
        };
        match res {
            Ok(reply) => Some(reply),
            Err(e) => {
                self.note_backend_error(e);
                None
            }
        }
    }

    /// Implicit flush before a blocking wait the caller never flushed for,
    /// warning the first few times since unflushed waits can never
    /// complete.
    pub(crate) fn flush_before_wait(&mut self) {
        let pending = self
            .generation
            .as_ref()
            .map(|g| g.backend.has_pending())
            .unwrap_or(false);
        if !pending {
            return;
        }
        if self.unflushed_wait_warned < self.config.sync_flush_warn_limit {
            self.unflushed_wait_warned += 1;
            warn!(
                occurrence = self.unflushed_wait_warned,
                "blocking wait issued without a prior flush; flushing implicitly"
            );
        }
        self.flush();
    }

    // ── Object lifecycle plumbing ───────────────────────────

    pub(crate) fn create_object(
        &mut self,
        class: ObjectClass,
        cmd: impl FnOnce(ObjectId) -> GlCommand,
    ) -> ObjectHandle {
        let shared = match self.generation.as_ref() {
            Some(generation) => generation.shared.clone(),
            // Creation against a lost context yields a dead handle; the
            // caller is expected to check is_usable.
            None => return ObjectHandle::dead(class),
        };
        let handle = ObjectHandle::create(&shared, class);
        self.submit(cmd(handle.id()));
        handle
    }

    /// Two-phase delete: unbind from every binding point, then mark and
    /// issue the delete (or release the keep-alive for ref-counted kinds).
    /// No-op for stale, foreign, or already-deleted handles.
    pub(crate) fn delete_object(&mut self, handle: &ObjectHandle, expected: ResourceKind) {
        if handle.kind() != expected {
            return;
        }
        let (unbinds, detaches) = {
            let Some(generation) = self.generation.as_ref() else {
                return;
            };
            if !handle.belongs_to(&generation.shared) || handle.delete_requested() {
                return;
            }
            let unbinds = generation.mirror.unbind_commands(handle);
            let mut detaches = Vec::new();
            if matches!(expected, ResourceKind::Texture | ResourceKind::Renderbuffer) {
                for (target, fb) in generation.mirror.bound_framebuffers() {
                    for attachment in fb.take_attachments_of(handle) {
                        detaches.push(match expected {
                            ResourceKind::Texture => GlCommand::FramebufferTexture2D {
                                target,
                                attachment,
                                texture: ObjectId::NULL,
                                level: 0,
                            },
                            _ => GlCommand::FramebufferRenderbuffer {
                                target,
                                attachment,
                                renderbuffer: ObjectId::NULL,
                            },
                        });
                    }
                }
            }
            (unbinds, detaches)
        };

        for cmd in unbinds.into_iter().chain(detaches) {
            if !self.submit(cmd) {
                return;
            }
        }
        if let Some(generation) = self.generation.as_mut() {
            generation.mirror.remove_references(handle);
        }

        if !handle.request_delete() {
            return;
        }
        if expected.is_ref_counted() {
            // The delete command fires when the last keep-alive reference
            // (attachment, active binding) drops.
            handle.drop_keep_alive();
        } else {
            if let Some(generation) = self.generation.as_ref() {
                generation.shared.unregister(handle.id());
            }
            self.submit(delete_command(expected, handle.id()));
        }
    }

    // ── Lifecycle and diagnostics ───────────────────────────

    /// Transmit everything encoded so far. Idempotent if nothing is
    /// pending.
    pub fn flush(&mut self) {
        let err = {
            let Some(generation) = self.generation.as_mut() else {
                return;
            };
            Self::drain_deferred(generation)
                .and_then(|_| generation.backend.flush())
                .err()
        };
        if let Some(e) = err {
            self.note_backend_error(e);
        }
    }

    /// Flush and block until the host has executed everything.
    pub fn finish(&mut self) {
        let _ = self.sync_round_trip(GlCommand::Finish);
    }

    /// Drain one pending error, FIFO: client-side validation errors first,
    /// then host-side errors.
    pub fn get_error(&mut self) -> GlError {
        if let Some(e) = self.errors.pop() {
            return e;
        }
        if self.generation.is_some() {
            if let Some(GlReply::Error(e)) = self.sync_round_trip(GlCommand::CheckError) {
                return e;
            }
        }
        GlError::NoError
    }

    /// One round trip per generation; cached afterwards.
    pub fn get_supported_extensions(&mut self) -> Vec<String> {
        match self.generation.as_ref() {
            Some(generation) => {
                if let Some(ext) = generation.cache.extensions() {
                    return ext.clone();
                }
            }
            None => return Vec::new(),
        }
        match self.sync_round_trip(GlCommand::GetSupportedExtensions) {
            Some(GlReply::Extensions(ext)) => {
                if let Some(generation) = self.generation.as_mut() {
                    generation.cache.store_extensions(ext.clone());
                }
                ext
            }
            _ => Vec::new(),
        }
    }

    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        self.generation
            .as_ref()
            .map(|g| g.mirror.drawing_buffer_size())
            .unwrap_or((0, 0))
    }

    pub fn resize(&mut self, size: (u32, u32)) {
        let err = {
            let Some(generation) = self.generation.as_mut() else {
                return;
            };
            match generation.backend.resize(size) {
                Ok(()) => {
                    generation.mirror.set_drawing_buffer_size(size);
                    None
                }
                Err(e) => Some(e),
            }
        };
        // Restores recreate the backend at the last-known size.
        self.init.size = size;
        if let Some(e) = err {
            self.note_backend_error(e);
        }
    }

    pub fn on_memory_pressure(&mut self) {
        if let Some(generation) = self.generation.as_mut() {
            debug!(
                live_objects = generation.shared.live_count(),
                "forwarding memory pressure"
            );
            generation.backend.on_memory_pressure();
        }
    }

    /// Live objects under the current generation, for accounting.
    pub fn live_object_count(&self) -> usize {
        self.generation
            .as_ref()
            .map(|g| g.shared.live_count())
            .unwrap_or(0)
    }

    /// Synchronous round trips completed by the current generation.
    pub fn completed_sync_id(&self) -> u64 {
        self.generation
            .as_ref()
            .map(|g| g.completed_sync_id)
            .unwrap_or(0)
    }
}

pub(crate) fn delete_command(kind: ResourceKind, id: ObjectId) -> GlCommand {
    match kind {
        ResourceKind::Buffer => GlCommand::DeleteBuffer { id },
        ResourceKind::Texture => GlCommand::DeleteTexture { id },
        ResourceKind::Program => GlCommand::DeleteProgram { id },
        ResourceKind::Shader => GlCommand::DeleteShader { id },
        ResourceKind::Framebuffer => GlCommand::DeleteFramebuffer { id },
        ResourceKind::Renderbuffer => GlCommand::DeleteRenderbuffer { id },
        ResourceKind::Sampler => GlCommand::DeleteSampler { id },
        ResourceKind::Query => GlCommand::DeleteQuery { id },
        ResourceKind::Sync => GlCommand::DeleteSync { id },
        ResourceKind::TransformFeedback => GlCommand::DeleteTransformFeedback { id },
        ResourceKind::VertexArray => GlCommand::DeleteVertexArray { id },
    }
}
