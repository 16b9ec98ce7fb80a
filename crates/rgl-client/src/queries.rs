//! Occlusion/feedback queries and fence syncs.
//!
//! Completion is asynchronous twice over: the host computes it, and the
//! proxy additionally refuses to report it until a task boundary has passed
//! since the object entered flight. Blocking waits with a nonzero timeout
//! bypass the boundary rule but still force a flush first.

use rgl_protocol::commands::{GlCommand, GlReply, ParamValue};
use rgl_protocol::types::{QueryTarget, SyncWaitStatus};
use rgl_protocol::ResourceKind;

use crate::context::ContextProxy;
use crate::error::ValidationError;
use crate::handle::{ObjectClass, ObjectHandle};

/// Client-side query parameter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryParam {
    ResultAvailable,
    Result,
}

impl ContextProxy {
    // ── Queries ─────────────────────────────────────────────

    pub fn create_query(&mut self) -> ObjectHandle {
        self.create_object(
            ObjectClass::Query {
                target: None,
                active: false,
                cannot_be_available_yet: false,
                known_available: false,
            },
            |id| GlCommand::CreateQuery { id },
        )
    }

    pub fn begin_query(&mut self, target: QueryTarget, query: &ObjectHandle) {
        if !self.check_usable(query, ResourceKind::Query) {
            return;
        }
        let rejection = {
            let Some(generation) = self.generation.as_ref() else {
                return;
            };
            if generation.mirror.active_query(target).is_some() {
                Some(ValidationError::QueryActive)
            } else {
                query.with_class(|class| match class {
                    ObjectClass::Query { active: true, .. } => Some(ValidationError::QueryActive),
                    // A query's target is fixed at first begin.
                    ObjectClass::Query {
                        target: Some(t), ..
                    } if *t != target => Some(ValidationError::TargetMismatch),
                    _ => None,
                })
            }
        };
        if let Some(e) = rejection {
            self.queue_validation_error(e);
            return;
        }
        let bound = query.clone();
        let ok = self.submit_then(
            GlCommand::BeginQuery {
                target,
                query: query.id(),
            },
            |m| m.set_active_query(target, Some(bound)),
        );
        if ok {
            query.with_class(|class| {
                if let ObjectClass::Query {
                    target: t, active, ..
                } = class
                {
                    t.get_or_insert(target);
                    *active = true;
                }
            });
        }
    }

    /// End the active query for `target` and put it in flight: it can never
    /// report availability before the next task boundary.
    pub fn end_query(&mut self, target: QueryTarget) {
        let query = {
            let Some(generation) = self.generation.as_ref() else {
                return;
            };
            generation.mirror.active_query(target).cloned()
        };
        let Some(query) = query else {
            self.queue_validation_error(ValidationError::NoActiveQuery);
            return;
        };
        let ok = self.submit_then(GlCommand::EndQuery { target }, |m| {
            m.set_active_query(target, None)
        });
        if ok {
            query.with_class(|class| {
                if let ObjectClass::Query {
                    active,
                    known_available,
                    ..
                } = class
                {
                    *active = false;
                    *known_available = false;
                }
            });
            if let Some(generation) = self.generation.as_mut() {
                generation.scheduler.defer(&query);
            }
        }
    }

    pub fn get_query_parameter(
        &mut self,
        query: &ObjectHandle,
        pname: QueryParam,
    ) -> Option<ParamValue> {
        if !self.check_usable_query(query, ResourceKind::Query) {
            return None;
        }
        let active = query.with_class(|class| {
            matches!(class, ObjectClass::Query { active: true, .. })
        });
        if active {
            self.queue_validation_error(ValidationError::QueryActive);
            return None;
        }
        match pname {
            QueryParam::ResultAvailable => Some(ParamValue::Bool(self.query_available(query))),
            QueryParam::Result => {
                if !self.query_available(query) {
                    self.queue_validation_error(ValidationError::ResultNotAvailable);
                    return None;
                }
                match self.sync_round_trip(GlCommand::GetQueryResult { query: query.id() }) {
                    Some(GlReply::QueryResult(value)) => Some(ParamValue::Int(value as i64)),
                    _ => None,
                }
            }
        }
    }

    /// Availability with the task-boundary rule applied: before the flag
    /// clears, the answer is always "not yet", even if the host already
    /// finished.
    fn query_available(&mut self, query: &ObjectHandle) -> bool {
        if query.cannot_be_available() {
            return false;
        }
        let known = query.with_class(|class| {
            matches!(
                class,
                ObjectClass::Query {
                    known_available: true,
                    ..
                }
            )
        });
        if known {
            return true;
        }
        match self.sync_round_trip(GlCommand::GetQueryAvailable { query: query.id() }) {
            Some(GlReply::Available(available)) => {
                if available {
                    query.with_class(|class| {
                        if let ObjectClass::Query {
                            known_available, ..
                        } = class
                        {
                            *known_available = true;
                        }
                    });
                }
                available
            }
            _ => false,
        }
    }

    pub fn delete_query(&mut self, query: &ObjectHandle) {
        self.delete_object(query, ResourceKind::Query);
    }

    pub fn is_query(&self, query: &ObjectHandle) -> bool {
        query.kind() == ResourceKind::Query && self.validate_handle(query).is_ok()
    }

    // ── Fence syncs ─────────────────────────────────────────

    /// Insert a fence into the command stream. The fence is in flight until
    /// the next task boundary.
    pub fn fence_sync(&mut self) -> ObjectHandle {
        let handle = self.create_object(
            ObjectClass::Sync {
                cannot_be_available_yet: false,
                known_signaled: false,
            },
            |id| GlCommand::FenceSync { id },
        );
        if handle.is_usable() {
            if let Some(generation) = self.generation.as_mut() {
                generation.scheduler.defer(&handle);
            }
        }
        handle
    }

    /// Block until the fence signals or `timeout_ns` elapses. A zero
    /// timeout is a poll and honors the task-boundary rule; a nonzero
    /// timeout implies a boundary has logically passed and may bypass it.
    pub fn client_wait_sync(&mut self, sync: &ObjectHandle, timeout_ns: u64) -> SyncWaitStatus {
        if !self.check_usable_query(sync, ResourceKind::Sync) {
            return SyncWaitStatus::WaitFailed;
        }
        let known_signaled = sync.with_class(|class| {
            matches!(
                class,
                ObjectClass::Sync {
                    known_signaled: true,
                    ..
                }
            )
        });
        if known_signaled {
            return SyncWaitStatus::AlreadySignaled;
        }
        if timeout_ns == 0 && sync.cannot_be_available() {
            return SyncWaitStatus::TimeoutExpired;
        }
        // An unflushed wait could never complete.
        self.flush_before_wait();
        match self.sync_round_trip(GlCommand::ClientWaitSync {
            sync: sync.id(),
            timeout_ns,
        }) {
            Some(GlReply::SyncWait(status)) => {
                if matches!(
                    status,
                    SyncWaitStatus::AlreadySignaled | SyncWaitStatus::ConditionSatisfied
                ) {
                    sync.with_class(|class| {
                        if let ObjectClass::Sync { known_signaled, .. } = class {
                            *known_signaled = true;
                        }
                    });
                }
                status
            }
            _ => SyncWaitStatus::WaitFailed,
        }
    }

    /// Poll the fence's signaled state, honoring the task-boundary rule.
    pub fn get_sync_parameter(&mut self, sync: &ObjectHandle) -> Option<ParamValue> {
        if !self.check_usable_query(sync, ResourceKind::Sync) {
            return None;
        }
        if sync.cannot_be_available() {
            return Some(ParamValue::Bool(false));
        }
        let known_signaled = sync.with_class(|class| {
            matches!(
                class,
                ObjectClass::Sync {
                    known_signaled: true,
                    ..
                }
            )
        });
        if known_signaled {
            return Some(ParamValue::Bool(true));
        }
        match self.sync_round_trip(GlCommand::GetSyncStatus { sync: sync.id() }) {
            Some(GlReply::SyncStatus(signaled)) => {
                if signaled {
                    sync.with_class(|class| {
                        if let ObjectClass::Sync { known_signaled, .. } = class {
                            *known_signaled = true;
                        }
                    });
                }
                Some(ParamValue::Bool(signaled))
            }
            _ => None,
        }
    }

    pub fn delete_sync(&mut self, sync: &ObjectHandle) {
        self.delete_object(sync, ResourceKind::Sync);
    }

    pub fn is_sync(&self, sync: &ObjectHandle) -> bool {
        sync.kind() == ResourceKind::Sync && self.validate_handle(sync).is_ok()
    }
}
