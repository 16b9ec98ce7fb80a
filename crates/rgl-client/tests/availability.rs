//! The availability scheduler: queries and fences are never observably
//! ready within the task that put them in flight, regardless of what the
//! host says.

mod common;

use common::*;

use rgl_client::QueryParam;
use rgl_protocol::commands::{op, ParamValue};
use rgl_protocol::types::{GlError, QueryTarget, SyncWaitStatus};

#[test]
fn test_fence_is_unavailable_before_task_boundary() {
    // The host reports the fence as already signaled; the proxy must still
    // answer "not yet" until a boundary passes.
    let (mut proxy, log) = in_process_proxy();

    let fence = proxy.fence_sync();
    assert_eq!(
        proxy.get_sync_parameter(&fence),
        Some(ParamValue::Bool(false))
    );
    // No round trip was wasted on a poll that cannot succeed.
    assert_eq!(count_opcode(&log, op::GET_SYNC_STATUS), 0);

    proxy.run_task_boundary();
    assert_eq!(
        proxy.get_sync_parameter(&fence),
        Some(ParamValue::Bool(true))
    );
    assert_eq!(count_opcode(&log, op::GET_SYNC_STATUS), 1);

    // Signaled is sticky; no further round trips.
    assert_eq!(
        proxy.get_sync_parameter(&fence),
        Some(ParamValue::Bool(true))
    );
    assert_eq!(count_opcode(&log, op::GET_SYNC_STATUS), 1);
}

#[test]
fn test_query_availability_delay_and_result() {
    let (mut proxy, _log) = in_process_proxy();

    let query = proxy.create_query();
    proxy.begin_query(QueryTarget::AnySamplesPassed, &query);
    proxy.end_query(QueryTarget::AnySamplesPassed);

    assert_eq!(
        proxy.get_query_parameter(&query, QueryParam::ResultAvailable),
        Some(ParamValue::Bool(false))
    );
    // Asking for the result before availability is an error.
    assert_eq!(
        proxy.get_query_parameter(&query, QueryParam::Result),
        None
    );
    assert_eq!(proxy.get_error(), GlError::InvalidOperation);

    proxy.run_task_boundary();
    assert_eq!(
        proxy.get_query_parameter(&query, QueryParam::ResultAvailable),
        Some(ParamValue::Bool(true))
    );
    assert_eq!(
        proxy.get_query_parameter(&query, QueryParam::Result),
        Some(ParamValue::Int(42))
    );
}

#[test]
fn test_query_polls_while_active_are_errors() {
    let (mut proxy, _log) = in_process_proxy();

    let query = proxy.create_query();
    proxy.begin_query(QueryTarget::AnySamplesPassed, &query);
    assert_eq!(
        proxy.get_query_parameter(&query, QueryParam::ResultAvailable),
        None
    );
    assert_eq!(proxy.get_error(), GlError::InvalidOperation);
}

#[test]
fn test_begin_query_conflicts() {
    let (mut proxy, _log) = in_process_proxy();

    let first = proxy.create_query();
    let second = proxy.create_query();
    proxy.begin_query(QueryTarget::AnySamplesPassed, &first);

    // Target already has an active query.
    proxy.begin_query(QueryTarget::AnySamplesPassed, &second);
    assert_eq!(proxy.get_error(), GlError::InvalidOperation);

    // Ending a target with no active query is also an error.
    proxy.end_query(QueryTarget::TransformFeedbackPrimitivesWritten);
    assert_eq!(proxy.get_error(), GlError::InvalidOperation);
}

#[test]
fn test_query_target_fixed_at_first_begin() {
    let (mut proxy, _log) = in_process_proxy();

    let query = proxy.create_query();
    proxy.begin_query(QueryTarget::AnySamplesPassed, &query);
    proxy.end_query(QueryTarget::AnySamplesPassed);
    proxy.run_task_boundary();

    proxy.begin_query(QueryTarget::TransformFeedbackPrimitivesWritten, &query);
    assert_eq!(proxy.get_error(), GlError::InvalidOperation);
}

#[test]
fn test_zero_timeout_wait_honors_boundary_rule() {
    let (mut proxy, _log) = in_process_proxy();

    let fence = proxy.fence_sync();
    assert_eq!(
        proxy.client_wait_sync(&fence, 0),
        SyncWaitStatus::TimeoutExpired
    );

    proxy.run_task_boundary();
    assert_eq!(
        proxy.client_wait_sync(&fence, 0),
        SyncWaitStatus::ConditionSatisfied
    );
}

#[test]
fn test_nonzero_timeout_bypasses_boundary_rule() {
    let (mut proxy, _log) = in_process_proxy();

    let fence = proxy.fence_sync();
    // A real blocking wait implies a task boundary has logically passed.
    assert_eq!(
        proxy.client_wait_sync(&fence, 1_000_000),
        SyncWaitStatus::ConditionSatisfied
    );
    // And the signaled state is now cached.
    assert_eq!(
        proxy.client_wait_sync(&fence, 0),
        SyncWaitStatus::AlreadySignaled
    );
}

#[test]
fn test_unflushed_wait_flushes_implicitly() {
    let (mut proxy, log) = remote_proxy(1 << 20);

    let fence = proxy.fence_sync();
    proxy.viewport(0, 0, 8, 8);

    // Nothing was flushed yet; the blocking wait must push the batch out
    // before blocking, or it could never complete.
    assert_eq!(
        proxy.client_wait_sync(&fence, 1_000_000),
        SyncWaitStatus::ConditionSatisfied
    );

    let wait = position_of(&log, op::CLIENT_WAIT_SYNC).expect("wait");
    let viewport = position_of(&log, op::VIEWPORT).expect("viewport");
    let fence_cmd = position_of(&log, op::FENCE_SYNC).expect("fence");
    assert!(fence_cmd < wait);
    assert!(viewport < wait);
}

#[test]
fn test_wait_on_foreign_fence_fails() {
    let (mut proxy, _log) = in_process_proxy();
    let (mut other, _other_log) = in_process_proxy();

    let foreign = other.fence_sync();
    assert_eq!(
        proxy.client_wait_sync(&foreign, 1_000_000),
        SyncWaitStatus::WaitFailed
    );
    assert_eq!(proxy.get_error(), GlError::InvalidOperation);
}
