//! The context-loss state machine: manual loss, deferred notification,
//! restoration, handle scoping across generations, and loss escalation from
//! backend failures.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use common::*;

use rgl_client::{ContextObserver, LossReason, LossResponse, LossState, ValidationError};
use rgl_protocol::types::{BufferTarget, BufferUsage, GlError};

struct TestObserver {
    lost: Arc<AtomicU32>,
    restored: Arc<AtomicU32>,
    allow_restore: bool,
}

impl ContextObserver for TestObserver {
    fn context_lost(&mut self, _reason: LossReason) -> LossResponse {
        self.lost.fetch_add(1, Ordering::Relaxed);
        if self.allow_restore {
            LossResponse::AllowRestore
        } else {
            LossResponse::Default
        }
    }

    fn context_restored(&mut self) {
        self.restored.fetch_add(1, Ordering::Relaxed);
    }
}

fn observe(
    proxy: &mut rgl_client::ContextProxy,
    allow_restore: bool,
) -> (Arc<AtomicU32>, Arc<AtomicU32>) {
    let lost = Arc::new(AtomicU32::new(0));
    let restored = Arc::new(AtomicU32::new(0));
    proxy.set_observer(Box::new(TestObserver {
        lost: lost.clone(),
        restored: restored.clone(),
        allow_restore,
    }));
    (lost, restored)
}

#[test]
fn test_lose_then_restore_cycle() {
    let (mut proxy, _log) = in_process_proxy();
    let (lost, restored) = observe(&mut proxy, true);

    let old_buffer = proxy.create_buffer();
    proxy.bind_buffer(BufferTarget::Array, Some(&old_buffer));

    proxy.lose_context();
    assert!(proxy.is_context_lost());
    assert_eq!(proxy.loss_state(), LossState::Lost(LossReason::Manual));
    // The notification is deferred, never synchronous with the loss.
    assert_eq!(lost.load(Ordering::Relaxed), 0);
    assert_eq!(proxy.get_error(), GlError::ContextLost);

    proxy.run_task_boundary();
    assert_eq!(lost.load(Ordering::Relaxed), 1);
    assert!(proxy.is_context_lost());

    proxy.restore_context();
    // Coalesced: a second request schedules nothing extra.
    proxy.restore_context();
    proxy.run_task_boundary();

    assert!(!proxy.is_context_lost());
    assert_eq!(restored.load(Ordering::Relaxed), 1);

    // Old handles fail validation against the new generation; new ones
    // pass.
    assert!(!old_buffer.is_usable());
    assert_eq!(
        proxy.validate_handle(&old_buffer),
        Err(ValidationError::WrongContext)
    );
    let new_buffer = proxy.create_buffer();
    assert!(proxy.validate_handle(&new_buffer).is_ok());
}

#[test]
fn test_losing_a_lost_context_is_a_noop() {
    let (mut proxy, _log) = in_process_proxy();
    let (lost, _) = observe(&mut proxy, true);

    proxy.lose_context();
    proxy.lose_context();

    // One queued warning for the redundant call, and still only one
    // deferred notification.
    assert_eq!(proxy.get_error(), GlError::ContextLost);
    assert_eq!(proxy.get_error(), GlError::InvalidOperation);
    assert_eq!(proxy.get_error(), GlError::NoError);

    proxy.run_task_boundary();
    assert_eq!(lost.load(Ordering::Relaxed), 1);
}

#[test]
fn test_default_loss_handling_is_final() {
    let (mut proxy, _log) = in_process_proxy();

    proxy.lose_context();
    proxy.run_task_boundary();

    // Nobody opted in to restoration.
    assert_eq!(proxy.loss_state(), LossState::LostForever);
    proxy.restore_context();
    assert_eq!(proxy.get_error(), GlError::ContextLost);
    assert_eq!(proxy.get_error(), GlError::InvalidOperation);
}

#[test]
fn test_calls_are_silent_noops_while_lost() {
    let (mut proxy, log) = in_process_proxy();

    proxy.lose_context();
    let before = log.lock().len();

    let buffer = proxy.create_buffer();
    assert!(!buffer.is_usable());
    proxy.bind_buffer(BufferTarget::Array, Some(&buffer));
    proxy.buffer_data(BufferTarget::Array, &[0; 16], BufferUsage::StaticDraw);
    proxy.viewport(0, 0, 8, 8);
    proxy.flush();
    proxy.finish();

    // Nothing reached the host and nothing beyond the loss itself was
    // queued.
    assert_eq!(log.lock().len(), before);
    assert_eq!(proxy.get_error(), GlError::ContextLost);
    assert_eq!(proxy.get_error(), GlError::NoError);
    assert_eq!(proxy.drawing_buffer_size(), (0, 0));
}

#[test]
fn test_restore_failure_is_final() {
    // First creation succeeds, every later one fails.
    let calls = Arc::new(AtomicU32::new(0));
    let log: CommandLog = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let factory_log = log.clone();
    let factory_calls = calls.clone();
    let factory = rgl_client::in_process_factory(move || {
        let script = HostScript {
            fail_create: factory_calls.fetch_add(1, Ordering::Relaxed) > 0,
            ..HostScript::default()
        };
        Box::new(RecordingHost::new(factory_log.clone(), script))
            as Box<dyn rgl_client::ExecutionHost>
    });
    let mut proxy = rgl_client::ContextProxy::new(
        factory,
        rgl_client::ContextInit::new((64, 64), "test-client"),
        rgl_client::ProxyConfig::default(),
    )
    .expect("proxy creation");
    let (_, restored) = observe(&mut proxy, true);

    proxy.lose_context();
    proxy.run_task_boundary();
    proxy.restore_context();
    proxy.run_task_boundary();

    assert_eq!(proxy.loss_state(), LossState::LostForever);
    assert_eq!(restored.load(Ordering::Relaxed), 0);
}

#[test]
fn test_allocation_failure_loses_context() {
    // A pending-buffer cap small enough that one upload overflows it.
    let (mut proxy, _log) = remote_proxy(512);
    let (lost, _) = observe(&mut proxy, true);

    let buffer = proxy.create_buffer();
    proxy.bind_buffer(BufferTarget::Array, Some(&buffer));
    // Incompressible payload, larger than the cap even after LZ4.
    let mut state = 0x9E3779B9u32;
    let noise: Vec<u8> = (0..65536)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect();
    proxy.buffer_data(BufferTarget::Array, &noise, BufferUsage::StaticDraw);

    assert!(proxy.is_context_lost());
    assert_eq!(proxy.loss_state(), LossState::Lost(LossReason::Unknown));

    proxy.run_task_boundary();
    assert_eq!(lost.load(Ordering::Relaxed), 1);
}

#[test]
fn test_endpoint_disconnect_is_guilty_and_unrestorable() {
    let script = HostScript {
        disconnect_on_sync: true,
        ..HostScript::default()
    };
    let (mut proxy, _log) = remote_proxy_with(script, 1 << 20);
    let (lost, restored) = observe(&mut proxy, true);

    proxy.finish();
    assert_eq!(proxy.loss_state(), LossState::Lost(LossReason::Guilty));

    // Guilty losses go LostForever even when the observer opts in.
    proxy.run_task_boundary();
    assert_eq!(lost.load(Ordering::Relaxed), 1);
    assert_eq!(proxy.loss_state(), LossState::LostForever);

    proxy.restore_context();
    proxy.run_task_boundary();
    assert!(proxy.is_context_lost());
    assert_eq!(restored.load(Ordering::Relaxed), 0);
}
