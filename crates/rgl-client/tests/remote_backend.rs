//! Remote-mode batching, flush ordering, and the async result cache.

mod common;

use common::*;

use rgl_client::ShaderParam;
use rgl_common::counters::AttachCounter;
use rgl_protocol::commands::{op, ParamValue};
use rgl_protocol::types::{GlError, Parameter, PixelFormat, PixelType, ShaderKind};

#[test]
fn test_sync_read_observes_all_prior_writes() {
    let (mut proxy, log) = remote_proxy(1 << 20);

    proxy.viewport(0, 0, 32, 32);
    proxy.clear_color(0.0, 0.0, 0.0, 1.0);
    proxy.clear(rgl_protocol::types::ClearMask::COLOR);

    // A synchronous query flushes everything encoded before it, so the host
    // must have executed all three commands before answering.
    let value = proxy.get_parameter(Parameter::MaxTextureSize);
    assert_eq!(value, Some(ParamValue::Int(4096)));

    let get = position_of(&log, op::GET_PARAMETER).expect("get");
    for opcode in [op::VIEWPORT, op::CLEAR_COLOR, op::CLEAR] {
        let pos = position_of(&log, opcode).expect("prior write");
        assert!(pos < get, "write {opcode:#06x} not flushed before the read");
    }
}

#[test]
fn test_mirrored_parameters_skip_the_round_trip() {
    let (mut proxy, log) = remote_proxy(1 << 20);

    proxy.viewport(1, 2, 30, 40);
    assert_eq!(
        proxy.get_parameter(Parameter::Viewport),
        Some(ParamValue::Int4([1, 2, 30, 40]))
    );
    assert_eq!(
        proxy.get_parameter(Parameter::ActiveTexture),
        Some(ParamValue::Int(0))
    );
    assert_eq!(count_opcode(&log, op::GET_PARAMETER), 0);
}

#[test]
fn test_expensive_parameters_cached_per_generation() {
    let (mut proxy, log) = remote_proxy(1 << 20);

    assert_eq!(
        proxy.get_parameter(Parameter::Vendor),
        Some(ParamValue::Str("rgl-mock".to_string()))
    );
    assert_eq!(
        proxy.get_parameter(Parameter::Vendor),
        Some(ParamValue::Str("rgl-mock".to_string()))
    );
    assert_eq!(count_opcode(&log, op::GET_PARAMETER), 1);
}

#[test]
fn test_compile_result_fetched_once_per_compile() {
    let (mut proxy, log) = remote_proxy(1 << 20);

    let shader = proxy.create_shader(ShaderKind::Vertex);
    proxy.shader_source(&shader, "void main() {}");
    proxy.compile_shader(&shader);

    assert_eq!(
        proxy.get_shader_parameter(&shader, ShaderParam::CompileStatus),
        Some(ParamValue::Bool(true))
    );
    assert_eq!(proxy.get_shader_info_log(&shader), "mock compile ok");
    assert_eq!(count_opcode(&log, op::GET_SHADER_COMPILE_RESULT), 1);

    // A fresh compile invalidates the cached outcome.
    proxy.compile_shader(&shader);
    assert_eq!(
        proxy.get_shader_parameter(&shader, ShaderParam::CompileStatus),
        Some(ParamValue::Bool(true))
    );
    assert_eq!(count_opcode(&log, op::GET_SHADER_COMPILE_RESULT), 2);
}

#[test]
fn test_compile_status_without_compile_is_none() {
    let (mut proxy, log) = remote_proxy(1 << 20);

    let shader = proxy.create_shader(ShaderKind::Fragment);
    assert_eq!(
        proxy.get_shader_parameter(&shader, ShaderParam::CompileStatus),
        None
    );
    assert_eq!(count_opcode(&log, op::GET_SHADER_COMPILE_RESULT), 0);
}

#[test]
fn test_uniform_locations_cached_until_relink() {
    let (mut proxy, log) = remote_proxy(1 << 20);

    let program = proxy.create_program();
    proxy.link_program(&program);

    let a = proxy.get_uniform_location(&program, "u_mvp");
    let b = proxy.get_uniform_location(&program, "u_mvp");
    assert_eq!(a, b);
    assert!(a.is_some());
    assert_eq!(count_opcode(&log, op::GET_UNIFORM_LOCATION), 1);

    // Distinct names are distinct round trips.
    let _ = proxy.get_uniform_location(&program, "u_color");
    assert_eq!(count_opcode(&log, op::GET_UNIFORM_LOCATION), 2);

    // Relinking invalidates every cached location.
    proxy.link_program(&program);
    let _ = proxy.get_uniform_location(&program, "u_mvp");
    assert_eq!(count_opcode(&log, op::GET_UNIFORM_LOCATION), 3);
}

#[test]
fn test_extensions_cached_per_generation() {
    let (mut proxy, log) = remote_proxy(1 << 20);

    let first = proxy.get_supported_extensions();
    let second = proxy.get_supported_extensions();
    assert_eq!(first, vec!["RGL_mock_extension".to_string()]);
    assert_eq!(first, second);
    assert_eq!(count_opcode(&log, op::GET_SUPPORTED_EXTENSIONS), 1);
}

#[test]
fn test_attached_debugger_fetches_compile_results_eagerly() {
    let (mut proxy, log) = remote_proxy(1 << 20);
    let counter = std::sync::Arc::new(AttachCounter::new());
    proxy.set_attach_counter(counter.clone());

    let shader = proxy.create_shader(ShaderKind::Vertex);
    proxy.shader_source(&shader, "void main() {}");

    proxy.compile_shader(&shader);
    assert_eq!(count_opcode(&log, op::GET_SHADER_COMPILE_RESULT), 0);

    counter.increment();
    proxy.compile_shader(&shader);
    assert_eq!(count_opcode(&log, op::GET_SHADER_COMPILE_RESULT), 1);

    counter.decrement();
    assert!(!counter.is_active());
}

#[test]
fn test_read_pixels_round_trip() {
    let (mut proxy, log) = remote_proxy(1 << 20);

    proxy.clear_color(1.0, 0.0, 0.0, 1.0);
    proxy.clear(rgl_protocol::types::ClearMask::COLOR);

    let pixels = proxy.read_pixels(0, 0, 4, 4, PixelFormat::Rgba, PixelType::UnsignedByte);
    assert_eq!(pixels.len(), 4 * 4 * 4);
    assert!(pixels.iter().all(|b| *b == 0xAB));

    // The clear was flushed before the readback.
    let clear = position_of(&log, op::CLEAR).expect("clear");
    let read = position_of(&log, op::READ_PIXELS).expect("read");
    assert!(clear < read);
    assert_eq!(proxy.get_error(), GlError::NoError);
}

#[test]
fn test_negative_read_pixels_is_rejected_locally() {
    let (mut proxy, log) = remote_proxy(1 << 20);

    let pixels = proxy.read_pixels(0, 0, -1, 4, PixelFormat::Rgba, PixelType::UnsignedByte);
    assert!(pixels.is_empty());
    assert_eq!(proxy.get_error(), GlError::InvalidValue);
    assert_eq!(count_opcode(&log, op::READ_PIXELS), 0);
}

#[test]
fn test_flush_is_idempotent() {
    let (mut proxy, log) = remote_proxy(1 << 20);

    proxy.viewport(0, 0, 8, 8);
    proxy.flush();
    proxy.flush();
    proxy.finish();

    assert_eq!(count_opcode(&log, op::VIEWPORT), 1);
    assert_eq!(count_opcode(&log, op::FINISH), 1);
}
