//! Object lifecycle through the proxy: create/bind/delete ordering,
//! at-most-once deletes, kind immutability, and deferred ref-counted
//! deletion.

mod common;

use common::*;

use rgl_protocol::commands::{op, GlCommand, ParamValue};
use rgl_protocol::types::{BufferTarget, BufferUsage, GlError, TextureTarget};
use rgl_protocol::ObjectId;

#[test]
fn test_round_trip_buffer_scenario() {
    let (mut proxy, log) = in_process_proxy();

    let buffer = proxy.create_buffer();
    assert!(buffer.is_usable());

    proxy.bind_buffer(BufferTarget::Array, Some(&buffer));
    proxy.buffer_data(BufferTarget::Array, &[1, 2, 3, 4, 5, 6, 7, 8], BufferUsage::StaticDraw);
    proxy.delete_buffer(&buffer);

    assert_eq!(proxy.get_error(), GlError::NoError);

    // The binding for the target is empty again.
    assert_eq!(
        proxy.get_buffer_binding(BufferTarget::Array),
        Some(ParamValue::Object(ObjectId::NULL))
    );

    // Host saw: create, bind, upload, implicit unbind, delete -- in order.
    let ops: Vec<u32> = logged_opcodes(&log)
        .into_iter()
        .filter(|o| *o != op::CHECK_ERROR)
        .collect();
    assert_eq!(
        ops,
        vec![
            op::CREATE_BUFFER,
            op::BIND_BUFFER,
            op::BUFFER_DATA,
            op::BIND_BUFFER,
            op::DELETE_BUFFER,
        ]
    );

    // The implicit unbind carries the null id.
    let cmds = log.lock();
    match &cmds[3] {
        GlCommand::BindBuffer { buffer, .. } => assert_eq!(*buffer, ObjectId::NULL),
        other => panic!("expected unbind, got {other:?}"),
    }
}

#[test]
fn test_delete_is_at_most_once() {
    let (mut proxy, log) = in_process_proxy();

    let buffer = proxy.create_buffer();
    proxy.delete_buffer(&buffer);
    proxy.delete_buffer(&buffer);

    assert_eq!(count_opcode(&log, op::DELETE_BUFFER), 1);
    assert_eq!(proxy.get_error(), GlError::NoError);
}

#[test]
fn test_unbind_is_ordered_before_delete() {
    let (mut proxy, log) = in_process_proxy();

    let buffer = proxy.create_buffer();
    proxy.bind_buffer(BufferTarget::ElementArray, Some(&buffer));
    proxy.delete_buffer(&buffer);

    let unbind = log
        .lock()
        .iter()
        .position(|c| matches!(c, GlCommand::BindBuffer { buffer, .. } if buffer.is_null()))
        .expect("implicit unbind");
    let delete = position_of(&log, op::DELETE_BUFFER).expect("delete");
    assert!(unbind < delete);

    assert_eq!(
        proxy.get_buffer_binding(BufferTarget::ElementArray),
        Some(ParamValue::Object(ObjectId::NULL))
    );
}

#[test]
fn test_buffer_kind_is_fixed_at_first_bind() {
    let (mut proxy, log) = in_process_proxy();

    let buffer = proxy.create_buffer();
    proxy.bind_buffer(BufferTarget::ElementArray, Some(&buffer));

    let binds_before = count_opcode(&log, op::BIND_BUFFER);
    proxy.bind_buffer(BufferTarget::Array, Some(&buffer));

    assert_eq!(proxy.get_error(), GlError::InvalidOperation);
    // The rejected bind was never encoded and the mirror is unchanged.
    assert_eq!(count_opcode(&log, op::BIND_BUFFER), binds_before);
    assert_eq!(
        proxy.get_buffer_binding(BufferTarget::Array),
        Some(ParamValue::Object(ObjectId::NULL))
    );
}

#[test]
fn test_wrong_kind_handle_is_rejected() {
    let (mut proxy, _log) = in_process_proxy();

    let buffer = proxy.create_buffer();
    proxy.bind_texture(TextureTarget::Texture2D, Some(&buffer));
    assert_eq!(proxy.get_error(), GlError::InvalidOperation);
}

#[test]
fn test_is_buffer_requires_first_bind() {
    let (mut proxy, _log) = in_process_proxy();

    let buffer = proxy.create_buffer();
    assert!(!proxy.is_buffer(&buffer));

    proxy.bind_buffer(BufferTarget::Array, Some(&buffer));
    assert!(proxy.is_buffer(&buffer));

    proxy.delete_buffer(&buffer);
    assert!(!proxy.is_buffer(&buffer));
}

#[test]
fn test_texture_unbind_restores_active_unit() {
    let (mut proxy, log) = in_process_proxy();

    let texture = proxy.create_texture();
    proxy.active_texture(2);
    proxy.bind_texture(TextureTarget::Texture2D, Some(&texture));
    proxy.active_texture(0);
    proxy.delete_texture(&texture);

    // The unbind had to visit unit 2 and come back to unit 0 before the
    // delete.
    let cmds: Vec<GlCommand> = log.lock().clone();
    let delete = cmds
        .iter()
        .position(|c| c.opcode() == op::DELETE_TEXTURE)
        .expect("delete");
    let tail = &cmds[delete - 3..delete];
    assert!(matches!(tail[0], GlCommand::ActiveTexture { unit: 2 }));
    assert!(
        matches!(&tail[1], GlCommand::BindTexture { texture, .. } if texture.is_null())
    );
    assert!(matches!(tail[2], GlCommand::ActiveTexture { unit: 0 }));
    assert_eq!(proxy.get_error(), GlError::NoError);
}

#[test]
fn test_texture_target_is_fixed_at_first_bind() {
    let (mut proxy, _log) = in_process_proxy();

    let texture = proxy.create_texture();
    proxy.bind_texture(TextureTarget::Texture2D, Some(&texture));
    proxy.bind_texture(TextureTarget::CubeMap, Some(&texture));
    assert_eq!(proxy.get_error(), GlError::InvalidOperation);
}

#[test]
fn test_active_program_delete_is_deferred() {
    let (mut proxy, log) = in_process_proxy();

    let program = proxy.create_program();
    proxy.use_program(Some(&program));
    proxy.delete_program(&program);

    // Still in use: the remote delete must not have fired, and the binding
    // is untouched.
    proxy.flush();
    assert_eq!(count_opcode(&log, op::DELETE_PROGRAM), 0);

    // Rebinding releases the last keep-alive; the delete goes out with the
    // next flush.
    proxy.use_program(None);
    proxy.flush();
    assert_eq!(count_opcode(&log, op::DELETE_PROGRAM), 1);
}

#[test]
fn test_attached_shader_delete_waits_for_detach() {
    let (mut proxy, log) = in_process_proxy();

    let program = proxy.create_program();
    let shader = proxy.create_shader(rgl_protocol::types::ShaderKind::Vertex);
    proxy.attach_shader(&program, &shader);

    proxy.delete_shader(&shader);
    proxy.flush();
    assert_eq!(count_opcode(&log, op::DELETE_SHADER), 0);

    proxy.detach_shader(&program, &shader);
    proxy.flush();
    assert_eq!(count_opcode(&log, op::DELETE_SHADER), 1);
}

#[test]
fn test_opaque_framebuffer_delete_needs_permission() {
    let (mut proxy, log) = in_process_proxy();

    let fb = proxy.create_opaque_framebuffer();
    proxy.delete_framebuffer(&fb, false);
    assert_eq!(proxy.get_error(), GlError::InvalidOperation);
    assert_eq!(count_opcode(&log, op::DELETE_FRAMEBUFFER), 0);

    proxy.delete_framebuffer(&fb, true);
    assert_eq!(proxy.get_error(), GlError::NoError);
    assert_eq!(count_opcode(&log, op::DELETE_FRAMEBUFFER), 1);
}

#[test]
fn test_deleted_texture_detaches_from_bound_framebuffer() {
    let (mut proxy, log) = in_process_proxy();

    let fb = proxy.create_framebuffer();
    let texture = proxy.create_texture();
    proxy.bind_framebuffer(rgl_protocol::types::FramebufferTarget::Framebuffer, Some(&fb));
    proxy.bind_texture(TextureTarget::Texture2D, Some(&texture));
    proxy.framebuffer_texture_2d(
        rgl_protocol::types::FramebufferTarget::Framebuffer,
        rgl_protocol::types::Attachment::Color(0),
        Some(&texture),
        0,
    );

    proxy.delete_texture(&texture);

    // A detach with the null id must precede the delete.
    let cmds = log.lock();
    let detach = cmds
        .iter()
        .position(|c| {
            matches!(c, GlCommand::FramebufferTexture2D { texture, .. } if texture.is_null())
        })
        .expect("detach");
    let delete = cmds
        .iter()
        .position(|c| c.opcode() == op::DELETE_TEXTURE)
        .expect("delete");
    assert!(detach < delete);
}

#[test]
fn test_indexed_binding_cleared_on_delete() {
    let (mut proxy, log) = in_process_proxy();

    let buffer = proxy.create_buffer();
    proxy.bind_buffer_base(
        rgl_protocol::types::IndexedBufferTarget::Uniform,
        1,
        Some(&buffer),
    );
    proxy.delete_buffer(&buffer);

    let cmds = log.lock();
    let unbind = cmds
        .iter()
        .position(|c| {
            matches!(
                c,
                GlCommand::BindBufferBase { index: 1, buffer, .. } if buffer.is_null()
            )
        })
        .expect("indexed unbind");
    let delete = cmds
        .iter()
        .position(|c| c.opcode() == op::DELETE_BUFFER)
        .expect("delete");
    assert!(unbind < delete);
}

#[test]
fn test_uniform_requires_program_in_use() {
    let (mut proxy, _log) = in_process_proxy();

    let program = proxy.create_program();
    proxy.link_program(&program);
    let location = proxy
        .get_uniform_location(&program, "u_color")
        .expect("location");

    proxy.uniform_4f(location, [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(proxy.get_error(), GlError::InvalidOperation);

    proxy.use_program(Some(&program));
    proxy.uniform_4f(location, [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(proxy.get_error(), GlError::NoError);
}

#[test]
fn test_buffer_readback_round_trip() {
    let (mut proxy, _log) = in_process_proxy();

    let buffer = proxy.create_buffer();
    proxy.bind_buffer(BufferTarget::Array, Some(&buffer));
    let vertices: [f32; 4] = [0.5, -0.5, 0.25, 1.0];
    proxy.buffer_data(
        BufferTarget::Array,
        bytemuck::cast_slice(&vertices),
        BufferUsage::StaticDraw,
    );

    let back = proxy.get_buffer_sub_data(BufferTarget::Array, 4, 8);
    let values: Vec<f32> = bytemuck::pod_collect_to_vec(&back);
    assert_eq!(values, &vertices[1..3]);
}
