//! Record-stream round trips: encode a batch of commands, decode it back,
//! and verify headers, ordering, and bulk-payload compression.

use rgl_protocol::bulk::{BulkBytes, COMPRESSION_THRESHOLD};
use rgl_protocol::commands::{op, GlCommand};
use rgl_protocol::handle::ObjectId;
use rgl_protocol::types::{BufferTarget, BufferUsage};
use rgl_protocol::wire::{encode_record, RecordReader, RECORD_HEADER_SIZE};

#[test]
fn test_single_record_roundtrip() {
    let cmd = GlCommand::CreateBuffer { id: ObjectId(7) };

    let mut buf = Vec::new();
    let written = encode_record(&mut buf, &cmd).expect("encode");
    assert_eq!(written, buf.len());
    assert!(written > RECORD_HEADER_SIZE);

    // Header fields are little-endian opcode + payload length.
    let opcode = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let payload_len = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    assert_eq!(opcode, op::CREATE_BUFFER);
    assert_eq!(payload_len as usize, buf.len() - RECORD_HEADER_SIZE);

    let decoded: Vec<_> = RecordReader::new(&buf).collect::<Result<_, _>>().expect("decode");
    assert_eq!(decoded, vec![cmd]);
}

#[test]
fn test_batch_preserves_order() {
    let cmds = vec![
        GlCommand::CreateBuffer { id: ObjectId(1) },
        GlCommand::BindBuffer {
            target: BufferTarget::Array,
            buffer: ObjectId(1),
        },
        GlCommand::BufferData {
            target: BufferTarget::Array,
            data: BulkBytes::pack(&[1, 2, 3, 4]),
            usage: BufferUsage::StaticDraw,
        },
        GlCommand::DeleteBuffer { id: ObjectId(1) },
    ];

    let mut buf = Vec::new();
    for cmd in &cmds {
        encode_record(&mut buf, cmd).expect("encode");
    }

    let decoded: Vec<_> = RecordReader::new(&buf).collect::<Result<_, _>>().expect("decode");
    assert_eq!(decoded, cmds);
}

#[test]
fn test_truncated_batch_is_an_error() {
    let mut buf = Vec::new();
    encode_record(&mut buf, &GlCommand::Finish).expect("encode");
    buf.truncate(buf.len() - 1);

    let mut reader = RecordReader::new(&buf);
    assert!(reader.next().expect("one record").is_err());
    // A decode error terminates the batch.
    assert!(reader.next().is_none());
}

#[test]
fn test_bulk_bytes_compresses_large_payloads() {
    let big = vec![0u8; COMPRESSION_THRESHOLD * 16];
    let packed = BulkBytes::pack(&big);
    assert!(packed.is_compressed());
    assert!(packed.wire_len() < big.len());
    assert_eq!(packed.unpack().expect("unpack").as_ref(), big.as_slice());

    let small = [1u8, 2, 3];
    let packed = BulkBytes::pack(&small);
    assert!(!packed.is_compressed());
    assert_eq!(packed.unpack().expect("unpack").as_ref(), &small);
}

#[test]
fn test_bulk_bytes_pack_slice() {
    let vertices: [f32; 6] = [0.0, 0.5, -0.5, -0.5, 0.5, -0.5];
    let packed = BulkBytes::pack_slice(&vertices);
    let bytes = packed.unpack().expect("unpack");
    assert_eq!(bytes.len(), vertices.len() * 4);
    let back: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);
    assert_eq!(back, &vertices);
}

#[test]
fn test_sync_commands_classified() {
    assert!(!GlCommand::CreateBuffer { id: ObjectId(1) }.is_sync());
    assert!(!GlCommand::Clear { mask: 0b1 }.is_sync());
    assert!(GlCommand::CheckError.is_sync());
    assert!(GlCommand::Finish.is_sync());
    assert!(GlCommand::GetUniformLocation {
        program: ObjectId(1),
        name: "u_color".to_string(),
    }
    .is_sync());
}
