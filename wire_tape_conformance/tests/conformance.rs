// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(missing_docs, reason = "integration test crate")]

use wire_tape::asm::{Asm, ProgramBuilder};
use wire_tape::gateway::Mode;
use wire_tape::keys::{KeyId, KeyTable};
use wire_tape::opcode::Opcode;
use wire_tape::program::{LoadError, Program};
use wire_tape::trace::TraceMask;
use wire_tape::verifier::{VerifyConfig, VerifyError, verify_program};
use wire_tape::vm::{ErrorKind, Fault, Limits, Vm};

use wire_tape_conformance::{Call, Tape, Value, decode, encode};

fn raw(asm: Asm) -> Program {
    Program::new(asm.finish(), KeyTable::new())
}

#[test]
fn golden_packaged_image_bytes_v1() {
    let mut pb = ProgramBuilder::new();
    let id = pb.key("id");
    let name = pb.key("name");
    pb.asm().io_u16(id).str_u8(name);
    let p = pb.build().unwrap();

    // Locks in the container encoding as a regression signal for format changes.
    let expected: &[u8] = &[
        // magic "CNDIL"
        0x43, 0x4E, 0x44, 0x49, 0x4C, //
        // version
        0x01, //
        // string count
        0x02, 0x00, //
        // string table offset
        0x10, 0x00, 0x00, 0x00, //
        // bytecode offset
        0x18, 0x00, 0x00, 0x00, //
        // "id\0name\0"
        b'i', b'd', 0x00, b'n', b'a', b'm', b'e', 0x00, //
        // io_u16 #0; str_u8 #1
        0x11, 0x00, 0x00, 0x31, 0x01, 0x00,
    ];
    let image = p.encode_image();
    assert_eq!(image, expected);

    let back = Program::load(&image).unwrap();
    assert_eq!(back, p);
    assert_eq!(back.version(), 1);
    assert_eq!(back.key_name(KeyId(1)), Some("name"));
}

#[test]
fn loader_rejects_malformed_images() {
    let mut image = ProgramBuilder::new().build().unwrap().encode_image();
    assert_eq!(
        Program::load(&image[..10]),
        Err(LoadError::TooShort { len: 10 })
    );
    image[5] = 2;
    assert_eq!(
        Program::load(&image),
        Err(LoadError::UnsupportedVersion { version: 2 })
    );

    // Bytes without the magic tag are raw bytecode.
    let p = Program::load(&[0x10, 0x03, 0x00]).unwrap();
    assert_eq!(p.version(), 0);
    assert!(p.keys().is_empty());
    assert_eq!(p.bytecode(), [0x10, 0x03, 0x00]);
}

#[test]
fn bitfields_fill_from_lsb() {
    let mut a = Asm::new();
    a.bit_u(KeyId(1), 4).bit_u(KeyId(2), 6).bit_u(KeyId(3), 6);
    let p = raw(a);

    let mut buf = [0_u8; 2];
    let (summary, tape) = encode(
        &p,
        [Value::Uint(0xF), Value::Uint(0x2A), Value::Uint(0x15)],
        &mut buf,
    )
    .unwrap();
    assert_eq!(buf, [0xAF, 0x56]);
    assert_eq!(summary.bytes, 2);
    assert_eq!(tape.remaining(), 0);

    assert_eq!(
        decode(&p, &mut buf).unwrap(),
        [Value::Uint(0xF), Value::Uint(0x2A), Value::Uint(0x15)]
    );
}

#[test]
fn signed_bitfields_pack_and_sign_extend() {
    let mut a = Asm::new();
    a.bit_i(KeyId(1), 3).bit_i(KeyId(2), 3).bit_i(KeyId(3), 3);
    let p = raw(a);

    let mut buf = [0_u8; 2];
    let (summary, _) = encode(
        &p,
        [Value::Int(3), Value::Int(-1), Value::Int(-4)],
        &mut buf,
    )
    .unwrap();
    assert_eq!(buf, [0x3B, 0x01]);
    // Nine bits touch two bytes.
    assert_eq!(summary.bytes, 2);

    assert_eq!(
        decode(&p, &mut buf).unwrap(),
        [Value::Int(3), Value::Int(-1), Value::Int(-4)]
    );
}

#[test]
fn bit_run_then_aligned_byte_matches_hand_packing() {
    let values = [
        Value::Uint(0b101),
        Value::Uint(0b1_0001),
        Value::Uint(0b1001),
        Value::Uint(0x7E),
    ];
    let program = |big: bool| {
        let mut a = Asm::new();
        if big {
            a.endian_be();
        }
        a.bit_u(KeyId(0), 3)
            .bit_u(KeyId(1), 5)
            .bit_u(KeyId(2), 4)
            .io_u8(KeyId(3));
        raw(a)
    };

    // 3 + 5 bits fill byte 0, the 4-bit field starts byte 1 and `io_u8` realigns to byte 2.
    let mut le = [0_u8; 3];
    encode(&program(false), values.clone(), &mut le).unwrap();
    assert_eq!(le, [0x8D, 0x09, 0x7E]);

    // Byte order does not affect bit packing.
    let mut be = [0_u8; 3];
    encode(&program(true), values.clone(), &mut be).unwrap();
    assert_eq!(be, le);

    assert_eq!(decode(&program(true), &mut be).unwrap(), values);
}

#[test]
fn length_prefixes_and_terminators() {
    let mut pb = ProgramBuilder::new();
    let [a, b, c, d, xs, x, ys, y] =
        ["a", "b", "c", "d", "xs", "x", "ys", "y"].map(|n| pb.key(n));
    pb.asm()
        .str_u8(a)
        .str_u16(b)
        .str_u32(c)
        .str_null(d, 4)
        .arr_u16(xs)
        .io_u8(x)
        .arr_end()
        .endian_be()
        .arr_u32(ys)
        .io_u8(y)
        .arr_end();
    let p = pb.build_verified().unwrap().into_program();

    let mut buf = [0_u8; 32];
    let (summary, _) = encode(
        &p,
        [
            Value::Text("hi".into()),
            Value::Text("abc".into()),
            Value::Text(String::new()),
            Value::Text("wxyz!!".into()),
            Value::Count(3),
            Value::Uint(1),
            Value::Uint(2),
            Value::Uint(3),
            Value::Count(2),
            Value::Uint(9),
            Value::Uint(8),
        ],
        &mut buf,
    )
    .unwrap();
    let expected: &[u8] = &[
        0x02, b'h', b'i', //
        0x03, 0x00, b'a', b'b', b'c', //
        0x00, 0x00, 0x00, 0x00, //
        b'w', b'x', b'y', b'z', 0x00, //
        0x03, 0x00, 0x01, 0x02, 0x03, //
        0x00, 0x00, 0x00, 0x02, 0x09, 0x08,
    ];
    assert_eq!(summary.bytes, expected.len());
    assert_eq!(&buf[..summary.bytes], expected);

    // `str_null` keeps only `max_len` body bytes.
    assert_eq!(
        decode(&p, &mut buf[..summary.bytes]).unwrap(),
        [
            Value::Text("hi".into()),
            Value::Text("abc".into()),
            Value::Text(String::new()),
            Value::Text("wxyz".into()),
            Value::Count(3),
            Value::Uint(1),
            Value::Uint(2),
            Value::Uint(3),
            Value::Count(2),
            Value::Uint(9),
            Value::Uint(8),
        ]
    );
}

#[test]
fn out_of_bounds_never_writes_past_the_end() {
    let mut a = Asm::new();
    a.io_u16(KeyId(0)).io_u16(KeyId(1));
    let p = raw(a);

    let mut buf = [0xEE_u8; 3];
    let err = encode(&p, [Value::Uint(0x1111), Value::Uint(0x2222)], &mut buf).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfBounds);
    assert_eq!(err.kind().code(), 1);
    assert_eq!(err.ip, 3);
    assert_eq!(err.opcode, Some(Opcode::IoU16));
    assert_eq!(buf, [0x11, 0x11, 0xEE]);

    let mut short = [0_u8; 1];
    let mut a = Asm::new();
    a.bit_u(KeyId(0), 12);
    let err = decode(&raw(a), &mut short).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfBounds);
}

#[test]
fn nesting_overflows_at_the_exceeding_instruction() {
    let mut a = Asm::new();
    a.enter_struct(KeyId(0))
        .enter_struct(KeyId(1))
        .enter_struct(KeyId(2))
        .exit_struct()
        .exit_struct()
        .exit_struct();
    let p = raw(a);

    let limits = Limits {
        max_scope_depth: 2,
        ..Limits::default()
    };
    let mut vm = Vm::new(Tape::decoder(), limits);
    let err = vm
        .run(&p, &mut [], Mode::Decode, TraceMask::NONE, None)
        .unwrap_err();
    assert_eq!(err.ip, 6);
    assert_eq!(err.fault, Fault::ScopeOverflow { max: 2 });
    assert_eq!(err.kind(), ErrorKind::StackOverflow);

    // Two enters were notified before the fault.
    let enters = vm
        .gateway()
        .calls()
        .iter()
        .filter(|c| c.opcode == Opcode::EnterStruct)
        .count();
    assert_eq!(enters, 2);

    assert!(decode(&p, &mut []).unwrap().is_empty());

    let mut a = Asm::new();
    a.arr_end();
    let err = decode(&raw(a), &mut []).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StackUnderflow);
    assert_eq!(err.ip, 0);
}

#[test]
fn exit_past_the_outermost_struct_terminates() {
    let mut a = Asm::new();
    a.enter_struct(KeyId(0))
        .io_u8(KeyId(1))
        .exit_struct()
        .exit_struct()
        .io_u8(KeyId(2));
    let p = raw(a);

    let mut buf = [0_u8; 1];
    let (summary, tape) = encode(&p, [Value::Uint(7)], &mut buf).unwrap();
    assert_eq!(summary.bytes, 1);
    assert_eq!(buf, [7]);
    assert!(tape.calls().iter().all(|c| c.key != KeyId(2)));

    assert_eq!(decode(&p, &mut buf).unwrap(), [Value::Uint(7)]);
}

#[test]
fn endianness_switches_mid_program() {
    let mut a = Asm::new();
    a.endian_be()
        .io_u16(KeyId(0))
        .endian_le()
        .io_u16(KeyId(1))
        .endian_be()
        .io_u32(KeyId(2));
    let p = raw(a);

    let values = [
        Value::Uint(0x1234),
        Value::Uint(0x1234),
        Value::Uint(0x0A0B_0C0D),
    ];
    let mut buf = [0_u8; 8];
    encode(&p, values.clone(), &mut buf).unwrap();
    assert_eq!(buf, [0x12, 0x34, 0x34, 0x12, 0x0A, 0x0B, 0x0C, 0x0D]);
    assert_eq!(decode(&p, &mut buf).unwrap(), values);
}

#[test]
fn arr_eof_inside_an_array_is_rejected() {
    let mut a = Asm::new();
    a.arr_fixed(KeyId(0), 1)
        .arr_eof(KeyId(1))
        .io_u8(KeyId(2))
        .arr_end()
        .arr_end();
    let p = raw(a);

    let err = decode(&p, &mut [1, 2]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOp);
    assert_eq!(err.ip, 7);

    assert_eq!(
        verify_program(&p, &VerifyConfig::default()),
        Err(VerifyError::NestedEofArray { ip: 7 })
    );
}

#[test]
fn arr_eof_repeats_until_the_buffer_ends() {
    let mut a = Asm::new();
    a.arr_eof(KeyId(0)).io_u16(KeyId(1)).arr_end();
    let p = raw(a);

    let mut buf = [0_u8; 4];
    encode(
        &p,
        [Value::Count(2), Value::Uint(1), Value::Uint(2)],
        &mut buf,
    )
    .unwrap();
    assert_eq!(buf, [0x01, 0x00, 0x02, 0x00]);

    // Decode learns the count from the buffer length alone.
    assert_eq!(
        decode(&p, &mut buf).unwrap(),
        [Value::Uint(1), Value::Uint(2)]
    );
}

#[test]
fn dynamic_array_count_comes_from_a_bound_field() {
    let mut pb = ProgramBuilder::new();
    let n = pb.key("n");
    let items = pb.key("items");
    let item = pb.key("item");
    pb.asm()
        .io_u8(n)
        .arr_dynamic(items, n)
        .io_u16(item)
        .arr_end();
    let p = pb.build_verified().unwrap().into_program();

    let values = [Value::Uint(2), Value::Uint(0x0102), Value::Uint(0x0304)];
    let mut buf = [0_u8; 5];
    let (_, tape) = encode(&p, values.clone(), &mut buf).unwrap();
    assert_eq!(buf, [0x02, 0x02, 0x01, 0x04, 0x03]);
    assert!(tape.calls().contains(&Call {
        key: n,
        opcode: Opcode::CtxQuery,
    }));

    assert_eq!(decode(&p, &mut buf).unwrap(), values);
}

#[test]
fn ctx_query_leaves_the_cursor_in_place() {
    let mut pb = ProgramBuilder::new();
    let len = pb.key("len");
    let tag = pb.key("tag");
    pb.asm().io_u8(len).ctx_query(len).io_u8(tag);
    let p = pb.build_verified().unwrap().into_program();

    let values = [Value::Uint(3), Value::Uint(9)];
    let mut buf = [0xEE_u8; 3];
    let (summary, tape) = encode(&p, values.clone(), &mut buf).unwrap();
    assert_eq!(summary.bytes, 2);
    assert_eq!(buf, [3, 9, 0xEE]);
    assert_eq!(
        tape.calls(),
        [
            Call {
                key: len,
                opcode: Opcode::IoU8,
            },
            Call {
                key: len,
                opcode: Opcode::CtxQuery,
            },
            Call {
                key: tag,
                opcode: Opcode::IoU8,
            },
        ]
    );

    assert_eq!(decode(&p, &mut buf).unwrap(), values);
}

#[test]
fn align_pad_skips_and_align_fill_writes() {
    let mut pb = ProgramBuilder::new();
    let lo = pb.key("lo");
    let flag = pb.key("flag");
    let tail = pb.key("tail");
    pb.asm()
        .bit_u(lo, 2)
        .align_pad(3)
        .align_fill(true)
        .bit_u(flag, 1)
        .align_fill(false)
        .io_u8(tail);
    let p = pb.build_verified().unwrap().into_program();

    let values = [Value::Uint(0b10), Value::Uint(1), Value::Uint(0x42)];
    // Sentinel bits 2..5 of byte 0 are 1,0,1; bits 5..8 are clear.
    let mut buf = [0x14_u8, 0xEE, 0x00];
    let (summary, _) = encode(&p, values.clone(), &mut buf).unwrap();
    assert_eq!(summary.bytes, 3);
    // 0x02 from `lo`, 0x14 kept by align_pad, 0xE0 set by align_fill.
    assert_eq!(buf, [0xF6, 0x01, 0x42]);

    assert_eq!(decode(&p, &mut buf).unwrap(), values);
}

#[test]
fn dynamic_array_count_must_be_scalar() {
    let mut a = Asm::new();
    a.str_u8(KeyId(0))
        .arr_dynamic(KeyId(1), KeyId(0))
        .io_u8(KeyId(2))
        .arr_end();
    let p = raw(a);

    let mut vm = Vm::new(Tape::decoder().with_context(KeyId(0), 1), Limits::default());
    let err = vm
        .run(&p, &mut [1, b'a', 7], Mode::Decode, TraceMask::NONE, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOp);
    assert_eq!(err.opcode, Some(Opcode::ArrDynamic));
}

#[test]
fn empty_arrays_skip_their_body_and_still_end() {
    let mut pb = ProgramBuilder::new();
    let items = pb.key("items");
    let item = pb.key("item");
    let tail = pb.key("tail");
    pb.asm().arr_u8(items).io_u8(item).arr_end().io_u8(tail);
    let p = pb.build_verified().unwrap().into_program();

    let mut vm = Vm::new(Tape::decoder(), Limits::default());
    vm.run(&p, &mut [0, 9], Mode::Decode, TraceMask::NONE, None)
        .unwrap();
    let tape = vm.into_gateway();
    assert_eq!(tape.values(), [Value::Count(0), Value::Uint(9)]);
    assert_eq!(
        tape.calls(),
        [
            Call {
                key: items,
                opcode: Opcode::ArrU8,
            },
            Call {
                key: items,
                opcode: Opcode::ArrEnd,
            },
            Call {
                key: tail,
                opcode: Opcode::IoU8,
            },
        ]
    );
}

#[test]
fn optional_fields_may_be_absent() {
    let mut a = Asm::new();
    a.io_u8(KeyId(0)).mark_optional().io_u16(KeyId(1));
    let p = raw(a);

    assert_eq!(
        decode(&p, &mut [7, 1]).unwrap(),
        [Value::Uint(7), Value::Absent]
    );

    let mut buf = [0_u8; 3];
    let (summary, _) = encode(&p, [Value::Uint(7), Value::Absent], &mut buf).unwrap();
    assert_eq!(summary.bytes, 1);
    assert_eq!(buf, [7, 0, 0]);

    // Without the marker a missing value is a gateway fault.
    let mut a = Asm::new();
    a.io_u8(KeyId(0)).io_u16(KeyId(1));
    let err = encode(&raw(a), [Value::Uint(7)], &mut buf).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Gateway);
}

#[test]
fn constants_are_written_and_checked() {
    let mut pb = ProgramBuilder::new();
    let magic = pb.key("magic");
    pb.asm()
        .endian_be()
        .const_check(magic, Opcode::IoU16, 0xCAFE)
        .const_write(Opcode::IoU8, 0x7F);
    let p = pb.build_verified().unwrap().into_program();

    let mut buf = [0_u8; 3];
    let (summary, _) = encode(&p, std::iter::empty(), &mut buf).unwrap();
    assert_eq!(summary.bytes, 3);
    assert_eq!(buf, [0xCA, 0xFE, 0x7F]);
    assert!(decode(&p, &mut buf).unwrap().is_empty());

    let err = decode(&p, &mut [0xCA, 0xFF, 0x7F]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.ip, 1);
}

#[test]
fn lossy_transforms_decode_forward_of_inverse() {
    let mut a = Asm::new();
    a.trans_mul(2).io_u8(KeyId(0));
    let p = raw(a);

    let mut buf = [0_u8; 1];
    encode(&p, [Value::Int(11)], &mut buf).unwrap();
    assert_eq!(buf, [5]);
    assert_eq!(decode(&p, &mut buf).unwrap(), [Value::Int(10)]);

    let mut a = Asm::new();
    a.scale_lin(0.5, -40.0).io_u8(KeyId(0));
    let p = raw(a);
    encode(&p, [Value::Float(-10.0)], &mut buf).unwrap();
    assert_eq!(buf, [60]);
    assert_eq!(decode(&p, &mut buf).unwrap(), [Value::Float(-10.0)]);
}

#[test]
fn checksums_match_known_answers() {
    let mut a = Asm::new();
    a.raw_bytes(KeyId(0), 9)
        .crc32(0x04C1_1DB7, 0xFFFF_FFFF, 0xFFFF_FFFF, 0b11);
    let p = raw(a);
    let mut buf = [0_u8; 13];
    encode(&p, [Value::Bytes(b"123456789".to_vec())], &mut buf).unwrap();
    assert_eq!(buf[9..], [0x26, 0x39, 0xF4, 0xCB]);
    assert_eq!(
        decode(&p, &mut buf).unwrap(),
        [Value::Bytes(b"123456789".to_vec())]
    );

    buf[0] = b'0';
    let err = decode(&p, &mut buf).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut a = Asm::new();
    a.endian_be()
        .raw_bytes(KeyId(0), 9)
        .crc16(0x1021, 0xFFFF, 0x0000, 0);
    let mut buf = [0_u8; 11];
    encode(&raw(a), [Value::Bytes(b"123456789".to_vec())], &mut buf).unwrap();
    assert_eq!(buf[9..], [0x29, 0xB1]);
}

#[test]
fn unknown_opcodes_are_invalid_operations() {
    let p = Program::from_bytecode(&[0x00, 0xEE]);
    let err = decode(&p, &mut []).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOp);
    assert_eq!(err.ip, 1);
    assert_eq!(err.opcode, None);
}

#[test]
fn telemetry_frame_round_trips() {
    let mut pb = ProgramBuilder::new();
    let [frame, magic, seq, temp, ratio, ok, ch, flag, delta, name, mac, pts, pt, x, y] = [
        "frame", "magic", "seq", "temp", "ratio", "ok", "ch", "flag", "delta", "name", "mac",
        "pts", "pt", "x", "y",
    ]
    .map(|n| pb.key(n));
    pb.asm()
        .endian_be()
        .enter_struct(frame)
        .const_check(magic, Opcode::IoU16, 0xF00D)
        .io_u32(seq)
        .io_i16(temp)
        .io_f32(ratio)
        .io_bool(ok)
        .bit_u(ch, 3)
        .bit_bool(flag)
        .bit_i(delta, 4)
        .str_u8(name)
        .raw_bytes(mac, 6)
        .arr_u8(pts)
        .enter_struct(pt)
        .io_i8(x)
        .io_i8(y)
        .exit_struct()
        .arr_end()
        .exit_struct()
        .crc16(0x1021, 0xFFFF, 0x0000, 0);
    let p = pb.build_verified().unwrap();

    let values = vec![
        Value::Uint(7),
        Value::Int(-300),
        Value::Float(0.5),
        Value::Bool(true),
        Value::Uint(5),
        Value::Bool(true),
        Value::Int(-3),
        Value::Text("node-1".into()),
        Value::Bytes(vec![1, 2, 3, 4, 5, 6]),
        Value::Count(2),
        Value::Int(1),
        Value::Int(-1),
        Value::Int(2),
        Value::Int(-2),
    ];
    let mut buf = [0_u8; 64];
    let (summary, tape) = encode(p.program(), values.clone(), &mut buf).unwrap();
    assert_eq!(summary.bytes, 34);
    assert_eq!(tape.remaining(), 0);
    assert_eq!(buf[..2], [0xF0, 0x0D]);

    assert_eq!(
        decode(p.program(), &mut buf[..summary.bytes]).unwrap(),
        values
    );
}
