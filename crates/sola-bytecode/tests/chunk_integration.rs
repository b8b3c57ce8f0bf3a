//! Integration tests exercising `Chunk` end to end: construction, constant
//! pooling, jump patching, and disassembly together.

use sola_bytecode::{Chunk, Opcode, Value};

#[test]
fn s1_two_plus_two_disassembles_and_pools_one_constant() {
    let mut chunk = Chunk::new();
    let k2 = chunk.add_constant(Value::Int(2));
    chunk.write_op(Opcode::Push, 1);
    chunk.write_u16(k2, 1);
    chunk.write_op(Opcode::Push, 1);
    chunk.write_u16(k2, 1);
    chunk.write_op(Opcode::Add, 1);
    chunk.write_op(Opcode::Return, 1);

    assert_eq!(chunk.constants.len(), 1);
    let listing = chunk.disassemble("s1");
    assert!(listing.contains("PUSH"));
    assert!(listing.contains("ADD"));
    assert!(listing.contains("RETURN"));
}

#[test]
fn s6_forward_jump_resolves_within_bounds() {
    let mut chunk = Chunk::new();
    let k = chunk.add_constant(Value::Int(1));
    chunk.write_op(Opcode::Push, 1);
    chunk.write_u16(k, 1);
    chunk.write_op(Opcode::Jump, 1);
    let slot = chunk.reserve_jump(1);
    chunk.write_op(Opcode::Halt, 1);
    chunk.write_op(Opcode::Return, 1);
    chunk.patch_jump(slot).unwrap();

    let target_offset = slot + 2 + chunk.read_i16(slot) as usize;
    assert!(target_offset <= chunk.len());
    assert_eq!(target_offset, chunk.len());
}

#[test]
fn builds_a_realistic_function_body_with_locals_and_arrays() {
    let mut chunk = Chunk::new();
    let greeting = chunk.add_constant(Value::string("hello"));
    chunk.write_op(Opcode::Push, 1);
    chunk.write_u16(greeting, 1);
    chunk.write_op(Opcode::StoreLocal, 1);
    chunk.write_u16(0, 1);
    chunk.write_op(Opcode::NewArray, 2);
    chunk.write_u16(0, 2);
    chunk.write_op(Opcode::LoadLocal, 2);
    chunk.write_u16(0, 2);
    chunk.write_op(Opcode::ArrayPush, 2);
    chunk.write_op(Opcode::ReturnNull, 3);

    let listing = chunk.disassemble("greet");
    assert!(listing.contains("NEW_ARRAY"));
    assert!(listing.contains("'hello'"));
}
