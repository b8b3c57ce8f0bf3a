use sola_bytecode::{Chunk, Opcode, Value};
use sola_optimize::optimize_chunk;
use sola_verify::verify_chunk;

/// S6 from the spec: `PUSH k, JUMP +5, HALT, ..., RETURN` — the jump
/// target is not itself a `JUMP`, so jump threading must leave it alone,
/// and the optimized chunk must still verify.
#[test]
fn s6_jump_to_a_non_jump_target_survives_optimization_and_reverifies() {
    let mut chunk = Chunk::new();
    let k = chunk.add_constant(Value::Int(7));
    chunk.write_op(Opcode::Push, 1);
    chunk.write_u16(k, 1);
    chunk.write_op(Opcode::Jump, 1);
    let slot = chunk.reserve_jump(1);
    chunk.write_op(Opcode::Halt, 1);
    chunk.patch_jump(slot).unwrap();
    chunk.write_op(Opcode::Pop, 1);
    chunk.write_op(Opcode::ReturnNull, 1);

    verify_chunk(&chunk, 0).unwrap();
    let (rebuilt, _report) = optimize_chunk(&chunk);
    verify_chunk(&rebuilt, 0).unwrap();
}

/// A realistic function body exercising propagation, peephole deletion, and
/// constant folding together: the optimized output must still verify and
/// must be no larger than the input.
#[test]
fn realistic_function_body_shrinks_and_reverifies() {
    let mut chunk = Chunk::new();
    let two = chunk.add_constant(Value::Int(2));
    let three = chunk.add_constant(Value::Int(3));

    // local 0 = 2
    chunk.write_op(Opcode::Push, 1);
    chunk.write_u16(two, 1);
    chunk.write_op(Opcode::StoreLocal, 1);
    chunk.write_u16(0, 1);

    // local 1 = local 0 (copy)
    chunk.write_op(Opcode::LoadLocal, 2);
    chunk.write_u16(0, 2);
    chunk.write_op(Opcode::StoreLocal, 2);
    chunk.write_u16(1, 2);

    // push local 1, push 3, add, pop (dead computation, fully foldable)
    chunk.write_op(Opcode::LoadLocal, 3);
    chunk.write_u16(1, 3);
    chunk.write_op(Opcode::Push, 3);
    chunk.write_u16(three, 3);
    chunk.write_op(Opcode::Add, 3);
    chunk.write_op(Opcode::Pop, 3);

    chunk.write_op(Opcode::ReturnNull, 4);

    verify_chunk(&chunk, 2).unwrap();
    let original_len = chunk.len();
    let (rebuilt, report) = optimize_chunk(&chunk);
    verify_chunk(&rebuilt, 2).unwrap();
    assert!(rebuilt.len() <= original_len);
    assert!(report.optimization_count > 0);
}

/// Dead code after an unconditional return is reported but the verified,
/// optimized chunk is still exactly as long as it started (detect-only).
#[test]
fn dead_code_after_return_is_reported_not_rewritten() {
    let mut chunk = Chunk::new();
    chunk.write_op(Opcode::ReturnNull, 1);
    chunk.write_op(Opcode::Pop, 1);
    chunk.write_op(Opcode::ReturnNull, 1);

    let (_rebuilt, report) = optimize_chunk(&chunk);
    assert_eq!(report.dead_code.unreachable_offsets.len(), 2);
}
