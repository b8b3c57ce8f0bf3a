//! Abstract interpretation over a [`Chunk`]: jump-target validity, running
//! stack depth with per-offset consistency at merge points, constant-pool
//! and local-index bounds, and the function-return depth invariant.
//!
//! The teacher's own verifier (`raya_bytecode::verify`) walks a single
//! linear running depth and cannot detect a depth mismatch where two
//! branches merge on the same offset. This verifier instead keeps a
//! work-list of `(offset, depth)` pairs so every reachable path is checked
//! and disagreements at a shared offset are caught, per the contract this
//! core actually specifies.

use crate::effects::stack_effect;
use crate::VerifyError;
use rustc_hash::{FxHashMap, FxHashSet};
use sola_bytecode::{Chunk, Opcode};

/// Maximum operand-stack depth a chunk may reach.
pub const MAX_STACK_DEPTH: u16 = 256;

/// Maximum local-variable index (locals are addressed with a `u8`-range).
pub const MAX_LOCAL_INDEX: u16 = 255;

struct Instruction {
    offset: usize,
    opcode: Opcode,
    len: usize,
}

/// Verify one chunk. `local_count` bounds `LOAD_LOCAL`/`STORE_LOCAL`
/// indices in addition to the blanket 255 ceiling the spec always applies.
pub fn verify_chunk(chunk: &Chunk, local_count: u16) -> Result<(), VerifyError> {
    let instructions = parse_instructions(chunk)?;
    let boundaries: FxHashSet<usize> = instructions.iter().map(|i| i.offset).collect();
    let jump_targets = collect_jump_targets(chunk, &instructions, &boundaries)?;
    walk(chunk, &instructions, &jump_targets, local_count)
}

fn parse_instructions(chunk: &Chunk) -> Result<Vec<Instruction>, VerifyError> {
    let mut out = Vec::new();
    let mut offset = 0usize;
    while offset < chunk.len() {
        let byte = chunk.code[offset];
        let opcode = Opcode::from_u8(byte).ok_or(VerifyError::InvalidOpcode { offset, byte })?;
        let len = chunk
            .instruction_len_at(offset)
            .ok_or(VerifyError::InvalidOpcode { offset, byte })?;
        if offset + len > chunk.len() {
            return Err(VerifyError::InvalidOpcode { offset, byte });
        }
        out.push(Instruction { offset, opcode, len });
        offset += len;
    }
    Ok(out)
}

/// Resolve the absolute target of a forward jump (`JUMP`, `JUMP_IF_FALSE`,
/// `JUMP_IF_TRUE`): relative to the byte immediately after the immediate.
fn forward_jump_target(chunk: &Chunk, offset: usize) -> i64 {
    let raw = chunk.read_i16(offset + 1) as i64;
    offset as i64 + 3 + raw
}

/// Resolve `LOOP`'s absolute (always backward) target: `ip + 3 - offset`.
fn loop_target(chunk: &Chunk, offset: usize) -> i64 {
    let raw = chunk.read_u16(offset + 1) as i64;
    offset as i64 + 3 - raw
}

fn collect_jump_targets(
    chunk: &Chunk,
    instructions: &[Instruction],
    boundaries: &FxHashSet<usize>,
) -> Result<FxHashSet<usize>, VerifyError> {
    let mut targets = FxHashSet::default();
    for instr in instructions {
        match instr.opcode {
            Opcode::Jump | Opcode::JumpIfFalse | Opcode::JumpIfTrue => {
                let target = forward_jump_target(chunk, instr.offset);
                check_boundary(instr.offset, target, boundaries)?;
                targets.insert(target as usize);
            }
            Opcode::Loop => {
                let target = loop_target(chunk, instr.offset);
                check_boundary(instr.offset, target, boundaries)?;
                targets.insert(target as usize);
            }
            Opcode::EnterTry => {
                let catch_count = chunk.code[instr.offset + 1] as usize;
                let finally_offset = chunk.read_i16(instr.offset + 2);
                let after = (instr.offset + instr.len) as i64;
                if finally_offset != 0 {
                    let target = after + finally_offset as i64;
                    check_boundary(instr.offset, target, boundaries)?;
                    targets.insert(target as usize);
                }
                let mut cursor = instr.offset + 4;
                for _ in 0..catch_count {
                    let catch_offset = chunk.read_i16(cursor + 2);
                    let target = after + catch_offset as i64;
                    check_boundary(instr.offset, target, boundaries)?;
                    targets.insert(target as usize);
                    cursor += 4;
                }
            }
            _ => {}
        }
    }
    Ok(targets)
}

fn check_boundary(
    offset: usize,
    target: i64,
    boundaries: &FxHashSet<usize>,
) -> Result<(), VerifyError> {
    if target < 0 || !boundaries.contains(&(target as usize)) {
        return Err(VerifyError::InvalidJumpTarget { offset, target });
    }
    Ok(())
}

fn walk(
    chunk: &Chunk,
    instructions: &[Instruction],
    jump_targets: &FxHashSet<usize>,
    local_count: u16,
) -> Result<(), VerifyError> {
    let by_offset: FxHashMap<usize, &Instruction> =
        instructions.iter().map(|i| (i.offset, i)).collect();
    let _ = jump_targets; // boundary validity already checked in collect_jump_targets

    let mut visited: FxHashMap<usize, u16> = FxHashMap::default();
    let mut queue: Vec<(usize, u16)> = vec![(0, 0)];

    while let Some((offset, depth)) = queue.pop() {
        if offset >= chunk.len() {
            return Err(VerifyError::FallOffEnd { offset });
        }
        if let Some(&recorded) = visited.get(&offset) {
            if recorded != depth {
                return Err(VerifyError::InconsistentDepth {
                    offset,
                    expected: recorded,
                    found: depth,
                });
            }
            continue;
        }
        visited.insert(offset, depth);

        let instr = by_offset
            .get(&offset)
            .ok_or(VerifyError::InvalidJumpTarget {
                offset,
                target: offset as i64,
            })?;

        let instr_bytes = &chunk.code[offset..offset + instr.len];
        check_operand_bounds(chunk, offset, instr.opcode, instr_bytes, local_count)?;

        let (pops, pushes) = stack_effect(instr.opcode, instr_bytes);
        if depth < pops {
            return Err(VerifyError::StackUnderflow { offset });
        }
        let new_depth = depth - pops + pushes;
        if new_depth > MAX_STACK_DEPTH {
            return Err(VerifyError::StackOverflow {
                offset,
                max: MAX_STACK_DEPTH,
            });
        }

        match instr.opcode {
            Opcode::Return => {
                if depth != 1 {
                    return Err(VerifyError::InvalidReturnDepth { depth });
                }
            }
            Opcode::ReturnNull | Opcode::Halt => {
                if depth != 0 {
                    return Err(VerifyError::InvalidReturnDepth { depth });
                }
            }
            Opcode::Throw => {
                if depth != 1 {
                    return Err(VerifyError::InvalidReturnDepth { depth });
                }
            }
            Opcode::Jump => {
                let target = forward_jump_target(chunk, offset) as usize;
                queue.push((target, new_depth));
            }
            Opcode::JumpIfFalse | Opcode::JumpIfTrue => {
                let target = forward_jump_target(chunk, offset) as usize;
                queue.push((target, new_depth));
                queue.push((offset + instr.len, new_depth));
            }
            Opcode::Loop => {
                let target = loop_target(chunk, offset) as usize;
                queue.push((target, new_depth));
            }
            Opcode::EnterTry => {
                let catch_count = chunk.code[offset + 1] as usize;
                let finally_offset = chunk.read_i16(offset + 2);
                let after = offset + instr.len;
                if finally_offset != 0 {
                    queue.push(((after as i64 + finally_offset as i64) as usize, 0));
                }
                let mut cursor = offset + 4;
                for _ in 0..catch_count {
                    let catch_offset = chunk.read_i16(cursor + 2);
                    queue.push(((after as i64 + catch_offset as i64) as usize, 0));
                    cursor += 4;
                }
                queue.push((after, new_depth));
            }
            _ => {
                queue.push((offset + instr.len, new_depth));
            }
        }
    }

    Ok(())
}

fn check_operand_bounds(
    chunk: &Chunk,
    offset: usize,
    opcode: Opcode,
    bytes: &[u8],
    local_count: u16,
) -> Result<(), VerifyError> {
    let u16_at = |at: usize| -> u16 {
        if bytes.len() >= at + 2 {
            u16::from_be_bytes([bytes[at], bytes[at + 1]])
        } else {
            0
        }
    };

    if matches!(opcode, Opcode::Push) {
        let index = u16_at(1);
        if index as usize >= chunk.constants.len() {
            return Err(VerifyError::InvalidConstantRef {
                offset,
                index,
                pool_len: chunk.constants.len(),
            });
        }
    }

    if matches!(opcode, Opcode::LoadLocal | Opcode::StoreLocal) {
        let index = u16_at(1);
        if index > MAX_LOCAL_INDEX || index >= local_count {
            return Err(VerifyError::InvalidLocalRef { offset, index });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sola_bytecode::{Chunk, Value};

    fn push_const(chunk: &mut Chunk, v: Value) {
        let idx = chunk.add_constant(v);
        chunk.write_op(Opcode::Push, 1);
        chunk.write_u16(idx, 1);
    }

    #[test]
    fn s1_accepts_push_push_add_return() {
        let mut chunk = Chunk::new();
        push_const(&mut chunk, Value::Int(2));
        push_const(&mut chunk, Value::Int(2));
        chunk.write_op(Opcode::Add, 1);
        chunk.write_op(Opcode::Return, 1);
        verify_chunk(&chunk, 0).unwrap();
    }

    #[test]
    fn rejects_stack_underflow() {
        let mut chunk = Chunk::new();
        chunk.write_op(Opcode::Add, 1);
        chunk.write_op(Opcode::Return, 1);
        let err = verify_chunk(&chunk, 0).unwrap_err();
        assert!(matches!(err, VerifyError::StackUnderflow { .. }));
    }

    #[test]
    fn rejects_invalid_jump_target() {
        let mut chunk = Chunk::new();
        chunk.write_op(Opcode::Jump, 1);
        chunk.write_i16(9999, 1);
        let err = verify_chunk(&chunk, 0).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidJumpTarget { .. }));
    }

    #[test]
    fn rejects_constant_index_out_of_bounds() {
        let mut chunk = Chunk::new();
        chunk.write_op(Opcode::Push, 1);
        chunk.write_u16(5, 1);
        chunk.write_op(Opcode::Return, 1);
        let err = verify_chunk(&chunk, 0).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidConstantRef { .. }));
    }

    #[test]
    fn rejects_local_index_beyond_declared_count() {
        let mut chunk = Chunk::new();
        chunk.write_op(Opcode::LoadLocal, 1);
        chunk.write_u16(3, 1);
        chunk.write_op(Opcode::Return, 1);
        let err = verify_chunk(&chunk, 2).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidLocalRef { .. }));
    }

    #[test]
    fn rejects_inconsistent_depth_at_merge_point() {
        // Branch 1: TRUE, JUMP_IF_FALSE -> skip, then PUSH (depth 1) before merge.
        // Branch 2 (fallthrough): depth 0 at the same merge offset. Mismatch.
        let mut chunk = Chunk::new();
        let one = chunk.add_constant(Value::Int(1));
        chunk.write_op(Opcode::True, 1);
        chunk.write_op(Opcode::JumpIfFalse, 1);
        let slot = chunk.reserve_jump(1);
        chunk.write_op(Opcode::Push, 1); // depth becomes 1 on the true branch
        chunk.write_u16(one, 1);
        chunk.patch_jump(slot).unwrap();
        chunk.write_op(Opcode::Return, 1); // merge point expects depth 1 vs 0
        let err = verify_chunk(&chunk, 0).unwrap_err();
        assert!(matches!(err, VerifyError::InconsistentDepth { .. }));
    }

    #[test]
    fn s3_residual_pop_return_underflows() {
        // TRUE, JUMP_IF_FALSE +5, POP, RETURN: JUMP_IF_FALSE already consumes
        // the pushed TRUE, so POP has nothing left to pop on the fallthrough
        // path — the ill-formedness the scenario calls out is present even
        // before the optimizer collapses the TRUE/JUMP_IF_FALSE pair.
        let mut chunk = Chunk::new();
        chunk.write_op(Opcode::True, 1);
        chunk.write_op(Opcode::JumpIfFalse, 1);
        chunk.write_i16(1, 1); // target = RETURN, valid boundary within this chunk
        chunk.write_op(Opcode::Pop, 1);
        chunk.write_op(Opcode::Return, 1);
        let err = verify_chunk(&chunk, 0).unwrap_err();
        assert!(matches!(err, VerifyError::StackUnderflow { .. }));
    }

    #[test]
    fn accepts_return_null_at_depth_zero() {
        let mut chunk = Chunk::new();
        chunk.write_op(Opcode::ReturnNull, 1);
        verify_chunk(&chunk, 0).unwrap();
    }

    #[test]
    fn rejects_fall_off_end_without_terminator() {
        let mut chunk = Chunk::new();
        chunk.write_op(Opcode::Null, 1);
        chunk.write_op(Opcode::Pop, 1);
        let err = verify_chunk(&chunk, 0).unwrap_err();
        assert!(matches!(err, VerifyError::FallOffEnd { .. }));
    }
}
