//! The optimizer's working representation: a chunk decoded into a flat list
//! of [`Instr`], each still tied to its original byte offset so that every
//! pass can delete, replace, or retarget instructions without manually
//! doing jump-offset arithmetic at every step. Arithmetic happens exactly
//! once, in [`encode`], when the surviving instructions are laid back out
//! into bytes.

use sola_bytecode::{Chunk, Opcode, Value};

/// One decoded instruction, carrying enough information to re-derive its
/// exact byte encoding, plus the *original* absolute offsets any branch
/// operand pointed to (not yet relative, not yet re-targeted to new
/// offsets — that happens only in [`encode`]).
#[derive(Debug, Clone)]
pub struct Instr {
    pub op: Opcode,
    /// Offset of this instruction's first byte in the chunk being optimized.
    /// Stable identity used by [`encode`] to resolve old jump targets to new
    /// offsets; never reassigned mid-pipeline.
    pub old_offset: usize,
    pub line: u32,
    pub args: Args,
}

/// An instruction's decoded operands. Branch-carrying opcodes store their
/// target(s) as **absolute old byte offsets**, not relative encodings —
/// every pass operates on this stable representation.
#[derive(Debug, Clone)]
pub enum Args {
    None,
    U8(u8),
    U16(u16),
    U16U8(u16, u8),
    U16U16(u16, u16),
    U16U16U8(u16, u16, u8),
    Jump { target: usize },
    Loop { target: usize },
    EnterTry {
        finally: Option<usize>,
        catches: Vec<(u16, usize)>,
    },
    SuperArrayNew { count: u16, markers: Vec<u8> },
}

/// Decode a chunk into its instruction list. Optimizer passes only ever run
/// on chunks that have already passed [`sola_verify::verify_chunk`], so this
/// assumes well-formed input and panics on malformed bytes rather than
/// returning a `Result` — the verifier is the gate, not this decoder.
pub fn decode(chunk: &Chunk) -> Vec<Instr> {
    let mut out = Vec::new();
    let mut offset = 0usize;
    while offset < chunk.len() {
        let byte = chunk.code[offset];
        let op = Opcode::from_u8(byte).expect("unverified chunk passed to optimizer");
        let line = chunk.lines.get(offset).copied().unwrap_or(0);
        let len = chunk
            .instruction_len_at(offset)
            .expect("unverified chunk passed to optimizer");
        let args = decode_args(chunk, offset, op);
        out.push(Instr {
            op,
            old_offset: offset,
            line,
            args,
        });
        offset += len;
    }
    out
}

fn decode_args(chunk: &Chunk, offset: usize, op: Opcode) -> Args {
    use sola_bytecode::OperandLen::*;
    match op.operand_len() {
        Fixed(0) => Args::None,
        Fixed(1) => Args::U8(chunk.code[offset + 1]),
        Fixed(2) if op.is_jump() => Args::Jump {
            target: forward_target(chunk, offset),
        },
        Fixed(2) if op == Opcode::Loop => Args::Loop {
            target: loop_target(chunk, offset),
        },
        Fixed(2) => Args::U16(chunk.read_u16(offset + 1)),
        Fixed(3) => Args::U16U8(chunk.read_u16(offset + 1), chunk.code[offset + 3]),
        Fixed(4) => Args::U16U16(chunk.read_u16(offset + 1), chunk.read_u16(offset + 3)),
        Fixed(5) => Args::U16U16U8(
            chunk.read_u16(offset + 1),
            chunk.read_u16(offset + 3),
            chunk.code[offset + 5],
        ),
        EnterTry => {
            let catch_count = chunk.code[offset + 1] as usize;
            let finally_offset = chunk.read_i16(offset + 2);
            let len = op.instruction_len(&chunk.code[offset + 1..]);
            let after = offset + len;
            let finally = if finally_offset != 0 {
                Some((after as i64 + finally_offset as i64) as usize)
            } else {
                None
            };
            let mut catches = Vec::with_capacity(catch_count);
            let mut cursor = offset + 4;
            for _ in 0..catch_count {
                let type_idx = chunk.read_u16(cursor);
                let catch_offset = chunk.read_i16(cursor + 2);
                catches.push((type_idx, (after as i64 + catch_offset as i64) as usize));
                cursor += 4;
            }
            Args::EnterTry { finally, catches }
        }
        SuperArrayNew => {
            let count = chunk.read_u16(offset + 1);
            let markers = chunk.code[offset + 3..offset + 3 + count as usize].to_vec();
            Args::SuperArrayNew { count, markers }
        }
        _ => Args::None,
    }
}

fn forward_target(chunk: &Chunk, offset: usize) -> usize {
    let raw = chunk.read_i16(offset + 1) as i64;
    (offset as i64 + 3 + raw) as usize
}

fn loop_target(chunk: &Chunk, offset: usize) -> usize {
    let raw = chunk.read_u16(offset + 1) as i64;
    (offset as i64 + 3 - raw) as usize
}

/// Fixed byte length of one instruction's encoding, independent of its
/// position (matches the original size table; `EnterTry`/`SuperArrayNew`
/// read their own variable length from stored operand data).
pub fn encoded_len(instr: &Instr) -> usize {
    match &instr.args {
        Args::None => 1,
        Args::U8(_) => 2,
        Args::U16(_) | Args::Jump { .. } | Args::Loop { .. } => 3,
        Args::U16U8(..) => 4,
        Args::U16U16(..) => 5,
        Args::U16U16U8(..) => 6,
        Args::EnterTry { catches, .. } => 4 + 4 * catches.len(),
        Args::SuperArrayNew { count, .. } => 3 + *count as usize,
    }
}

/// Error returned when re-encoding would require a relative offset outside
/// `i16`'s range. Per the optimizer's "never fails" contract, a pass that
/// would hit this aborts wholesale and the chunk is returned unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOverflow;

/// Re-assemble an instruction list into a chunk, re-targeting every branch
/// operand to the new offsets the surviving instructions land at.
///
/// Deleted instructions simply vanish from `instrs`; a branch whose old
/// target was deleted is forwarded to the next surviving instruction at or
/// after that offset (the logical continuation of the control-flow edge).
pub fn encode(instrs: &[Instr], constants: Vec<Value>) -> Result<Chunk, EncodeOverflow> {
    // Assign new offsets in one pass, in original relative order.
    let mut new_offsets = Vec::with_capacity(instrs.len());
    let mut cursor = 0usize;
    for instr in instrs {
        new_offsets.push(cursor);
        cursor += encoded_len(instr);
    }
    let total_len = cursor;

    let resolve = |old_target: usize| -> usize {
        match instrs.binary_search_by_key(&old_target, |i| i.old_offset) {
            Ok(idx) => new_offsets[idx],
            Err(idx) => {
                if idx < instrs.len() {
                    new_offsets[idx]
                } else {
                    total_len
                }
            }
        }
    };

    let mut chunk = Chunk::new();
    chunk.constants = constants;

    for (i, instr) in instrs.iter().enumerate() {
        let here = new_offsets[i];
        debug_assert_eq!(chunk.len(), here);
        chunk.write_op(instr.op, instr.line);
        match &instr.args {
            Args::None => {}
            Args::U8(v) => chunk.write_u8(*v, instr.line),
            Args::U16(v) => chunk.write_u16(*v, instr.line),
            Args::U16U8(a, b) => {
                chunk.write_u16(*a, instr.line);
                chunk.write_u8(*b, instr.line);
            }
            Args::U16U16(a, b) => {
                chunk.write_u16(*a, instr.line);
                chunk.write_u16(*b, instr.line);
            }
            Args::U16U16U8(a, b, c) => {
                chunk.write_u16(*a, instr.line);
                chunk.write_u16(*b, instr.line);
                chunk.write_u8(*c, instr.line);
            }
            Args::Jump { target } => {
                let new_target = resolve(*target);
                let here_after = here + 3;
                let rel = new_target as i64 - here_after as i64;
                if !(i16::MIN as i64..=i16::MAX as i64).contains(&rel) {
                    return Err(EncodeOverflow);
                }
                chunk.write_i16(rel as i16, instr.line);
            }
            Args::Loop { target } => {
                let new_target = resolve(*target);
                let here_after = here + 3;
                let back = here_after as i64 - new_target as i64;
                if !(0..=u16::MAX as i64).contains(&back) {
                    return Err(EncodeOverflow);
                }
                chunk.write_u16(back as u16, instr.line);
            }
            Args::EnterTry { finally, catches } => {
                chunk.write_u8(catches.len() as u8, instr.line);
                let len = encoded_len(instr);
                let here_after = here + len;
                let finally_rel = match finally {
                    Some(target) => {
                        let rel = resolve(*target) as i64 - here_after as i64;
                        if !(i16::MIN as i64..=i16::MAX as i64).contains(&rel) {
                            return Err(EncodeOverflow);
                        }
                        rel as i16
                    }
                    None => 0,
                };
                chunk.write_i16(finally_rel, instr.line);
                for (type_idx, target) in catches {
                    chunk.write_u16(*type_idx, instr.line);
                    let rel = resolve(*target) as i64 - here_after as i64;
                    if !(i16::MIN as i64..=i16::MAX as i64).contains(&rel) {
                        return Err(EncodeOverflow);
                    }
                    chunk.write_i16(rel as i16, instr.line);
                }
            }
            Args::SuperArrayNew { count, markers } => {
                chunk.write_u16(*count, instr.line);
                for m in markers {
                    chunk.write_u8(*m, instr.line);
                }
            }
        }
    }

    Ok(chunk)
}
