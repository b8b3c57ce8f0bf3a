//! The fourteen fixed peephole patterns: a short instruction window is
//! rewritten unconditionally whenever it matches. Every pattern here is
//! semantics-preserving on its own; a pattern is simply skipped if its
//! precondition does not hold.

use crate::ir::{Args, Instr};
use sola_bytecode::{Opcode, Value};

/// Run one peephole sweep over `instrs`, returning the rewritten list and
/// whether anything changed (the driver uses this to advance its
/// optimization counter).
pub fn run(instrs: &[Instr], constants: &[Value]) -> (Vec<Instr>, bool) {
    let mut out = Vec::with_capacity(instrs.len());
    let mut changed = false;
    let mut i = 0;
    while i < instrs.len() {
        if let Some(replacement) = match_single(&instrs[i]) {
            out.extend(replacement);
            changed = true;
            i += 1;
            continue;
        }
        if i + 1 < instrs.len() {
            if let Some(replacement) = match_pair(&instrs[i], &instrs[i + 1], constants) {
                out.extend(replacement);
                changed = true;
                i += 2;
                continue;
            }
        }
        out.push(instrs[i].clone());
        i += 1;
    }
    (out, changed)
}

/// Pattern 7: `JUMP 0` — a jump whose target is its own fallthrough.
fn match_single(instr: &Instr) -> Option<Vec<Instr>> {
    if instr.op == Opcode::Jump {
        if let Args::Jump { target } = instr.args {
            let fallthrough = instr.old_offset + crate::ir::encoded_len(instr);
            if target == fallthrough {
                return Some(vec![]);
            }
        }
    }
    None
}

fn is_pure_const_push(op: Opcode) -> bool {
    matches!(
        op,
        Opcode::Push | Opcode::Null | Opcode::True | Opcode::False | Opcode::Zero | Opcode::One
    )
}

fn local_index(instr: &Instr) -> Option<u16> {
    match instr.args {
        Args::U16(k) => Some(k),
        _ => None,
    }
}

fn match_pair(a: &Instr, b: &Instr, constants: &[Value]) -> Option<Vec<Instr>> {
    // 1: ZERO, ADD -> delete
    if a.op == Opcode::Zero && b.op == Opcode::Add {
        return Some(vec![]);
    }
    // 2: ONE, MUL -> delete
    if a.op == Opcode::One && b.op == Opcode::Mul {
        return Some(vec![]);
    }
    // 3: ZERO, MUL -> POP, ZERO
    if a.op == Opcode::Zero && b.op == Opcode::Mul {
        return Some(vec![
            Instr { op: Opcode::Pop, old_offset: a.old_offset, line: a.line, args: Args::None },
            Instr { op: Opcode::Zero, old_offset: b.old_offset, line: b.line, args: Args::None },
        ]);
    }
    // 4: DUP, POP -> delete
    if a.op == Opcode::Dup && b.op == Opcode::Pop {
        return Some(vec![]);
    }
    // 5: NOT, NOT -> delete
    if a.op == Opcode::Not && b.op == Opcode::Not {
        return Some(vec![]);
    }
    // 6: NEG, NEG -> delete
    if a.op == Opcode::Neg && b.op == Opcode::Neg {
        return Some(vec![]);
    }
    // 8: LOAD_LOCAL k, STORE_LOCAL k -> delete
    if a.op == Opcode::LoadLocal && b.op == Opcode::StoreLocal {
        if let (Some(k1), Some(k2)) = (local_index(a), local_index(b)) {
            if k1 == k2 {
                return Some(vec![]);
            }
        }
    }
    // 9: TRUE, JUMP_IF_FALSE t -> delete both
    if a.op == Opcode::True && b.op == Opcode::JumpIfFalse {
        return Some(vec![]);
    }
    // 10: FALSE, JUMP_IF_FALSE t -> JUMP t
    if a.op == Opcode::False && b.op == Opcode::JumpIfFalse {
        if let Args::Jump { target } = b.args {
            return Some(vec![Instr {
                op: Opcode::Jump,
                old_offset: a.old_offset,
                line: a.line,
                args: Args::Jump { target },
            }]);
        }
    }
    // 11: STORE_LOCAL k, LOAD_LOCAL k -> DUP, STORE_LOCAL k
    if a.op == Opcode::StoreLocal && b.op == Opcode::LoadLocal {
        if let (Some(k1), Some(k2)) = (local_index(a), local_index(b)) {
            if k1 == k2 {
                return Some(vec![
                    Instr { op: Opcode::Dup, old_offset: a.old_offset, line: a.line, args: Args::None },
                    Instr { op: Opcode::StoreLocal, old_offset: b.old_offset, line: b.line, args: Args::U16(k1) },
                ]);
            }
        }
    }
    // 12: CONST bool/null, NOT -> push the negated constant
    if a.op == Opcode::Null && b.op == Opcode::Not {
        return Some(vec![Instr { op: Opcode::True, old_offset: a.old_offset, line: a.line, args: Args::None }]);
    }
    if a.op == Opcode::True && b.op == Opcode::Not {
        return Some(vec![Instr { op: Opcode::False, old_offset: a.old_offset, line: a.line, args: Args::None }]);
    }
    if a.op == Opcode::False && b.op == Opcode::Not {
        return Some(vec![Instr { op: Opcode::True, old_offset: a.old_offset, line: a.line, args: Args::None }]);
    }
    if a.op == Opcode::Push && b.op == Opcode::Not {
        if let Args::U16(idx) = a.args {
            if let Some(folded) = negate_bool_or_null_constant(constants, idx) {
                return Some(vec![Instr {
                    op: if folded { Opcode::True } else { Opcode::False },
                    old_offset: a.old_offset,
                    line: a.line,
                    args: Args::None,
                }]);
            }
        }
    }
    // 13: PUSH c, POP -> delete (generalized to any pure constant push)
    if is_pure_const_push(a.op) && b.op == Opcode::Pop {
        return Some(vec![]);
    }
    // 14: LOAD_LOCAL k, LOAD_LOCAL k -> LOAD_LOCAL k, DUP
    if a.op == Opcode::LoadLocal && b.op == Opcode::LoadLocal {
        if let (Some(k1), Some(k2)) = (local_index(a), local_index(b)) {
            if k1 == k2 {
                return Some(vec![
                    Instr { op: Opcode::LoadLocal, old_offset: a.old_offset, line: a.line, args: Args::U16(k1) },
                    Instr { op: Opcode::Dup, old_offset: b.old_offset, line: b.line, args: Args::None },
                ]);
            }
        }
    }
    None
}

/// `None` if the constant at `idx` is not `null`/`bool`; else its negated
/// truthiness, per pattern 12.
fn negate_bool_or_null_constant(constants: &[Value], idx: u16) -> Option<bool> {
    match constants.get(idx as usize)? {
        Value::Null => Some(true),
        Value::Bool(b) => Some(!b),
        _ => None,
    }
}
