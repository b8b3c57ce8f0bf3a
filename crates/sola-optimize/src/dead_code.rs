//! Dead-code marking: after following reachable flow from offset 0, any
//! instruction never reached is reported as unreachable. Per the spec's own
//! allowance, this pass detects only — rewriting would require re-patching
//! every surviving jump around the removed bytes, which the spec leaves
//! optional. Callers that want the bytes gone can act on the report; the
//! chunk itself is returned unmodified.

use crate::ir::{Args, Instr};
use sola_bytecode::Opcode;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeadCodeReport {
    /// Old byte offsets of instructions that are unreachable from offset 0.
    pub unreachable_offsets: Vec<usize>,
}

impl DeadCodeReport {
    pub fn is_empty(&self) -> bool {
        self.unreachable_offsets.is_empty()
    }
}

/// Detect unreachable instructions. Never rewrites; always returns `false`
/// for "changed" since the instruction list is untouched.
pub fn run(instrs: &[Instr]) -> (Vec<Instr>, bool, DeadCodeReport) {
    if instrs.is_empty() {
        return (Vec::new(), false, DeadCodeReport::default());
    }

    let by_offset: std::collections::HashMap<usize, usize> = instrs
        .iter()
        .enumerate()
        .map(|(i, instr)| (instr.old_offset, i))
        .collect();

    let mut reachable = HashSet::new();
    let mut stack = vec![0usize];
    while let Some(idx) = stack.pop() {
        if idx >= instrs.len() || !reachable.insert(idx) {
            continue;
        }
        let instr = &instrs[idx];
        for target in successors(instr) {
            if let Some(&next_idx) = by_offset.get(&target) {
                stack.push(next_idx);
            }
        }
        if falls_through(instr.op) {
            stack.push(idx + 1);
        }
    }

    let unreachable_offsets: Vec<usize> = instrs
        .iter()
        .enumerate()
        .filter(|(idx, _)| !reachable.contains(idx))
        .map(|(_, instr)| instr.old_offset)
        .collect();

    (instrs.to_vec(), false, DeadCodeReport { unreachable_offsets })
}

/// `Jump`/`Loop` transfer control unconditionally: no fallthrough edge.
/// Terminators likewise have none. Everything else, including the
/// conditional jumps (which decode() also represents as `Args::Jump`, but
/// whose fallthrough edge is live), falls through to the next instruction.
fn falls_through(op: Opcode) -> bool {
    !matches!(op, Opcode::Jump | Opcode::Loop) && !op.is_terminator()
}

fn successors(instr: &Instr) -> Vec<usize> {
    match &instr.args {
        Args::Jump { target } | Args::Loop { target } => vec![*target],
        Args::EnterTry { finally, catches } => {
            let mut targets: Vec<usize> = catches.iter().map(|(_, t)| *t).collect();
            if let Some(t) = finally {
                targets.push(*t);
            }
            targets
        }
        _ => vec![],
    }
}
