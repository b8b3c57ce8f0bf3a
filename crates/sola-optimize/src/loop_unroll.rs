//! Loop unrolling: named in the fixed pass order but, unlike the peephole
//! patterns and strength reduction, the spec gives no concrete rewrite for
//! it — actually duplicating a loop body changes its trip count unless the
//! compiler's original iteration count is known, which is not recoverable
//! from bytecode alone. This pass therefore follows the same detect-only
//! shape the spec explicitly sanctions for dead-code marking: it reports
//! small, single-entry backward-edge loops that look unrollable (a bounded
//! body with no nested branch, call, or try) for a later stage with access
//! to trip-count information, and never rewrites the chunk itself.

use crate::ir::{Args, Instr};
use sola_bytecode::Opcode;

/// Maximum body length, in instructions, a loop may have to be reported as
/// a candidate. Larger bodies are unlikely to benefit and are more likely
/// to contain control flow this pass can't safely reason about.
const MAX_CANDIDATE_BODY_LEN: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopUnrollReport {
    /// Old byte offsets of `LOOP` instructions whose body looks like a safe
    /// unrolling candidate.
    pub candidate_loop_offsets: Vec<usize>,
}

impl LoopUnrollReport {
    pub fn is_empty(&self) -> bool {
        self.candidate_loop_offsets.is_empty()
    }
}

/// Detect unrollable-looking loops. Never rewrites; always returns `false`
/// for "changed".
pub fn run(instrs: &[Instr]) -> (Vec<Instr>, bool, LoopUnrollReport) {
    let by_offset: std::collections::HashMap<usize, usize> = instrs
        .iter()
        .enumerate()
        .map(|(i, instr)| (instr.old_offset, i))
        .collect();

    let mut candidates = Vec::new();
    for (idx, instr) in instrs.iter().enumerate() {
        if instr.op != Opcode::Loop {
            continue;
        }
        let Args::Loop { target } = instr.args else { continue };
        let Some(&start_idx) = by_offset.get(&target) else { continue };
        if start_idx >= idx {
            continue;
        }
        let body = &instrs[start_idx..idx];
        if body.len() <= MAX_CANDIDATE_BODY_LEN && body.iter().all(is_simple) {
            candidates.push(instr.old_offset);
        }
    }

    (
        instrs.to_vec(),
        false,
        LoopUnrollReport { candidate_loop_offsets: candidates },
    )
}

fn is_simple(instr: &Instr) -> bool {
    !instr.op.is_branch() && !instr.op.is_call() && instr.op != Opcode::EnterTry
}
