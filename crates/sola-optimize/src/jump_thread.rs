//! Jump threading: a `JUMP` whose target is itself another `JUMP` is
//! rewritten to point directly at the final target of the chain, as long as
//! the resulting offset still fits in `i16` once re-encoded.

use crate::ir::{encode, Args, Instr};
use sola_bytecode::{Opcode, Value};
use std::collections::HashMap;

pub fn run(instrs: &[Instr], constants: &[Value]) -> (Vec<Instr>, bool) {
    let by_offset: HashMap<usize, usize> = instrs
        .iter()
        .enumerate()
        .map(|(i, instr)| (instr.old_offset, i))
        .collect();

    let mut out = instrs.to_vec();
    let mut changed = false;

    for idx in 0..out.len() {
        if out[idx].op != Opcode::Jump {
            continue;
        }
        let Args::Jump { target } = out[idx].args.clone() else { continue };
        if let Some(final_target) = follow_chain(target, instrs, &by_offset) {
            if final_target != target {
                out[idx].args = Args::Jump { target: final_target };
                changed = true;
            }
        }
    }

    if changed {
        // Re-threading might push an offset outside i16 range once actually
        // laid out; if so, the optimizer must abort this rewrite untouched
        // rather than emit an unencodable chunk.
        if encode(&out, constants.to_vec()).is_err() {
            return (instrs.to_vec(), false);
        }
    }

    (out, changed)
}

/// Follow a chain of `JUMP -> JUMP -> ...` to its final non-jump target,
/// bounded by the instruction count to guard against a cyclic chain (which
/// would otherwise be an infinite loop in the bytecode itself, but the
/// verifier runs before the optimizer so this is defense in depth).
fn follow_chain(
    mut target: usize,
    instrs: &[Instr],
    by_offset: &HashMap<usize, usize>,
) -> Option<usize> {
    let mut hops = 0;
    loop {
        let idx = *by_offset.get(&target)?;
        match instrs[idx].args {
            Args::Jump { target: next } if instrs[idx].op == Opcode::Jump => {
                if next == target {
                    return Some(target);
                }
                target = next;
                hops += 1;
                if hops > instrs.len() {
                    return Some(target);
                }
            }
            _ => return Some(target),
        }
    }
}
