//! Copy propagation: a local slot `k` is tracked as "copy of local `j`" when
//! `LOAD_LOCAL j` is immediately followed by `STORE_LOCAL k` (j != k); a
//! subsequent `LOAD_LOCAL k` is rewritten to `LOAD_LOCAL j`. Tracking for a
//! slot is cleared whenever that slot (as source or target) is overwritten,
//! and wholesale at any merge point, mirroring constant propagation.

use crate::const_prop::branch_targets;
use crate::ir::{Args, Instr};
use rustc_hash::FxHashMap;
use sola_bytecode::Opcode;

fn local_index(instr: &Instr) -> Option<u16> {
    match instr.args {
        Args::U16(k) => Some(k),
        _ => None,
    }
}

pub fn run(instrs: &[Instr]) -> (Vec<Instr>, bool) {
    let merge_points = branch_targets(instrs);
    let mut tracked: FxHashMap<u16, u16> = FxHashMap::default();
    let mut out = Vec::with_capacity(instrs.len());
    let mut changed = false;
    let mut i = 0;
    while i < instrs.len() {
        if merge_points.contains(&instrs[i].old_offset) {
            tracked.clear();
        }
        if i + 1 < instrs.len()
            && instrs[i].op == Opcode::LoadLocal
            && instrs[i + 1].op == Opcode::StoreLocal
        {
            if let (Some(j), Some(k)) = (local_index(&instrs[i]), local_index(&instrs[i + 1])) {
                if j != k {
                    // k becomes an alias of j; any slot that was itself
                    // tracked as an alias of k no longer is, since k's value
                    // just changed.
                    tracked.retain(|_, v| *v != k);
                    tracked.insert(k, j);
                    out.push(instrs[i].clone());
                    out.push(instrs[i + 1].clone());
                    i += 2;
                    continue;
                }
            }
        }
        if instrs[i].op == Opcode::StoreLocal {
            if let Some(k) = local_index(&instrs[i]) {
                tracked.remove(&k);
                tracked.retain(|_, v| *v != k);
            }
            out.push(instrs[i].clone());
            i += 1;
            continue;
        }
        if instrs[i].op == Opcode::LoadLocal {
            if let Some(k) = local_index(&instrs[i]) {
                if let Some(source) = tracked.get(&k) {
                    out.push(Instr {
                        op: Opcode::LoadLocal,
                        old_offset: instrs[i].old_offset,
                        line: instrs[i].line,
                        args: Args::U16(*source),
                    });
                    changed = true;
                    i += 1;
                    continue;
                }
            }
        }
        out.push(instrs[i].clone());
        i += 1;
    }
    (out, changed)
}
