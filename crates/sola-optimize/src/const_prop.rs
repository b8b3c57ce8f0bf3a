//! Constant propagation: a local slot is tracked as constant only when a
//! pure constant-producing op is immediately followed by `STORE_LOCAL k`;
//! any other write to `k` clears the tracking, and a merge point (anything
//! that can be jumped to) clears the whole map since the incoming value may
//! differ depending on which edge was taken.

use crate::ir::{Args, Instr};
use rustc_hash::FxHashMap;
use sola_bytecode::Opcode;
use std::collections::HashSet;

/// How a tracked local's constant value was produced, so it can be
/// re-emitted verbatim at the `LOAD_LOCAL` site without touching the
/// constant pool.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ConstSource {
    Push(u16),
    Null,
    True,
    False,
    Zero,
    One,
}

fn const_source(op: Opcode, args: &Args) -> Option<ConstSource> {
    match (op, args) {
        (Opcode::Push, Args::U16(idx)) => Some(ConstSource::Push(*idx)),
        (Opcode::Null, _) => Some(ConstSource::Null),
        (Opcode::True, _) => Some(ConstSource::True),
        (Opcode::False, _) => Some(ConstSource::False),
        (Opcode::Zero, _) => Some(ConstSource::Zero),
        (Opcode::One, _) => Some(ConstSource::One),
        _ => None,
    }
}

fn emit(source: ConstSource, old_offset: usize, line: u32) -> Instr {
    let (op, args) = match source {
        ConstSource::Push(idx) => (Opcode::Push, Args::U16(idx)),
        ConstSource::Null => (Opcode::Null, Args::None),
        ConstSource::True => (Opcode::True, Args::None),
        ConstSource::False => (Opcode::False, Args::None),
        ConstSource::Zero => (Opcode::Zero, Args::None),
        ConstSource::One => (Opcode::One, Args::None),
    };
    Instr { op, old_offset, line, args }
}

fn local_index(instr: &Instr) -> Option<u16> {
    match instr.args {
        Args::U16(k) => Some(k),
        _ => None,
    }
}

/// Every offset any branch in `instrs` can land on — a conservative merge
/// point set used to invalidate tracked constants across control-flow joins.
pub(crate) fn branch_targets(instrs: &[Instr]) -> HashSet<usize> {
    let mut targets = HashSet::new();
    for instr in instrs {
        match &instr.args {
            Args::Jump { target } | Args::Loop { target } => {
                targets.insert(*target);
            }
            Args::EnterTry { finally, catches } => {
                if let Some(t) = finally {
                    targets.insert(*t);
                }
                for (_, t) in catches {
                    targets.insert(*t);
                }
            }
            _ => {}
        }
    }
    targets
}

pub fn run(instrs: &[Instr]) -> (Vec<Instr>, bool) {
    let merge_points = branch_targets(instrs);
    let mut tracked: FxHashMap<u16, ConstSource> = FxHashMap::default();
    let mut out = Vec::with_capacity(instrs.len());
    let mut changed = false;
    let mut i = 0;
    while i < instrs.len() {
        if merge_points.contains(&instrs[i].old_offset) {
            tracked.clear();
        }
        // PUSH/NULL/TRUE/FALSE/ZERO/ONE immediately followed by STORE_LOCAL k.
        if i + 1 < instrs.len() && instrs[i + 1].op == Opcode::StoreLocal {
            if let Some(source) = const_source(instrs[i].op, &instrs[i].args) {
                if let Some(k) = local_index(&instrs[i + 1]) {
                    tracked.insert(k, source);
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
            }
            out.push(instrs[i].clone());
            i += 1;
            continue;
        }
        if instrs[i].op == Opcode::LoadLocal {
            if let Some(k) = local_index(&instrs[i]) {
                if let Some(source) = tracked.get(&k) {
                    out.push(emit(*source, instrs[i].old_offset, instrs[i].line));
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
