//! Multi-pass bytecode optimizer: peephole patterns, constant and copy
//! propagation, strength reduction, jump threading, loop unrolling,
//! dead-code marking, and constant folding.
//!
//! Passes run in the fixed order the contract requires, and the whole cycle
//! repeats until a pass makes no change (a fixpoint, tracked by an
//! optimization counter rather than a fixed iteration budget). The
//! optimizer never fails outward: if re-laying out the rewritten
//! instructions would overflow a branch's `i16` offset, that cycle's
//! changes are discarded and the chunk is returned as it was going in.

#![warn(rust_2018_idioms)]

mod const_prop;
mod constant_fold;
mod copy_prop;
mod dead_code;
mod ir;
mod jump_thread;
mod loop_unroll;
mod peephole;
mod strength;

pub use dead_code::DeadCodeReport;
pub use ir::{Args, EncodeOverflow, Instr};
pub use loop_unroll::LoopUnrollReport;

use sola_bytecode::Chunk;

/// Upper bound on optimization cycles, purely as a backstop against a
/// pathological pass interaction that never reaches a fixpoint; no pass in
/// this crate is expected to need anywhere near this many cycles.
const MAX_CYCLES: u32 = 1000;

/// Outcome of running the optimizer over a chunk.
#[derive(Debug, Clone)]
pub struct OptimizeReport {
    /// Number of individual rewrites applied across every pass and cycle.
    pub optimization_count: u32,
    pub dead_code: DeadCodeReport,
    pub loop_unroll: LoopUnrollReport,
}

/// Run every pass, in the spec's fixed order, to a fixpoint.
///
/// `local_count` is forwarded unchanged; the optimizer does not itself
/// change how many locals a function declares.
pub fn optimize_chunk(chunk: &Chunk) -> (Chunk, OptimizeReport) {
    let mut instrs = ir::decode(chunk);
    let mut constants = chunk.constants.clone();
    let mut optimization_count = 0u32;
    let mut dead_code = DeadCodeReport::default();
    let mut loop_unroll = LoopUnrollReport::default();

    for _ in 0..MAX_CYCLES {
        let snapshot_instrs = instrs.clone();
        let snapshot_constants = constants.clone();
        let mut cycle_changed = false;

        let (next, changed) = const_prop::run(&instrs);
        instrs = next;
        cycle_changed |= changed;

        let (next, changed) = copy_prop::run(&instrs);
        instrs = next;
        cycle_changed |= changed;

        let (next, new_constants, changed) = strength::run(&instrs, &constants);
        instrs = next;
        constants.extend(new_constants);
        cycle_changed |= changed;

        let (next, changed) = jump_thread::run(&instrs, &constants);
        instrs = next;
        cycle_changed |= changed;

        let (_unchanged, _changed_never, report) = loop_unroll::run(&instrs);
        loop_unroll = report;

        let (next, changed) = peephole::run(&instrs, &constants);
        instrs = next;
        cycle_changed |= changed;

        let (_unchanged, _changed_never, report) = dead_code::run(&instrs);
        dead_code = report;

        let (next, new_constants, changed) = constant_fold::run(&instrs, &constants);
        instrs = next;
        constants.extend(new_constants);
        cycle_changed |= changed;

        if !cycle_changed {
            break;
        }

        // Confirm the cycle's rewrites still re-encode; if not, this whole
        // cycle is rolled back and the chunk is left as it was before it.
        if ir::encode(&instrs, constants.clone()).is_err() {
            instrs = snapshot_instrs;
            constants = snapshot_constants;
            break;
        }

        optimization_count += 1;
    }

    let rebuilt = ir::encode(&instrs, constants)
        .unwrap_or_else(|_| ir::encode(&ir::decode(chunk), chunk.constants.clone()).expect("original chunk must re-encode"));

    (
        rebuilt,
        OptimizeReport {
            optimization_count,
            dead_code,
            loop_unroll,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sola_bytecode::{Opcode, Value};

    #[test]
    fn folds_and_propagates_across_several_passes() {
        let mut chunk = Chunk::new();
        let a = chunk.add_constant(Value::Int(2));
        let b = chunk.add_constant(Value::Int(3));
        chunk.write_op(Opcode::Push, 1);
        chunk.write_u16(a, 1);
        chunk.write_op(Opcode::StoreLocal, 1);
        chunk.write_u16(0, 1);
        chunk.write_op(Opcode::LoadLocal, 1);
        chunk.write_u16(0, 1);
        chunk.write_op(Opcode::Push, 1);
        chunk.write_u16(b, 1);
        chunk.write_op(Opcode::Add, 1);
        chunk.write_op(Opcode::Return, 1);

        let (rebuilt, report) = optimize_chunk(&chunk);
        assert!(report.optimization_count > 0);
        // LOAD_LOCAL 0 should have been propagated to PUSH 2, then folded
        // with PUSH 3 / ADD into a single PUSH 5.
        assert!(rebuilt.code.iter().filter(|&&b| b == Opcode::Push.to_u8()).count() <= 1);
    }

    #[test]
    fn an_already_minimal_chunk_reaches_a_fixpoint_immediately() {
        let mut chunk = Chunk::new();
        chunk.write_op(Opcode::ReturnNull, 1);
        let (rebuilt, report) = optimize_chunk(&chunk);
        assert_eq!(report.optimization_count, 0);
        assert_eq!(rebuilt.code, chunk.code);
    }

    #[test]
    fn jump_to_fallthrough_is_deleted_by_peephole() {
        let mut chunk = Chunk::new();
        chunk.write_op(Opcode::Jump, 1);
        let slot = chunk.reserve_jump(1);
        chunk.patch_jump(slot).unwrap();
        chunk.write_op(Opcode::ReturnNull, 1);

        let (rebuilt, report) = optimize_chunk(&chunk);
        assert!(report.optimization_count > 0);
        assert_eq!(rebuilt.code, vec![Opcode::ReturnNull.to_u8()]);
    }
}
