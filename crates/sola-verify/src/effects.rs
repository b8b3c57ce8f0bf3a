//! The central stack-effect table the verifier walks against. One entry per
//! opcode category; operand-dependent opcodes (calls, container
//! constructors) decode their own pop count from the instruction's
//! immediate bytes, matching the "functions decoded by reading their
//! argument count from the instruction" rule in the verifier's contract.

use sola_bytecode::Opcode;

/// `(pops, pushes)` for one instruction.
pub type StackEffect = (u16, u16);

/// Compute the stack effect of the instruction at `offset`, given the whole
/// instruction's bytes (opcode byte included).
pub fn stack_effect(op: Opcode, instr_bytes: &[u8]) -> StackEffect {
    use Opcode::*;
    match op {
        Pop => (1, 0),
        Dup => (1, 2),
        Swap => (2, 2),
        Null | True | False | Zero | One | Push | LoadLocal | LoadGlobal => (0, 1),
        StoreLocal | StoreGlobal => (1, 0),
        Add | Sub | Mul | Div | Mod | Eq | Ne | Lt | Le | Gt | Ge | And | Or | BitAnd | BitOr
        | BitXor | Shl | Shr | Concat => (2, 1),
        Neg | Not | BitNot => (1, 1),
        StringBuilderNew => (0, 1),
        StringBuilderAdd => (2, 1),
        StringBuilderBuild => (1, 1),
        Jump => (0, 0),
        JumpIfFalse | JumpIfTrue => (1, 0),
        Loop => (0, 0),
        Return => (1, 0),
        ReturnNull | Halt => (0, 0),
        Call => {
            let argc = instr_bytes.get(1).copied().unwrap_or(0) as u16;
            (argc + 1, 1)
        }
        TailCall => {
            let argc = instr_bytes.get(1).copied().unwrap_or(0) as u16;
            (argc + 1, 1)
        }
        CallMethod => {
            let argc = instr_bytes.get(3).copied().unwrap_or(0) as u16;
            (argc + 1, 1)
        }
        CallStatic => {
            let argc = instr_bytes.get(5).copied().unwrap_or(0) as u16;
            (argc, 1)
        }
        Closure => {
            let upv = read_u16(instr_bytes, 1);
            (upv, 1)
        }
        NewObject => (0, 1),
        GetField => (1, 1),
        SetField => (2, 0),
        GetStatic => (0, 1),
        SetStatic => (1, 0),
        CheckType | Cast | CastSafe => (1, 1),
        NewArray => {
            let n = read_u16(instr_bytes, 1);
            (n, 1)
        }
        // Open Question resolution: NEW_FIXED_ARRAY drops init_len values
        // and pushes exactly one fixed array.
        NewFixedArray => {
            let init_len = read_u16(instr_bytes, 3);
            (init_len, 1)
        }
        ArrayGet | ArrayUncheckedGet | ArrayHas => (2, 1),
        ArraySet | ArrayUncheckedSet => (3, 0),
        ArrayLen => (1, 1),
        ArrayPush => (2, 0),
        SuperArrayNew => {
            let count = read_u16(instr_bytes, 1);
            (count, 1)
        }
        SuperArrayGet => (2, 1),
        SuperArraySet => (3, 0),
        NewMap => {
            let n = read_u16(instr_bytes, 1);
            (n.saturating_mul(2), 1)
        }
        MapGet | MapHas => (2, 1),
        MapSet => (3, 0),
        MapLen => (1, 1),
        IterInit | IterNext | IterKey | IterValue => (1, 1),
        NewBytes => {
            let n = read_u16(instr_bytes, 1);
            (n, 1)
        }
        BytesGet => (2, 1),
        BytesSet => (3, 0),
        BytesLen => (1, 1),
        BytesSlice => (3, 1),
        BytesConcat => (2, 1),
        EnterTry | LeaveTry | LeaveFinally => (0, 0),
        EnterCatch => (0, 1),
        Rethrow => (0, 0),
        Throw => (1, 0),
        Unset => (1, 0),
        DebugPrint => (1, 0),
    }
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    match (bytes.get(at), bytes.get(at + 1)) {
        (Some(&hi), Some(&lo)) => u16::from_be_bytes([hi, lo]),
        _ => 0,
    }
}
