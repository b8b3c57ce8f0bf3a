//! Opcode inventory, the tagged runtime `Value`, the `Chunk` code unit, and
//! a pooled chunk allocator — the bytecode model at the base of the Sola
//! execution core.

#![warn(rust_2018_idioms)]

pub mod chunk;
pub mod opcode;
pub mod pool;
pub mod value;

pub use chunk::{Chunk, PatchError};
pub use opcode::{Opcode, OperandLen};
pub use pool::ChunkPool;
pub use value::{
    fnv1a64, ArrayRef, ClassRef, ClosureRef, EnumValueRef, ExceptionRef, FixedArray, FuncRef,
    IteratorRef, MethodRef, NativeArray, NotHashableError, ObjectRef, Value, ValueMap,
};
