//! The bytecode verifier: abstract interpretation over a [`sola_bytecode::Chunk`]
//! enforcing jump-target validity, stack-depth bounds and consistency,
//! constant/local index bounds, and the function-return depth invariant.

#![warn(rust_2018_idioms)]

mod effects;
mod error;
mod verify;

pub use effects::stack_effect;
pub use error::VerifyError;
pub use verify::{verify_chunk, MAX_LOCAL_INDEX, MAX_STACK_DEPTH};
