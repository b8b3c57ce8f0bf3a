//! Code-bearing declarations (`Function`/`Method`/`Class`/`EnumDecl`) and the
//! byte-exact `.solac` artifact codec built on top of them.
//!
//! Serialization is infallible; deserialization validates the header,
//! re-derives the string pool, and runs every function/method chunk through
//! [`sola_verify::verify_chunk`] before handing back a [`decl::CompiledFile`]
//! — a partially-valid artifact is never returned to the caller.

#![warn(rust_2018_idioms)]

pub mod codec;
pub mod decl;
pub mod error;

pub use codec::{deserialize, serialize, FORMAT_MAJOR, FORMAT_MINOR, HEADER_LEN, MAGIC};
pub use decl::{
    Annotation, Class, CompiledFile, DeclMap, EnumDecl, Function, Method, OverloadTable,
    Property, TypeParam, Visibility,
};
pub use error::FormatError;
