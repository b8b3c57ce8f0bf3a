//! JIT-friendly object/hash-map/iterator/closure/native-array layouts, the
//! process-wide class layout registry, and the v-table builder (spec §4.7,
//! §4.6): C4, C5, C9.
//!
//! Nothing in this crate emits machine code (JIT code generation is an
//! explicit non-goal, spec §1) — it publishes the fixed byte offsets and
//! algorithms a future code generator would need so its loads/stores line
//! up with what the interpreter itself would produce.

#![warn(rust_2018_idioms)]

pub mod class_layout;
pub mod closure_layout;
pub mod error;
pub mod field;
pub mod iterator_layout;
pub mod jit_map;
pub mod native_array_layout;
pub mod pool;
pub mod registry;
pub mod vtable;

pub use class_layout::{ClassLayout, ClassLayoutBuilder, CodePtr, MethodDescriptor, MethodKind};
pub use error::LayoutError;
pub use field::{field_offset, FieldDescriptor, FieldType, HEADER_SIZE, MAX_JIT_FIELDS, SLOT_SIZE};
pub use iterator_layout::{IteratorKind, IteratorLayout, RangeIterator};
pub use jit_map::{golden_mix, JitMap};
pub use registry::ClassLayoutRegistry;
pub use vtable::{VTable, VTableBuilder, VTableCache, VTableEntry};
