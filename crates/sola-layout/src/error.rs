//! The layout crate's error taxonomy: registry misuse and v-table build
//! failures. Kept as its own `thiserror` enum per crate, matching the
//! one-error-enum-per-crate convention the rest of the workspace follows.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("class {0:?} is already registered")]
    DuplicateClass(String),

    #[error("no class named {0:?} is registered")]
    UnknownClass(String),

    #[error("no class with id {0} is registered")]
    UnknownClassId(u32),

    #[error("class {class:?} declares {count} fields, which exceeds the JIT field cap of {max}")]
    TooManyFieldsForJit {
        class: String,
        count: usize,
        max: usize,
    },

    #[error("interface {0:?} is not registered, cannot build a v-table against it")]
    UnknownInterface(String),
}
