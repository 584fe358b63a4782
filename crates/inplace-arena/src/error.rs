use thiserror::Error;

/// Errors produced by arena allocation.
///
/// A failed allocation leaves the arena exactly as it was before the call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArenaError {
    #[error("arena out of memory: requested {requested} bytes aligned to {align}, {available} bytes left")]
    OutOfMemory {
        requested: usize,
        available: usize,
        align: usize,
    },

    #[error("alignment {0} is not a power of two")]
    InvalidAlignment(usize),

    #[error("allocation size overflows: {count} elements of {element_size} bytes")]
    SizeOverflow { count: usize, element_size: usize },

    #[error("parent allocator failed to provide {size} bytes: {reason}")]
    ParentAllocation { size: usize, reason: String },

    #[error("invalid arena configuration: {0}")]
    Config(String),
}

pub type ArenaResult<T> = Result<T, ArenaError>;
