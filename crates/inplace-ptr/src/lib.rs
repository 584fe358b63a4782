//! Self-relative pointers for inplace buffers.
//!
//! A buffer that is memory mapped by another process usually lands at a
//! different base address than where it was written, so it cannot contain
//! absolute addresses. [`RelPtr`] instead stores the distance from its own
//! storage location to its target. As long as the pointer and the target
//! move together (the whole buffer is relocated) the stored bytes stay
//! correct, and no fix-up pass is needed after loading.
//!
//! [`RelSpan`] pairs a relative pointer with an element count to describe an
//! array elsewhere in the same buffer.
//!
//! # Moving pointers
//!
//! Neither type is `Clone` or `Copy`. Copying the raw relation into a
//! different slot silently re-targets it, so values are re-pointed with
//! [`RelPtr::set`] rather than moved between slots. Zeroed memory is a valid
//! null pointer and an empty span.

pub mod ptr;
pub mod span;

pub use ptr::RelPtr;
pub use span::RelSpan;
