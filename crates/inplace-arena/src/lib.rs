//! Linear arena allocation for inplace buffers.
//!
//! Objects that make up an inplace buffer are bump-allocated, in address
//! order, out of one contiguous region. Nothing is freed piecemeal; the whole
//! arena can only be [`reset`](Arena::reset).
//!
//! # Allocators
//!
//! - [`Arena`] owns its backing memory, obtained from a [`ParentAllocator`].
//!   When full it asks the parent to grow *in place*. A parent that would
//!   have to move the block refuses, because objects already handed out
//!   would dangle, and the allocation fails instead.
//! - [`ForeignArena`] carves objects out of a caller-owned byte range, such
//!   as a memory-mapped file or a network frame. It never grows and never
//!   drops what it constructs.
//!
//! # Handles
//!
//! The owned arena returns [`Handle`] and [`ArenaSlice`] values, which are
//! byte offsets from the arena start. Like relative pointers they do not
//! depend on where the arena lives, and all access through them is bounds
//! checked.

pub mod arena;
pub mod config;
mod cursor;
pub mod error;
pub mod foreign;
pub mod handle;
pub mod parent;

pub use arena::Arena;
pub use config::{ArenaConfig, GrowthPolicy};
pub use error::{ArenaError, ArenaResult};
pub use foreign::ForeignArena;
pub use handle::{ArenaOffset, ArenaSlice, Handle};
pub use parent::{Heap, ParentAllocator, Reserved};
