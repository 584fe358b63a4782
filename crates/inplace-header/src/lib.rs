//! Self-describing directory of typed headers for inplace buffers.
//!
//! Every buffer starts with a [`RootHeader`] that names the buffer's content,
//! records the framework version and the writer's platform, and points at a
//! directory of sub-headers. Each sub-header starts with a [`Header`] carrying
//! its own 16-byte identifier and version, so independent components can
//! embed their data in one buffer and find it again without knowing about
//! each other.
//!
//! # Writing
//!
//! ```
//! use inplace_arena::Arena;
//! use inplace_header::{BufferBuilder, BufferView, Header, SubHeader, VersionedSubHeader};
//! use inplace_types::{Magic, Version};
//! use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
//!
//! #[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
//! #[repr(C)]
//! struct Counter {
//!     header: Header,
//!     count: u32,
//! }
//!
//! unsafe impl SubHeader for Counter {
//!     const IDENTIFIER: Magic = Magic::new("COUNTER");
//! }
//! impl VersionedSubHeader for Counter {
//!     const VERSION_SUPPORTED: Version = Version::new(1, 0, 0);
//! }
//!
//! let mut builder = BufferBuilder::new(Magic::new("APP"), Arena::new(4096)?)?;
//! builder.add_header(Counter { header: Header::current::<Counter>(), count: 3 })?;
//! let arena = builder.finish()?;
//!
//! let view = BufferView::new(arena.as_bytes())?;
//! assert_eq!(view.find_supported::<Counter>().map(|c| c.count), Some(3));
//! # Ok::<(), inplace_header::HeaderError>(())
//! ```
//!
//! # Reading
//!
//! [`BufferView`] validates a byte slice and resolves every pointer with
//! bounds and alignment checks. Lookups scan short directories linearly and
//! binary search longer ones, which is why the builder sorts the directory
//! before publishing.

pub mod builder;
pub mod error;
pub mod header;
pub mod view;

pub use builder::{sort_by_identifier, sort_directory, BufferBuilder};
pub use error::{HeaderError, HeaderResult};
pub use header::{
    Header, RootHeader, SubHeader, VersionedSubHeader, FRAMEWORK_MAGIC, FRAMEWORK_VERSION,
    LINEAR_SCAN_THRESHOLD,
};
pub use view::{BufferView, EntrySummary, Lookup};
