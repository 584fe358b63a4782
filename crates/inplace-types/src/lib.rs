//! Foundation types for inplace buffers.
//!
//! An inplace buffer is a single contiguous byte region that is read by
//! reinterpreting it directly, with no decode step. Every other `inplace`
//! crate depends on the small fixed-layout types defined here.
//!
//! # Key Types
//!
//! - [`Relocatable`]: marker for plain data that may live inside a buffer
//! - [`Magic`]: 16-byte identifier used as a format tag and directory key
//! - [`Version`]: major/minor/patch triple with a binary compatibility rule
//! - [`GitHash`]: 40-byte provenance string carried by every header
//! - [`PlatformBits`]: word size and byte order fingerprint

pub mod error;
pub mod magic;
pub mod platform;
pub mod relocatable;
pub mod version;

pub use error::{TypeError, TypeResult};
pub use magic::{GitHash, Magic};
pub use platform::PlatformBits;
pub use relocatable::Relocatable;
pub use version::Version;
