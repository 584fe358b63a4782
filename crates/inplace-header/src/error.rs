use inplace_arena::ArenaError;
use inplace_types::{Magic, PlatformBits, Version};
use thiserror::Error;

/// Reasons a buffer cannot be built or opened.
#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("buffer too small: need at least {required} bytes, got {actual}")]
    BufferTooSmall { required: usize, actual: usize },

    #[error("buffer at {address:#x} is not aligned to {required} bytes")]
    Misaligned { required: usize, address: usize },

    #[error("not an inplace buffer: framework magic is {found}")]
    MagicMismatch { found: Magic },

    #[error("incompatible framework version {found}, supported {supported}")]
    IncompatibleVersion { supported: Version, found: Version },

    #[error("written on a different platform ({found}), this is {expected}")]
    PlatformMismatch {
        expected: PlatformBits,
        found: PlatformBits,
    },

    #[error("header directory lies outside the buffer")]
    DirectoryOutOfBounds,

    #[error("header directory entry {index} lies outside the buffer")]
    HeaderOutOfBounds { index: usize },

    #[error("header directory is not sorted at entry {index}")]
    UnsortedDirectory { index: usize },

    #[error(transparent)]
    Arena(#[from] ArenaError),
}

pub type HeaderResult<T> = Result<T, HeaderError>;
