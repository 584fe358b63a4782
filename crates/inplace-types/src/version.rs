use std::fmt;

use serde::{Deserialize, Serialize};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Semantic version of a buffer layout.
///
/// Versions are not ordered. The only relation defined between two versions
/// is [`Version::binary_compatible`]: same-major layouts share their common
/// prefix, and a newer minor only appends fields, so a reader that knows a
/// higher or equal minor can safely ignore what it does not understand.
///
/// The default value is the invalid sentinel, which is never compatible
/// with anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// Field value marking an absent version.
    pub const INVALID_VALUE: u32 = u32::MAX;

    /// The absent/invalid version.
    pub const INVALID: Self = Self {
        major: Self::INVALID_VALUE,
        minor: Self::INVALID_VALUE,
        patch: Self::INVALID_VALUE,
    };

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Returns `false` for the sentinel.
    pub const fn is_valid(&self) -> bool {
        self.major != Self::INVALID_VALUE
    }

    /// Whether data stored with version `loaded` can be read by code that
    /// supports version `supported`.
    ///
    /// Requires `loaded` to be valid, the majors to match exactly and the
    /// supported minor to be at least the loaded minor. Patch is ignored.
    pub const fn binary_compatible(supported: &Version, loaded: &Version) -> bool {
        loaded.is_valid() && supported.major == loaded.major && supported.minor >= loaded.minor
    }

    /// `Version::binary_compatible(self, loaded)`.
    pub const fn can_read(&self, loaded: &Version) -> bool {
        Self::binary_compatible(self, loaded)
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        } else {
            f.write_str("invalid")
        }
    }
}
