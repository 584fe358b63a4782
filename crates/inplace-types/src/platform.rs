use std::fmt;

use serde::{Deserialize, Serialize};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Fingerprint of the low-level data representation of a process.
///
/// Relative pointer arithmetic and raw field layouts assume the reader has
/// the same word size and byte order as the writer, so a buffer records the
/// writer's fingerprint and readers compare it against their own.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(transparent)]
pub struct PlatformBits(u64);

impl PlatformBits {
    pub const X32: u64 = 1 << 0;
    pub const X64: u64 = 1 << 1;
    pub const ENDIAN_BIG: u64 = 1 << 2;
    pub const ENDIAN_LITTLE: u64 = 1 << 3;

    /// Fingerprint of the running process.
    pub const fn current() -> Self {
        let mut bits = 0;
        if cfg!(target_pointer_width = "32") {
            bits |= Self::X32;
        }
        if cfg!(target_pointer_width = "64") {
            bits |= Self::X64;
        }
        if cfg!(target_endian = "big") {
            bits |= Self::ENDIAN_BIG;
        }
        if cfg!(target_endian = "little") {
            bits |= Self::ENDIAN_LITTLE;
        }
        Self(bits)
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u64 {
        self.0
    }

    pub const fn contains(&self, flag: u64) -> bool {
        self.0 & flag == flag
    }

    pub fn is_current(&self) -> bool {
        *self == Self::current()
    }
}

impl Default for PlatformBits {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Debug for PlatformBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlatformBits({:#06b}: {self})", self.0)
    }
}

impl fmt::Display for PlatformBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = match (self.contains(Self::X32), self.contains(Self::X64)) {
            (true, false) => "32-bit",
            (false, true) => "64-bit",
            _ => "unknown-width",
        };
        let endian = match (self.contains(Self::ENDIAN_BIG), self.contains(Self::ENDIAN_LITTLE)) {
            (true, false) => "big-endian",
            (false, true) => "little-endian",
            _ => "unknown-endian",
        };
        write!(f, "{width} {endian}")
    }
}
