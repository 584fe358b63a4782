use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{TypeError, TypeResult};

/// Copy `src` into a zero-padded array, panicking if it does not fit.
///
/// In a const context the panic is a compile-time error.
const fn padded<const N: usize>(src: &[u8]) -> [u8; N] {
    assert!(src.len() <= N, "string does not fit the fixed-size field");
    let mut out = [0u8; N];
    let mut i = 0;
    while i < src.len() {
        out[i] = src[i];
        i += 1;
    }
    out
}

fn try_padded<const N: usize>(src: &[u8]) -> TypeResult<[u8; N]> {
    if src.len() > N {
        return Err(TypeError::TooLong {
            max: N,
            actual: src.len(),
        });
    }
    let mut out = [0u8; N];
    out[..src.len()].copy_from_slice(src);
    Ok(out)
}

/// Bytes up to the first zero, decoded lossily.
fn trimmed_lossy(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// A 16-byte identifier used as a format tag and as the directory key.
///
/// Shorter strings are zero padded. Equality is exact byte comparison and the
/// ordering is lexicographic over the unsigned bytes, which is the order the
/// header directory is sorted in.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(transparent)]
pub struct Magic([u8; 16]);

impl Magic {
    /// Size of a magic value in bytes.
    pub const LEN: usize = 16;

    /// Build a magic value from a string of at most 16 bytes.
    ///
    /// # Panics
    ///
    /// Panics if `s` is longer than 16 bytes. Used to define `const` magic
    /// values, where the panic becomes a compile error.
    pub const fn new(s: &str) -> Self {
        Self(padded(s.as_bytes()))
    }

    /// Fallible counterpart of [`Magic::new`] for runtime input.
    pub fn try_new(s: &str) -> TypeResult<Self> {
        try_padded(s.as_bytes()).map(Self)
    }

    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// The all-zero magic.
    pub const fn zeroed() -> Self {
        Self([0u8; 16])
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8; 16] {
        &mut self.0
    }

    /// Text up to the first zero byte, with invalid UTF-8 replaced.
    pub fn to_string_lossy(&self) -> String {
        trimmed_lossy(&self.0)
    }

    /// Hex encoding of all 16 bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 32-character hex string.
    pub fn from_hex(s: &str) -> TypeResult<Self> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let arr: [u8; 16] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| TypeError::InvalidLength {
                expected: Self::LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    fn is_printable(&self) -> bool {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(16);
        self.0[..end].iter().all(|b| b.is_ascii_graphic() || *b == b' ')
            && self.0[end..].iter().all(|&b| b == 0)
    }
}

impl fmt::Debug for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_printable() {
            write!(f, "Magic({:?})", self.to_string_lossy())
        } else {
            write!(f, "Magic(0x{})", self.to_hex())
        }
    }
}

impl fmt::Display for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_printable() {
            f.write_str(&self.to_string_lossy())
        } else {
            write!(f, "0x{}", self.to_hex())
        }
    }
}

impl From<[u8; 16]> for Magic {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Magic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Magic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.strip_prefix("0x") {
            Some(digits) if digits.len() == 2 * Self::LEN => Magic::from_hex(digits),
            _ => Magic::try_new(&s),
        }
        .map_err(serde::de::Error::custom)
    }
}

/// A 40-byte provenance string, typically the writer's git commit hash.
///
/// Carried by every header for traceability and never interpreted.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(transparent)]
pub struct GitHash([u8; 40]);

impl GitHash {
    /// Size of a provenance string in bytes.
    pub const LEN: usize = 40;

    /// No provenance recorded.
    pub const UNKNOWN: Self = Self([0u8; 40]);

    /// Build from a string of at most 40 bytes.
    ///
    /// # Panics
    ///
    /// Panics if `s` is longer than 40 bytes.
    pub const fn new(s: &str) -> Self {
        Self(padded(s.as_bytes()))
    }

    pub fn try_new(s: &str) -> TypeResult<Self> {
        try_padded(s.as_bytes()).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 40] {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == [0u8; 40]
    }

    pub fn to_string_lossy(&self) -> String {
        trimmed_lossy(&self.0)
    }
}

impl Default for GitHash {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl fmt::Debug for GitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GitHash({:?})", self.to_string_lossy())
    }
}

impl fmt::Display for GitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            f.write_str("unknown")
        } else {
            f.write_str(&self.to_string_lossy())
        }
    }
}

impl Serialize for GitHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_lossy())
    }
}

impl<'de> Deserialize<'de> for GitHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        GitHash::try_new(&s).map_err(serde::de::Error::custom)
    }
}
