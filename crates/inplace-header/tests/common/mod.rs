#![allow(dead_code)]

use inplace_header::{Header, SubHeader, VersionedSubHeader};
use inplace_ptr::RelSpan;
use inplace_types::{Magic, Version};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct Ext1 {
    pub header: Header,
    pub value: u32,
}

unsafe impl SubHeader for Ext1 {
    const IDENTIFIER: Magic = Magic::new("EXT1");
}

impl VersionedSubHeader for Ext1 {
    const VERSION_SUPPORTED: Version = Version::new(1, 0, 0);
}

#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct Ext2 {
    pub header: Header,
    pub value: u32,
}

unsafe impl SubHeader for Ext2 {
    const IDENTIFIER: Magic = Magic::new("EXT2");
}

impl VersionedSubHeader for Ext2 {
    const VERSION_SUPPORTED: Version = Version::new(2, 3, 0);
}

/// A sub-header referencing an array of ints elsewhere in the buffer.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct AppHeader {
    pub header: Header,
    pub _reserved: u32,
    pub data: RelSpan<i32>,
}

unsafe impl SubHeader for AppHeader {
    const IDENTIFIER: Magic = Magic::new("APP");
}

impl VersionedSubHeader for AppHeader {
    const VERSION_SUPPORTED: Version = Version::new(1, 0, 0);
}

impl AppHeader {
    pub fn with_version(version: Version) -> Self {
        Self {
            header: Header::new(Self::IDENTIFIER, version),
            _reserved: 0,
            data: RelSpan::empty(),
        }
    }
}

/// Identifier that sorts apart from every named one: a counter in the first
/// four bytes.
pub fn numbered(id: u32) -> Magic {
    let mut bytes = [0u8; 16];
    bytes[..4].copy_from_slice(&id.to_ne_bytes());
    Magic::from_bytes(bytes)
}

/// Copy `bytes` into fresh 8-byte aligned storage at a new address.
pub fn relocated(bytes: &[u8]) -> Vec<u64> {
    let mut words = vec![0u64; bytes.len().div_ceil(8) + 1];
    for (word, chunk) in words.iter_mut().zip(bytes.chunks(8)) {
        let mut raw = [0u8; 8];
        raw[..chunk.len()].copy_from_slice(chunk);
        *word = u64::from_ne_bytes(raw);
    }
    words
}

pub fn word_bytes(words: &[u64], len: usize) -> &[u8] {
    &words.as_bytes()[..len]
}
