use std::mem;

use inplace_ptr::{RelPtr, RelSpan};
use inplace_types::{Magic, PlatformBits, Relocatable, Version};
use serde::Serialize;
use zerocopy::FromBytes;

use crate::error::{HeaderError, HeaderResult};
use crate::header::{
    first_unsorted, locate, Header, RootHeader, SubHeader, VersionedSubHeader, FRAMEWORK_VERSION,
};

/// Outcome of a versioned sub-header lookup.
#[derive(Debug)]
pub enum Lookup<'a, H> {
    Found(&'a H),
    /// Present, but written with a layout `H` cannot read.
    Incompatible { stored: Version },
    Absent,
}

impl<'a, H> Lookup<'a, H> {
    pub fn found(self) -> Option<&'a H> {
        match self {
            Lookup::Found(header) => Some(header),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// A summary of one directory entry, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub index: usize,
    pub offset: usize,
    pub identifier: Magic,
    pub version: Version,
    pub provenance: String,
}

/// Read access to a buffer in memory.
///
/// All pointer resolution is checked against the buffer bounds and the
/// target's alignment, so a corrupt or hostile buffer yields `None` rather
/// than an out-of-range read.
#[derive(Clone, Copy, Debug)]
pub struct BufferView<'a> {
    bytes: &'a [u8],
    root: &'a RootHeader,
}

impl<'a> BufferView<'a> {
    /// Open a buffer, checking size, alignment, framework magic and
    /// compatibility, in that order.
    pub fn new(bytes: &'a [u8]) -> HeaderResult<Self> {
        let view = Self::unvalidated(bytes)?;
        let root = view.root();
        if !root.magic_valid() {
            return Err(HeaderError::MagicMismatch {
                found: root.framework_magic,
            });
        }
        if !Version::binary_compatible(&FRAMEWORK_VERSION, &root.framework_version) {
            return Err(HeaderError::IncompatibleVersion {
                supported: FRAMEWORK_VERSION,
                found: root.framework_version,
            });
        }
        if !root.platform.is_current() {
            return Err(HeaderError::PlatformMismatch {
                expected: PlatformBits::current(),
                found: root.platform,
            });
        }
        Ok(view)
    }

    /// Open a buffer checking only that a root header fits. For diagnostics
    /// on buffers that fail [`BufferView::new`].
    pub fn unvalidated(bytes: &'a [u8]) -> HeaderResult<Self> {
        let required = mem::size_of::<RootHeader>();
        if bytes.len() < required {
            return Err(HeaderError::BufferTooSmall {
                required,
                actual: bytes.len(),
            });
        }
        let (root, _) =
            RootHeader::ref_from_prefix(bytes).map_err(|_| HeaderError::Misaligned {
                required: mem::align_of::<RootHeader>(),
                address: bytes.as_ptr() as usize,
            })?;
        Ok(Self { bytes, root })
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn root(&self) -> &'a RootHeader {
        self.root
    }

    /// The `T` stored at `offset`, if it lies inside the buffer and is
    /// aligned.
    pub fn at<T: Relocatable>(&self, offset: usize) -> Option<&'a T> {
        let end = offset.checked_add(mem::size_of::<T>())?;
        T::ref_from_bytes(self.bytes.get(offset..end)?).ok()
    }

    /// `len` consecutive `T`s starting at `offset`.
    pub fn slice_at<T: Relocatable>(&self, offset: usize, len: usize) -> Option<&'a [T]> {
        let size = len.checked_mul(mem::size_of::<T>())?;
        let end = offset.checked_add(size)?;
        <[T]>::ref_from_bytes_with_elems(self.bytes.get(offset..end)?, len).ok()
    }

    /// Offset of `value` inside the buffer, if it lies within it.
    pub fn offset_of<T>(&self, value: &T) -> Option<usize> {
        let offset = (value as *const T as usize).checked_sub(self.bytes.as_ptr() as usize)?;
        (offset.checked_add(mem::size_of::<T>())? <= self.bytes.len()).then_some(offset)
    }

    /// Follow a pointer that lives in this buffer.
    pub fn resolve<T: Relocatable>(&self, ptr: &RelPtr<T>) -> Option<&'a T> {
        let target = ptr.target_offset(self.offset_of(ptr)?)?;
        self.at(target)
    }

    /// Follow a span that lives in this buffer. Empty spans give an empty
    /// slice.
    pub fn resolve_slice<T: Relocatable>(&self, span: &RelSpan<T>) -> Option<&'a [T]> {
        if span.is_empty() {
            return Some(&[]);
        }
        let data_offset = self.offset_of(span)? + RelSpan::<T>::DATA_OFFSET;
        let target = span.data().target_offset(data_offset)?;
        self.slice_at(target, span.len())
    }

    /// The directory entries, `None` if the span points outside the buffer.
    pub fn directory(&self) -> Option<&'a [RelPtr<Header>]> {
        self.resolve_slice(&self.root().sub_headers)
    }

    pub fn directory_len(&self) -> usize {
        self.root().directory_len()
    }

    fn entries(&self) -> &'a [RelPtr<Header>] {
        self.directory().unwrap_or(&[])
    }

    fn identifier_at(&self, entries: &'a [RelPtr<Header>], index: usize) -> Option<Magic> {
        entries.get(index).and_then(|e| self.resolve(e)).map(|h| h.identifier)
    }

    /// Directory entries that resolve, in directory order.
    pub fn sub_headers(&self) -> impl Iterator<Item = &'a Header> + 'a {
        let view = *self;
        self.entries().iter().filter_map(move |entry| view.resolve(entry))
    }

    pub fn find_by_magic(&self, identifier: &Magic) -> Option<&'a Header> {
        let entries = self.entries();
        let index = locate(entries.len(), identifier, |i| self.identifier_at(entries, i))?;
        self.resolve(&entries[index])
    }

    /// Find the sub-header `H`. `None` if absent, unresolvable, or too small
    /// to be an `H`.
    pub fn find<H: SubHeader>(&self) -> Option<&'a H> {
        let header = self.find_by_magic(&H::IDENTIFIER)?;
        self.at(self.offset_of(header)?)
    }

    /// Find the sub-header `H` if its version is readable. Absent and
    /// incompatible both give `None`; see [`BufferView::lookup`].
    pub fn find_supported<H: VersionedSubHeader>(&self) -> Option<&'a H> {
        self.lookup::<H>().found()
    }

    pub fn lookup<H: VersionedSubHeader>(&self) -> Lookup<'a, H> {
        match self.find::<H>() {
            None => Lookup::Absent,
            Some(found) => {
                let stored = found.header().version;
                if Version::binary_compatible(&H::VERSION_SUPPORTED, &stored) {
                    Lookup::Found(found)
                } else {
                    Lookup::Incompatible { stored }
                }
            }
        }
    }

    /// Check that every directory entry resolves and the directory is
    /// sorted. Returns the number of entries.
    pub fn verify_directory(&self) -> HeaderResult<usize> {
        let entries = self.directory().ok_or(HeaderError::DirectoryOutOfBounds)?;
        if let Some(index) = entries.iter().position(|e| self.resolve(e).is_none()) {
            return Err(HeaderError::HeaderOutOfBounds { index });
        }
        if let Some(index) = first_unsorted(entries.len(), |i| self.identifier_at(entries, i)) {
            return Err(HeaderError::UnsortedDirectory { index });
        }
        Ok(entries.len())
    }

    pub fn summarize(&self) -> Vec<EntrySummary> {
        self.entries()
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let header = self.resolve(entry)?;
                Some(EntrySummary {
                    index,
                    offset: self.offset_of(header)?,
                    identifier: header.identifier,
                    version: header.version,
                    provenance: header.provenance.to_string(),
                })
            })
            .collect()
    }
}
