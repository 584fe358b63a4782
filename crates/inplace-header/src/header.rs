use std::cmp::Ordering;

use inplace_ptr::{RelPtr, RelSpan};
use inplace_types::{GitHash, Magic, PlatformBits, Relocatable, Version};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Framework magic stored in every root header.
pub const FRAMEWORK_MAGIC: Magic = Magic::new("INPLACE-BUFFER>>");

/// Version of the root header layout written by this crate.
pub const FRAMEWORK_VERSION: Version = Version::new(0, 1, 0);

/// Directories shorter than this are scanned linearly; longer ones are
/// binary searched. Lookups in an unsorted long directory may miss entries.
pub const LINEAR_SCAN_THRESHOLD: usize = 16;

/// Common prefix of every sub-header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct Header {
    pub identifier: Magic,
    pub version: Version,
    /// Source revision of the writer. Informational only.
    pub provenance: GitHash,
}

impl Header {
    pub const fn new(identifier: Magic, version: Version) -> Self {
        Self {
            identifier,
            version,
            provenance: GitHash::UNKNOWN,
        }
    }

    /// Header for `H` at the version the running code supports.
    pub const fn current<H: VersionedSubHeader>() -> Self {
        Self::new(H::IDENTIFIER, H::VERSION_SUPPORTED)
    }

    pub const fn with_provenance(mut self, provenance: GitHash) -> Self {
        self.provenance = provenance;
        self
    }

    /// The directory order.
    pub fn cmp_identifier(&self, other: &Header) -> Ordering {
        self.identifier.cmp(&other.identifier)
    }
}

/// A typed header that can be registered in a buffer's directory.
///
/// # Safety
///
/// The implementing type must be `#[repr(C)]` with a [`Header`] as its first
/// field, so that a pointer to the header is also a pointer to `Self`.
pub unsafe trait SubHeader: Relocatable {
    const IDENTIFIER: Magic;

    fn header(&self) -> &Header {
        unsafe { &*(self as *const Self).cast::<Header>() }
    }

    fn header_mut(&mut self) -> &mut Header {
        unsafe { &mut *(self as *mut Self).cast::<Header>() }
    }
}

/// A sub-header whose layout is versioned.
pub trait VersionedSubHeader: SubHeader {
    /// Newest layout the running code understands.
    const VERSION_SUPPORTED: Version;
}

/// The first object in every buffer.
///
/// Identifies the buffer's content, the framework that wrote it and the
/// writer's platform, and references the directory of sub-headers.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct RootHeader {
    /// Application-chosen tag for the buffer's content.
    pub identifier: Magic,
    pub framework_magic: Magic,
    pub framework_version: Version,
    _reserved: u32,
    pub platform: PlatformBits,
    /// Sub-headers, sorted by identifier once published.
    pub sub_headers: RelSpan<RelPtr<Header>>,
}

impl RootHeader {
    pub const fn new(identifier: Magic) -> Self {
        Self {
            identifier,
            framework_magic: FRAMEWORK_MAGIC,
            framework_version: FRAMEWORK_VERSION,
            _reserved: 0,
            platform: PlatformBits::current(),
            sub_headers: RelSpan::empty(),
        }
    }

    pub fn magic_valid(&self) -> bool {
        self.framework_magic == FRAMEWORK_MAGIC
    }

    /// Framework version readable by this crate and written on a platform
    /// with the same word size and byte order.
    pub fn binary_compatible(&self) -> bool {
        Version::binary_compatible(&FRAMEWORK_VERSION, &self.framework_version)
            && self.platform.is_current()
    }

    pub fn directory_len(&self) -> usize {
        self.sub_headers.len()
    }

    /// Find the sub-header `H` by following raw pointers.
    ///
    /// # Safety
    ///
    /// The root must sit in a well-formed buffer: every directory entry must
    /// point at a live header that is as large as the type it is tagged as,
    /// and a directory of [`LINEAR_SCAN_THRESHOLD`] or more entries must be
    /// sorted. Debug builds check the order on every call. Use
    /// [`BufferView`](crate::BufferView) for buffers from untrusted sources.
    pub unsafe fn find<H: SubHeader>(&self) -> Option<&H> {
        let entries = self.sub_headers.as_slice();
        let identifier_at = |i: usize| entries[i].as_ref().map(|h| h.identifier);
        debug_assert!(
            entries.len() < LINEAR_SCAN_THRESHOLD || is_sorted(entries.len(), identifier_at),
            "header directory must be sorted by identifier"
        );
        let index = locate(entries.len(), &H::IDENTIFIER, identifier_at)?;
        entries[index].as_ptr().cast::<H>().as_ref()
    }

    /// [`RootHeader::find`] restricted to versions `H` can read.
    ///
    /// # Safety
    ///
    /// As for [`RootHeader::find`].
    pub unsafe fn find_supported<H: VersionedSubHeader>(&self) -> Option<&H> {
        self.find::<H>()
            .filter(|h| Version::binary_compatible(&H::VERSION_SUPPORTED, &h.header().version))
    }
}

impl std::fmt::Debug for RootHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootHeader")
            .field("identifier", &self.identifier)
            .field("framework_magic", &self.framework_magic)
            .field("framework_version", &self.framework_version)
            .field("platform", &self.platform)
            .field("sub_headers", &self.sub_headers)
            .finish()
    }
}

/// Index of the entry tagged `identifier` in a directory of `len` entries.
///
/// `identifier_at` yields `None` for an entry that cannot be resolved. Such
/// entries never match a linear scan and abort a binary search. An unsorted
/// long directory may miss entries but never yields a wrong one.
pub(crate) fn locate<F>(len: usize, identifier: &Magic, identifier_at: F) -> Option<usize>
where
    F: Fn(usize) -> Option<Magic>,
{
    if len < LINEAR_SCAN_THRESHOLD {
        return (0..len).find(|&i| identifier_at(i).as_ref() == Some(identifier));
    }

    // Lower bound.
    let (mut low, mut high) = (0, len);
    while low < high {
        let mid = low + (high - low) / 2;
        if identifier_at(mid)? < *identifier {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    (low < len && identifier_at(low)? == *identifier).then_some(low)
}

/// Entries that cannot be resolved are ignored.
pub(crate) fn first_unsorted<F>(len: usize, identifier_at: F) -> Option<usize>
where
    F: Fn(usize) -> Option<Magic>,
{
    (1..len).find(|&i| match (identifier_at(i - 1), identifier_at(i)) {
        (Some(prev), Some(next)) => prev > next,
        _ => false,
    })
}

fn is_sorted<F>(len: usize, identifier_at: F) -> bool
where
    F: Fn(usize) -> Option<Magic>,
{
    first_unsorted(len, identifier_at).is_none()
}
