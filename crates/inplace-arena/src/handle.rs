use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::mem;

/// Byte offset from the start of an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ArenaOffset(usize);

impl ArenaOffset {
    pub const ZERO: Self = Self(0);

    pub const fn new(offset: usize) -> Self {
        Self(offset)
    }

    pub const fn as_usize(self) -> usize {
        self.0
    }

    pub fn checked_add(self, bytes: usize) -> Option<Self> {
        self.0.checked_add(bytes).map(Self)
    }
}

impl fmt::Display for ArenaOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl From<ArenaOffset> for usize {
    fn from(offset: ArenaOffset) -> usize {
        offset.0
    }
}

/// A typed reference to one `T` inside an arena.
///
/// Only an offset is stored, so a handle stays valid when the arena is grown
/// or its bytes are copied elsewhere. Resolving one is always bounds checked.
pub struct Handle<T> {
    offset: ArenaOffset,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// A handle for an object at `offset`; checked when resolved.
    pub const fn from_offset(offset: ArenaOffset) -> Self {
        Self {
            offset,
            _marker: PhantomData,
        }
    }

    pub const fn offset(self) -> ArenaOffset {
        self.offset
    }

    /// Reinterpret the object as a `U` starting at the same offset.
    ///
    /// Safe because every resolution re-checks bounds and alignment for `U`,
    /// and relocatable types accept any bit pattern.
    pub const fn cast<U>(self) -> Handle<U> {
        Handle::from_offset(self.offset)
    }

    /// Offset of a field `field_offset` bytes into the object.
    pub fn field<U>(self, field_offset: usize) -> Handle<U> {
        Handle::from_offset(ArenaOffset(self.offset.0 + field_offset))
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.offset.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle<{}>({})", std::any::type_name::<T>(), self.offset)
    }
}

/// A typed reference to `len` consecutive `T`s inside an arena.
pub struct ArenaSlice<T> {
    offset: ArenaOffset,
    len: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ArenaSlice<T> {
    pub const fn from_offset(offset: ArenaOffset, len: usize) -> Self {
        Self {
            offset,
            len,
            _marker: PhantomData,
        }
    }

    pub const fn empty() -> Self {
        Self::from_offset(ArenaOffset::ZERO, 0)
    }

    pub const fn offset(self) -> ArenaOffset {
        self.offset
    }

    pub const fn len(self) -> usize {
        self.len
    }

    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    /// Size of the elements in bytes, `None` on overflow.
    pub fn byte_len(self) -> Option<usize> {
        self.len.checked_mul(mem::size_of::<T>())
    }

    /// Handle to element `index`, `None` past the end.
    pub fn get(self, index: usize) -> Option<Handle<T>> {
        if index < self.len {
            Some(Handle::from_offset(ArenaOffset(
                self.offset.0 + index * mem::size_of::<T>(),
            )))
        } else {
            None
        }
    }

    pub fn iter(self) -> impl Iterator<Item = Handle<T>> {
        (0..self.len).filter_map(move |index| self.get(index))
    }
}

impl<T> Clone for ArenaSlice<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArenaSlice<T> {}

impl<T> PartialEq for ArenaSlice<T> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset && self.len == other.len
    }
}

impl<T> Eq for ArenaSlice<T> {}

impl<T> fmt::Debug for ArenaSlice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ArenaSlice<{}>({}, len={})",
            std::any::type_name::<T>(),
            self.offset,
            self.len
        )
    }
}
