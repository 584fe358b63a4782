use std::fmt;
use std::marker::PhantomData;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::ptr::RelPtr;

const DATA: usize = 0;
const LEN: usize = 1;

/// A relative pointer to the first element of an array plus its length.
///
/// Stored as two words: the relation of the first element, measured from
/// the start of the span, then the element count.
///
/// Indexing, iteration and front/back access go through the slice returned
/// by [`RelSpan::as_slice`].
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(transparent)]
pub struct RelSpan<T> {
    words: [i64; 2],
    _marker: PhantomData<T>,
}

impl<T> RelSpan<T> {
    /// Byte offset of the data pointer inside the span.
    pub const DATA_OFFSET: usize = DATA * std::mem::size_of::<i64>();

    pub const fn empty() -> Self {
        Self {
            words: [RelPtr::<T>::NULL_RELATION, 0],
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.words[LEN] as u64 as usize
    }

    pub fn is_empty(&self) -> bool {
        self.words[LEN] == 0 || self.data().is_null()
    }

    /// The pointer to the first element.
    pub fn data(&self) -> &RelPtr<T> {
        RelPtr::from_word(&self.words[DATA])
    }

    fn data_mut(&mut self) -> &mut RelPtr<T> {
        RelPtr::from_word_mut(&mut self.words[DATA])
    }

    fn set_len(&mut self, len: usize) {
        self.words[LEN] = len as u64 as i64;
    }

    /// Size of the referenced elements in bytes, `None` on overflow.
    pub fn byte_len(&self) -> Option<usize> {
        self.len().checked_mul(std::mem::size_of::<T>())
    }

    /// Refer to `items`, which must live in the same buffer as `self`.
    pub fn set(&mut self, items: &[T]) {
        if items.is_empty() {
            self.clear();
        } else {
            self.set_raw(items.as_ptr(), items.len());
        }
    }

    pub fn set_raw(&mut self, first: *const T, len: usize) {
        self.data_mut().set_ptr(first);
        self.set_len(len);
    }

    /// Set from offsets inside one buffer: the span is stored at `self_offset`
    /// and its first element at `target_offset`.
    pub fn set_offsets(&mut self, self_offset: usize, target_offset: usize, len: usize) {
        let data_offset = self_offset + Self::DATA_OFFSET;
        self.data_mut()
            .set_relation(RelPtr::<T>::relation_between(data_offset, target_offset));
        self.set_len(len);
    }

    pub fn clear(&mut self) {
        self.data_mut().clear();
        self.set_len(0);
    }

    pub fn as_ptr(&self) -> *const T {
        self.data().as_ptr()
    }

    /// View the elements without any checks.
    ///
    /// # Safety
    ///
    /// Unless the span is empty, `len` consecutive live, aligned `T`s must
    /// start at the target for the lifetime of the returned slice.
    pub unsafe fn as_slice(&self) -> &[T] {
        if self.is_empty() {
            return &[];
        }
        std::slice::from_raw_parts(self.data().as_ptr(), self.len())
    }

    /// Mutable counterpart of [`RelSpan::as_slice`].
    ///
    /// # Safety
    ///
    /// As for [`RelSpan::as_slice`], and the elements must not be aliased.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [T] {
        if self.is_empty() {
            return &mut [];
        }
        let len = self.len();
        std::slice::from_raw_parts_mut(self.data_mut().as_mut_ptr(), len)
    }
}

impl<T> Default for RelSpan<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> fmt::Debug for RelSpan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelSpan")
            .field("data", self.data())
            .field("len", &self.len())
            .finish()
    }
}
