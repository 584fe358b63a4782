use std::mem;

use inplace_types::Relocatable;
use tracing::trace;
use zerocopy::FromBytes;

use crate::cursor;
use crate::error::{ArenaError, ArenaResult};

/// A bump allocator over caller-owned bytes.
///
/// Objects are handed out as plain references for the lifetime of the range
/// and are never dropped. The range cannot grow, so running out of room is
/// always an error.
#[derive(Debug)]
pub struct ForeignArena<'a> {
    remaining: &'a mut [u8],
    len: usize,
}

impl<'a> ForeignArena<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        let len = bytes.len();
        Self {
            remaining: bytes,
            len,
        }
    }

    pub fn capacity(&self) -> usize {
        self.len
    }

    pub fn bytes_allocated(&self) -> usize {
        self.len - self.remaining.len()
    }

    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Carve out `size` bytes aligned to `align`.
    pub fn allocate(&mut self, size: usize, align: usize) -> ArenaResult<&'a mut [u8]> {
        let base = self.remaining.as_ptr() as usize;
        let (start, end) = cursor::plan(base, 0, size, align)?;
        if end > self.remaining.len() {
            return Err(ArenaError::OutOfMemory {
                requested: size,
                available: self.remaining.len(),
                align,
            });
        }
        let rest = mem::take(&mut self.remaining);
        let (_, rest) = rest.split_at_mut(start);
        let (bytes, rest) = rest.split_at_mut(size);
        self.remaining = rest;
        trace!(offset = self.bytes_allocated() - size, size, align, "foreign allocation");
        Ok(bytes)
    }

    /// Carve out room for `count` values of `T`.
    fn allocate_for<T: Relocatable>(&mut self, count: usize) -> ArenaResult<&'a mut [u8]> {
        let size = cursor::array_size(count, mem::size_of::<T>())?;
        self.allocate(size, mem::align_of::<T>())
    }

    pub fn alloc_value<T: Relocatable>(&mut self, value: T) -> ArenaResult<&'a mut T> {
        let bytes = self.allocate_for::<T>(1)?;
        bytes.copy_from_slice(value.as_bytes());
        T::mut_from_bytes(bytes).map_err(|_| misplaced::<T>())
    }

    pub fn alloc_zeroed<T: Relocatable>(&mut self) -> ArenaResult<&'a mut T> {
        let bytes = self.allocate_for::<T>(1)?;
        bytes.fill(0);
        T::mut_from_bytes(bytes).map_err(|_| misplaced::<T>())
    }

    pub fn alloc_array_zeroed<T: Relocatable>(&mut self, count: usize) -> ArenaResult<&'a mut [T]> {
        let bytes = self.allocate_for::<T>(count)?;
        bytes.fill(0);
        <[T]>::mut_from_bytes_with_elems(bytes, count).map_err(|_| misplaced::<T>())
    }

    pub fn alloc_array_fill<T: Relocatable + Clone>(
        &mut self,
        count: usize,
        value: T,
    ) -> ArenaResult<&'a mut [T]> {
        let items = self.alloc_array_zeroed(count)?;
        items.fill(value);
        Ok(items)
    }

    pub fn alloc_array_from<T, I>(&mut self, items: I) -> ArenaResult<&'a mut [T]>
    where
        T: Relocatable,
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let items = items.into_iter();
        let array = self.alloc_array_zeroed(items.len())?;
        for (slot, item) in array.iter_mut().zip(items) {
            *slot = item;
        }
        Ok(array)
    }
}

/// `allocate` aligns every piece, so a cast can only fail if that is broken.
fn misplaced<T>() -> ArenaError {
    ArenaError::InvalidAlignment(mem::align_of::<T>())
}

#[cfg(test)]
mod tests {
    use zerocopy::IntoBytes;

    use super::*;

    fn aligned(words: usize) -> Vec<u64> {
        vec![0xffff_ffff_ffff_ffff; words]
    }


    #[test]
    fn carves_aligned_pieces() {
        let mut words = aligned(4);
        let bytes = words.as_mut_bytes();
        let start = bytes.as_ptr() as usize;
        let mut arena = ForeignArena::new(bytes);

        let a = arena.alloc_value(1u8).unwrap() as *mut u8 as usize;
        let b = arena.alloc_value(2u32).unwrap() as *mut u32 as usize;
        let c = arena.alloc_value(3u64).unwrap() as *mut u64 as usize;
        assert_eq!((a - start, b - start, c - start), (0, 4, 8));
        assert_eq!(arena.bytes_allocated(), 16);
        assert_eq!(arena.remaining(), 16);
    }

    #[test]
    fn references_stay_usable() {
        let mut words = aligned(8);
        let mut arena = ForeignArena::new(words.as_mut_bytes());
        let first = arena.alloc_value(10u32).unwrap();
        let rest = arena.alloc_array_from([1u16, 2, 3]).unwrap();
        let zeros = arena.alloc_array_zeroed::<u32>(2).unwrap();
        *first += 1;
        rest[0] = 100;
        assert_eq!(*first, 11);
        assert_eq!(rest, &[100, 2, 3]);
        assert_eq!(zeros, &[0, 0]);
        assert_eq!(arena.alloc_zeroed::<u64>().map(|v| *v), Ok(0));
    }

    #[test]
    fn overflow_is_hard_error() {
        let mut words = aligned(1);
        let mut arena = ForeignArena::new(words.as_mut_bytes());
        arena.alloc_value(1u32).unwrap();
        let err = arena.alloc_value(2u64).unwrap_err();
        assert_eq!(
            err,
            ArenaError::OutOfMemory {
                requested: 8,
                available: 4,
                align: 8
            }
        );
        assert_eq!(arena.bytes_allocated(), 4);
        assert!(arena.alloc_value(2u32).is_ok());
    }

    #[test]
    fn fill_and_invalid_alignment() {
        let mut words = aligned(2);
        let mut arena = ForeignArena::new(words.as_mut_bytes());
        assert_eq!(arena.alloc_array_fill(3, 9u8).unwrap(), &[9, 9, 9]);
        assert_eq!(
            arena.allocate(1, 6).unwrap_err(),
            ArenaError::InvalidAlignment(6)
        );
    }
}
