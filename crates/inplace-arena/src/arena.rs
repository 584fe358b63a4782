use std::alloc::Layout;
use std::mem;
use std::ptr::NonNull;
use std::slice;

use inplace_ptr::{RelPtr, RelSpan};
use inplace_types::Relocatable;
use tracing::{debug, trace, warn};
use zerocopy::FromBytes;

use crate::config::ArenaConfig;
use crate::cursor;
use crate::error::{ArenaError, ArenaResult};
use crate::handle::{ArenaOffset, ArenaSlice, Handle};
use crate::parent::{Heap, ParentAllocator, Reserved};

/// Alignment of the block an arena requests from its parent.
pub const BASE_ALIGN: usize = 16;

/// A bump allocator over one block of memory owned through `P`.
///
/// The block never moves: growth is attempted strictly in place, so data
/// already written, and every relative pointer between objects, stays
/// where it is. Allocated memory reads as zero until written.
pub struct Arena<P: ParentAllocator = Heap> {
    parent: P,
    base: NonNull<u8>,
    capacity: usize,
    next: usize,
}

// The arena owns its block exclusively.
unsafe impl<P: ParentAllocator + Send> Send for Arena<P> {}

impl Arena<Heap> {
    /// A fixed-size arena on the global heap.
    pub fn new(capacity: usize) -> ArenaResult<Self> {
        Self::with_parent(capacity, Heap)
    }
}

impl Arena<Reserved> {
    /// An arena that can grow in place up to `max_capacity`.
    pub fn reserved(initial_capacity: usize, max_capacity: usize) -> ArenaResult<Self> {
        Self::with_parent(initial_capacity, Reserved::new(max_capacity))
    }

    pub fn from_config(config: &ArenaConfig) -> ArenaResult<Self> {
        config.validate()?;
        Self::with_parent(config.initial_capacity, Reserved::new(config.reservation()))
    }
}

impl<P: ParentAllocator> Arena<P> {
    pub fn with_parent(capacity: usize, mut parent: P) -> ArenaResult<Self> {
        let base = parent.allocate(block_layout(capacity)?)?;
        debug!(capacity, base = ?base.as_ptr(), "arena created");
        Ok(Self {
            parent,
            base,
            capacity,
            next: 0,
        })
    }

    pub fn parent(&self) -> &P {
        &self.parent
    }

    /// Bytes handed out so far, padding included.
    pub fn bytes_allocated(&self) -> usize {
        self.next
    }

    /// Current capacity of the block.
    pub fn bytes_reserved(&self) -> usize {
        self.capacity
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.next
    }

    pub fn is_empty(&self) -> bool {
        self.next == 0
    }

    pub fn base_ptr(&self) -> *const u8 {
        self.base.as_ptr()
    }

    /// The allocated prefix of the block.
    ///
    /// Every byte is initialized: the parent hands out zeroed memory and only
    /// padding-free values are ever written.
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.base.as_ptr(), self.next) }
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(self.base.as_ptr(), self.next) }
    }

    /// `size` allocated bytes at `offset`.
    fn bytes(&self, offset: usize, size: usize) -> Option<&[u8]> {
        self.as_bytes().get(offset..offset.checked_add(size)?)
    }

    fn bytes_mut(&mut self, offset: usize, size: usize) -> Option<&mut [u8]> {
        let end = offset.checked_add(size)?;
        self.as_bytes_mut().get_mut(offset..end)
    }

    /// Reserve `size` bytes aligned to `align`.
    ///
    /// Grows in place when the block is full. On error nothing changes.
    pub fn allocate(&mut self, size: usize, align: usize) -> ArenaResult<ArenaOffset> {
        let (start, end) = cursor::plan(self.base.as_ptr() as usize, self.next, size, align)?;
        if end > self.capacity {
            self.grow(end, size, align)?;
        }
        self.next = end;
        trace!(offset = start, size, align, "arena allocation");
        Ok(ArenaOffset::new(start))
    }

    /// Individual allocations are never freed; see [`Arena::reset`].
    pub fn deallocate(&mut self, _offset: ArenaOffset, _size: usize) {}

    /// Rewind to empty, keeping the block. Previously returned handles and
    /// references become meaningless.
    pub fn reset(&mut self) {
        debug!(released = self.next, capacity = self.capacity, "arena reset");
        self.next = 0;
    }

    fn grow(&mut self, required: usize, size: usize, align: usize) -> ArenaResult<()> {
        let old = block_layout(self.capacity)?;
        let doubled = self.capacity.saturating_mul(2).max(required);
        for target in [doubled, required] {
            if unsafe { self.parent.try_grow_in_place(self.base, old, target) } {
                debug!(from = self.capacity, to = target, "arena grown in place");
                self.capacity = target;
                return Ok(());
            }
        }
        warn!(
            requested = size,
            capacity = self.capacity,
            "arena full and parent cannot grow without moving"
        );
        Err(ArenaError::OutOfMemory {
            requested: size,
            available: self.remaining(),
            align,
        })
    }

    fn zero(&mut self, offset: ArenaOffset, len: usize) {
        if let Some(bytes) = self.bytes_mut(offset.as_usize(), len) {
            bytes.fill(0);
        }
    }

    pub fn alloc_value<T: Relocatable>(&mut self, value: T) -> ArenaResult<Handle<T>> {
        let size = mem::size_of::<T>();
        let offset = self.allocate(size, mem::align_of::<T>())?;
        if let Some(bytes) = self.bytes_mut(offset.as_usize(), size) {
            bytes.copy_from_slice(value.as_bytes());
        }
        Ok(Handle::from_offset(offset))
    }

    /// Allocate a `T` with every byte zero, its "empty" value.
    pub fn alloc_zeroed<T: Relocatable>(&mut self) -> ArenaResult<Handle<T>> {
        let size = mem::size_of::<T>();
        let offset = self.allocate(size, mem::align_of::<T>())?;
        // The bytes may hold data from before a reset.
        self.zero(offset, size);
        Ok(Handle::from_offset(offset))
    }

    pub fn alloc_array_zeroed<T: Relocatable>(
        &mut self,
        count: usize,
    ) -> ArenaResult<ArenaSlice<T>> {
        let size = cursor::array_size(count, mem::size_of::<T>())?;
        let offset = self.allocate(size, mem::align_of::<T>())?;
        self.zero(offset, size);
        Ok(ArenaSlice::from_offset(offset, count))
    }

    pub fn alloc_array_fill<T: Relocatable + Clone>(
        &mut self,
        count: usize,
        value: T,
    ) -> ArenaResult<ArenaSlice<T>> {
        let array = self.alloc_array_zeroed(count)?;
        self.slice_mut(array).fill(value);
        Ok(array)
    }

    /// Allocate an array holding the items of an exact-size sequence.
    pub fn alloc_array_from<T, I>(&mut self, items: I) -> ArenaResult<ArenaSlice<T>>
    where
        T: Relocatable,
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let items = items.into_iter();
        let array = self.alloc_array_zeroed(items.len())?;
        for (slot, item) in self.slice_mut(array).iter_mut().zip(items) {
            *slot = item;
        }
        Ok(array)
    }

    /// `None` unless the value lies inside the allocated range and is
    /// aligned.
    pub fn try_get<T: Relocatable>(&self, handle: Handle<T>) -> Option<&T> {
        let bytes = self.bytes(handle.offset().as_usize(), mem::size_of::<T>())?;
        T::ref_from_bytes(bytes).ok()
    }

    pub fn try_get_mut<T: Relocatable>(&mut self, handle: Handle<T>) -> Option<&mut T> {
        let bytes = self.bytes_mut(handle.offset().as_usize(), mem::size_of::<T>())?;
        T::mut_from_bytes(bytes).ok()
    }

    pub fn try_slice<T: Relocatable>(&self, array: ArenaSlice<T>) -> Option<&[T]> {
        let bytes = self.bytes(array.offset().as_usize(), array.byte_len()?)?;
        <[T]>::ref_from_bytes_with_elems(bytes, array.len()).ok()
    }

    pub fn try_slice_mut<T: Relocatable>(&mut self, array: ArenaSlice<T>) -> Option<&mut [T]> {
        let bytes = self.bytes_mut(array.offset().as_usize(), array.byte_len()?)?;
        <[T]>::mut_from_bytes_with_elems(bytes, array.len()).ok()
    }

    /// # Panics
    ///
    /// If the handle is outside the allocated range or misaligned.
    pub fn get<T: Relocatable>(&self, handle: Handle<T>) -> &T {
        match self.try_get(handle) {
            Some(value) => value,
            None => panic!("{handle:?} is outside arena of {} bytes", self.next),
        }
    }

    /// # Panics
    ///
    /// As [`Arena::get`].
    pub fn get_mut<T: Relocatable>(&mut self, handle: Handle<T>) -> &mut T {
        let allocated = self.next;
        match self.try_get_mut(handle) {
            Some(value) => value,
            None => panic!("{handle:?} is outside arena of {allocated} bytes"),
        }
    }

    /// # Panics
    ///
    /// As [`Arena::get`].
    pub fn slice<T: Relocatable>(&self, array: ArenaSlice<T>) -> &[T] {
        match self.try_slice(array) {
            Some(items) => items,
            None => panic!("{array:?} is outside arena of {} bytes", self.next),
        }
    }

    /// # Panics
    ///
    /// As [`Arena::get`].
    pub fn slice_mut<T: Relocatable>(&mut self, array: ArenaSlice<T>) -> &mut [T] {
        let allocated = self.next;
        match self.try_slice_mut(array) {
            Some(items) => items,
            None => panic!("{array:?} is outside arena of {allocated} bytes"),
        }
    }

    /// Offset of a field that `field` projects out of the object at `owner`.
    fn field_offset<A, F>(
        &mut self,
        owner: Handle<A>,
        field: impl FnOnce(&mut A) -> &mut F,
    ) -> ArenaOffset
    where
        A: Relocatable,
    {
        let owner_ref = self.get_mut(owner);
        let owner_addr = &*owner_ref as *const A as usize;
        let field_addr = field(owner_ref) as *mut F as usize;
        assert!(
            field_addr >= owner_addr
                && field_addr + mem::size_of::<F>() <= owner_addr + mem::size_of::<A>(),
            "field projection must stay inside the owning object"
        );
        ArenaOffset::new(owner.offset().as_usize() + (field_addr - owner_addr))
    }

    fn check_target<T: Relocatable>(&self, target: Handle<T>) {
        if self.try_get(target).is_none() {
            panic!("link target {target:?} is outside arena of {} bytes", self.next);
        }
    }

    /// Point the `RelPtr` field of `owner` selected by `field` at `target`.
    ///
    /// The relation is computed from offsets, so it is valid wherever the
    /// arena's bytes end up.
    ///
    /// # Panics
    ///
    /// If either handle is outside the arena, or `field` returns a reference
    /// that is not part of the owner.
    pub fn link<A, T>(
        &mut self,
        owner: Handle<A>,
        field: impl FnOnce(&mut A) -> &mut RelPtr<T>,
        target: Handle<T>,
    ) where
        A: Relocatable,
        T: Relocatable,
    {
        self.check_target(target);
        let slot = self.field_offset(owner, field);
        let relation = RelPtr::<T>::relation_between(slot.as_usize(), target.offset().as_usize());
        self.get_mut(Handle::<RelPtr<T>>::from_offset(slot))
            .set_relation(relation);
    }

    /// Point the `RelSpan` field of `owner` selected by `field` at `target`.
    /// An empty `target` clears the span.
    ///
    /// # Panics
    ///
    /// As [`Arena::link`].
    pub fn link_slice<A, T>(
        &mut self,
        owner: Handle<A>,
        field: impl FnOnce(&mut A) -> &mut RelSpan<T>,
        target: ArenaSlice<T>,
    ) where
        A: Relocatable,
        T: Relocatable,
    {
        if !target.is_empty() && self.try_slice(target).is_none() {
            panic!("link target {target:?} is outside arena of {} bytes", self.next);
        }
        let slot = self.field_offset(owner, field);
        let span = self.get_mut(Handle::<RelSpan<T>>::from_offset(slot));
        if target.is_empty() {
            span.clear();
        } else {
            span.set_offsets(slot.as_usize(), target.offset().as_usize(), target.len());
        }
    }

    /// Point element `index` of an array of pointers at `target`.
    ///
    /// # Panics
    ///
    /// If `index` is out of range or either handle is outside the arena.
    pub fn link_element<T: Relocatable>(
        &mut self,
        list: ArenaSlice<RelPtr<T>>,
        index: usize,
        target: Handle<T>,
    ) {
        self.check_target(target);
        let slot = match list.get(index) {
            Some(slot) => slot,
            None => panic!("index {index} out of range for {list:?}"),
        };
        let relation =
            RelPtr::<T>::relation_between(slot.offset().as_usize(), target.offset().as_usize());
        self.get_mut(slot).set_relation(relation);
    }

    /// Offset of a pointer's target, given the pointer's own handle.
    ///
    /// `None` for null pointers.
    pub fn target_of<T: Relocatable>(&self, pointer: Handle<RelPtr<T>>) -> Option<Handle<T>> {
        self.get(pointer)
            .target_offset(pointer.offset().as_usize())
            .map(|offset| Handle::from_offset(ArenaOffset::new(offset)))
    }
}

impl<P: ParentAllocator> Drop for Arena<P> {
    fn drop(&mut self) {
        if let Ok(layout) = block_layout(self.capacity) {
            unsafe { self.parent.deallocate(self.base, layout) };
        }
    }
}

impl<P: ParentAllocator> std::fmt::Debug for Arena<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("base", &self.base)
            .field("allocated", &self.next)
            .field("capacity", &self.capacity)
            .finish()
    }
}

fn block_layout(capacity: usize) -> ArenaResult<Layout> {
    Layout::from_size_align(capacity, BASE_ALIGN).map_err(|e| ArenaError::ParentAllocation {
        size: capacity,
        reason: e.to_string(),
    })
}
