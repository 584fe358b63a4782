//! Where an owned arena gets its memory from.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use tracing::debug;

use crate::error::{ArenaError, ArenaResult};

/// Supplies the single block of memory behind an [`Arena`](crate::Arena).
///
/// # Safety
///
/// Implementations must return blocks that are valid for reads and writes
/// of `layout.size()` bytes, aligned to `layout.align()`, and zero-filled.
/// When [`try_grow_in_place`](Self::try_grow_in_place) returns `true` the
/// block must be valid up to `new_size` at the same address, with the bytes
/// past the old size zero-filled.
pub unsafe trait ParentAllocator {
    fn allocate(&mut self, layout: Layout) -> ArenaResult<NonNull<u8>>;

    /// # Safety
    ///
    /// `ptr` and `layout` must describe a block returned by `allocate`, with
    /// the size as last grown.
    unsafe fn deallocate(&mut self, ptr: NonNull<u8>, layout: Layout);

    /// Extend the block at `ptr` to `new_size` bytes without moving it.
    ///
    /// The default refuses: a parent that cannot guarantee the address stays
    /// put must never grow.
    ///
    /// # Safety
    ///
    /// As for [`deallocate`](Self::deallocate).
    unsafe fn try_grow_in_place(&mut self, ptr: NonNull<u8>, old: Layout, new_size: usize) -> bool {
        let _ = (ptr, old, new_size);
        false
    }
}

fn dangling(align: usize) -> NonNull<u8> {
    // Any non-zero multiple of the alignment is a valid dangling address.
    NonNull::new(align as *mut u8).unwrap_or(NonNull::dangling())
}

/// The global allocator. Blocks can never grow without moving.
#[derive(Debug, Default, Clone, Copy)]
pub struct Heap;

unsafe impl ParentAllocator for Heap {
    fn allocate(&mut self, layout: Layout) -> ArenaResult<NonNull<u8>> {
        if layout.size() == 0 {
            return Ok(dangling(layout.align()));
        }
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        NonNull::new(ptr).ok_or_else(|| ArenaError::ParentAllocation {
            size: layout.size(),
            reason: "global allocator returned null".into(),
        })
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            alloc::dealloc(ptr.as_ptr(), layout);
        }
    }
}

/// Reserves `max_capacity` bytes up front and commits them gradually.
///
/// The arena starts out seeing only the size it asked for and later grows
/// into the rest of the reservation without ever moving. Untouched pages of a
/// large zeroed reservation are usually not backed by physical memory until
/// written.
#[derive(Debug)]
pub struct Reserved {
    max_capacity: usize,
    block: Option<(NonNull<u8>, Layout)>,
    committed: usize,
}

unsafe impl Send for Reserved {}

impl Reserved {
    pub fn new(max_capacity: usize) -> Self {
        Self {
            max_capacity,
            block: None,
            committed: 0,
        }
    }

    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Bytes currently handed out to the arena.
    pub fn committed(&self) -> usize {
        self.committed
    }
}

unsafe impl ParentAllocator for Reserved {
    fn allocate(&mut self, layout: Layout) -> ArenaResult<NonNull<u8>> {
        if self.block.is_some() {
            return Err(ArenaError::ParentAllocation {
                size: layout.size(),
                reason: "reservation already in use".into(),
            });
        }
        if layout.size() > self.max_capacity {
            return Err(ArenaError::ParentAllocation {
                size: layout.size(),
                reason: format!("exceeds reservation of {} bytes", self.max_capacity),
            });
        }
        let reservation = Layout::from_size_align(self.max_capacity, layout.align()).map_err(|e| {
            ArenaError::ParentAllocation {
                size: self.max_capacity,
                reason: e.to_string(),
            }
        })?;
        let ptr = Heap.allocate(reservation)?;
        debug!(
            reserved = self.max_capacity,
            committed = layout.size(),
            "reserved arena memory"
        );
        self.block = Some((ptr, reservation));
        self.committed = layout.size();
        Ok(ptr)
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<u8>, _layout: Layout) {
        if let Some((block, reservation)) = self.block {
            if block == ptr {
                Heap.deallocate(block, reservation);
                self.block = None;
                self.committed = 0;
            }
        }
    }

    unsafe fn try_grow_in_place(
        &mut self,
        ptr: NonNull<u8>,
        _old: Layout,
        new_size: usize,
    ) -> bool {
        match self.block {
            Some((block, _)) if block == ptr && new_size <= self.max_capacity => {
                // The arena never writes past what was committed, so the
                // rest of the zeroed reservation is still zero.
                self.committed = self.committed.max(new_size);
                true
            }
            _ => false,
        }
    }
}

impl Drop for Reserved {
    fn drop(&mut self) {
        if let Some((block, reservation)) = self.block.take() {
            unsafe { Heap.deallocate(block, reservation) };
        }
    }
}
