use crate::error::{ArenaError, ArenaResult};

/// Round `addr` up to the next multiple of `align` (a power of two).
pub(crate) fn align_up(addr: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());
    addr.checked_add(align - 1).map(|a| a & !(align - 1))
}

pub(crate) fn check_align(align: usize) -> ArenaResult<()> {
    if align.is_power_of_two() {
        Ok(())
    } else {
        Err(ArenaError::InvalidAlignment(align))
    }
}

pub(crate) fn array_size(count: usize, element_size: usize) -> ArenaResult<usize> {
    count
        .checked_mul(element_size)
        .ok_or(ArenaError::SizeOverflow {
            count,
            element_size,
        })
}

/// Where the next allocation of `size` bytes would land.
///
/// `base` is the absolute address of the region start and `next` the cursor
/// as an offset from it. Alignment applies to absolute addresses so objects
/// are correctly aligned whatever the base alignment. Returns the start and
/// end offsets without moving anything.
pub(crate) fn plan(
    base: usize,
    next: usize,
    size: usize,
    align: usize,
) -> ArenaResult<(usize, usize)> {
    check_align(align)?;
    let overflow = || ArenaError::SizeOverflow {
        count: 1,
        element_size: size,
    };
    let addr = base.checked_add(next).ok_or_else(overflow)?;
    let start = align_up(addr, align).ok_or_else(overflow)? - base;
    let end = start.checked_add(size).ok_or_else(overflow)?;
    Ok((start, end))
}
