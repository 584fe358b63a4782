use std::fmt;
use std::marker::PhantomData;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// A pointer to a `T` stored as a byte distance from its own location.
///
/// The relation `0` would mean "points to itself", which can never be a valid
/// target, so it encodes null.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(transparent)]
pub struct RelPtr<T> {
    relation: i64,
    _marker: PhantomData<T>,
}

impl<T> RelPtr<T> {
    /// The relation value reserved for null.
    pub const NULL_RELATION: i64 = 0;

    pub const fn null() -> Self {
        Self {
            relation: Self::NULL_RELATION,
            _marker: PhantomData,
        }
    }

    pub const fn is_null(&self) -> bool {
        self.relation == Self::NULL_RELATION
    }

    pub fn clear(&mut self) {
        self.relation = Self::NULL_RELATION;
    }

    /// The raw stored relation in bytes.
    pub const fn relation(&self) -> i64 {
        self.relation
    }

    /// Overwrite the raw relation.
    ///
    /// Only meaningful for a relation computed for this exact slot, e.g. with
    /// [`RelPtr::relation_between`].
    pub fn set_relation(&mut self, relation: i64) {
        self.relation = relation;
    }

    /// The relation a pointer stored at byte offset `from` needs to reach
    /// byte offset `to` of the same buffer.
    pub const fn relation_between(from: usize, to: usize) -> i64 {
        to as i64 - from as i64
    }

    /// Offset of the target, given the offset this pointer is stored at.
    ///
    /// `None` for null or if the target would lie before the buffer start.
    pub fn target_offset(&self, self_offset: usize) -> Option<usize> {
        if self.is_null() {
            return None;
        }
        let target = (self_offset as i64).checked_add(self.relation)?;
        usize::try_from(target).ok()
    }

    /// View a raw relation word as a pointer.
    pub(crate) fn from_word(word: &i64) -> &Self {
        // `RelPtr` is a transparent `i64`.
        unsafe { &*(word as *const i64).cast::<Self>() }
    }

    pub(crate) fn from_word_mut(word: &mut i64) -> &mut Self {
        unsafe { &mut *(word as *mut i64).cast::<Self>() }
    }

    fn address(&self) -> usize {
        self as *const Self as usize
    }

    /// Point at `target`, which must live in the same buffer as `self`.
    ///
    /// The target address is recorded as a plain integer, and dereferencing
    /// later only has the access `target` was derived from. If the pointer
    /// will be read as a larger object than `T` (a sub-header reached through
    /// its leading header), pass a pointer derived from the whole object to
    /// [`RelPtr::set_ptr`] instead of a reference to its first field.
    pub fn set(&mut self, target: &T) {
        self.set_ptr(target);
    }

    /// Point at a raw address in the same buffer. A null `target` clears.
    pub fn set_ptr(&mut self, target: *const T) {
        if target.is_null() {
            self.clear();
            return;
        }
        let relation = target as usize as i64 - self.address() as i64;
        debug_assert_ne!(relation, Self::NULL_RELATION, "pointer cannot target itself");
        self.relation = relation;
    }

    /// Absolute address of the target for the pointer's current location,
    /// or a null pointer.
    pub fn as_ptr(&self) -> *const T {
        if self.is_null() {
            return std::ptr::null();
        }
        (self.address() as i64).wrapping_add(self.relation) as usize as *const T
    }

    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.as_ptr() as *mut T
    }

    /// Dereference without any checks.
    ///
    /// # Safety
    ///
    /// Unless null, the target must be a live, properly aligned `T` for the
    /// lifetime of the returned reference. This holds for a buffer that was
    /// built by a trusted writer and passed its compatibility checks.
    pub unsafe fn as_ref(&self) -> Option<&T> {
        self.as_ptr().as_ref()
    }

    /// Mutable counterpart of [`RelPtr::as_ref`].
    ///
    /// # Safety
    ///
    /// As for [`RelPtr::as_ref`], and the target must not be aliased.
    pub unsafe fn as_mut(&mut self) -> Option<&mut T> {
        self.as_mut_ptr().as_mut()
    }
}

impl<T> Default for RelPtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> fmt::Debug for RelPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "RelPtr<{}>(null)", std::any::type_name::<T>())
        } else {
            write!(f, "RelPtr<{}>({:+})", std::any::type_name::<T>(), self.relation)
        }
    }
}
