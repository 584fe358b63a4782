use std::mem;

use inplace_arena::{Arena, ArenaOffset, ArenaSlice, Handle, Heap, ParentAllocator};
use inplace_ptr::RelPtr;
use inplace_types::{Magic, Relocatable};
use tracing::debug;

use crate::error::{HeaderError, HeaderResult};
use crate::header::{Header, RootHeader, SubHeader};

/// Writes a buffer into an arena: root header first, then sub-headers and
/// their data, then the sorted directory.
pub struct BufferBuilder<P: ParentAllocator = Heap> {
    arena: Arena<P>,
    root: Handle<RootHeader>,
    headers: Vec<Handle<Header>>,
}

impl<P: ParentAllocator> BufferBuilder<P> {
    /// Start a buffer tagged `identifier`. The arena is reset first.
    pub fn new(identifier: Magic, mut arena: Arena<P>) -> HeaderResult<Self> {
        arena.reset();
        let root = arena.alloc_value(RootHeader::new(identifier))?;
        Ok(Self {
            arena,
            root,
            headers: Vec::new(),
        })
    }

    pub fn root(&self) -> Handle<RootHeader> {
        self.root
    }

    /// Place a sub-header in the buffer and register it in the directory.
    pub fn add_header<H: SubHeader>(&mut self, value: H) -> HeaderResult<Handle<H>> {
        let handle = self.arena.alloc_value(value)?;
        self.headers.push(handle.cast());
        Ok(handle)
    }

    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    /// The arena, for allocating the data sub-headers refer to.
    pub fn arena(&self) -> &Arena<P> {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut Arena<P> {
        &mut self.arena
    }

    pub fn get<T: Relocatable>(&self, handle: Handle<T>) -> &T {
        self.arena.get(handle)
    }

    pub fn get_mut<T: Relocatable>(&mut self, handle: Handle<T>) -> &mut T {
        self.arena.get_mut(handle)
    }

    /// Write the directory and hand back the arena holding the finished
    /// buffer.
    pub fn finish(self) -> HeaderResult<Arena<P>> {
        let Self {
            mut arena,
            root,
            headers,
        } = self;

        let list = arena.alloc_array_zeroed::<RelPtr<Header>>(headers.len())?;
        for (index, header) in headers.iter().enumerate() {
            arena.link_element(list, index, *header);
        }
        arena.link_slice(root, |r| &mut r.sub_headers, list);
        sort_directory(&mut arena, root)?;

        debug!(
            identifier = %arena.get(root).identifier,
            headers = headers.len(),
            bytes = arena.bytes_allocated(),
            "buffer published"
        );
        Ok(arena)
    }
}

/// The directory of the root at `root` as an arena slice.
fn directory_slice<P: ParentAllocator>(
    arena: &Arena<P>,
    root: Handle<RootHeader>,
) -> HeaderResult<ArenaSlice<RelPtr<Header>>> {
    let span = &arena
        .try_get(root)
        .ok_or(HeaderError::DirectoryOutOfBounds)?
        .sub_headers;
    if span.is_empty() {
        return Ok(ArenaSlice::empty());
    }
    let span_offset = root.offset().as_usize() + mem::offset_of!(RootHeader, sub_headers);
    let start = span
        .data()
        .target_offset(span_offset)
        .ok_or(HeaderError::DirectoryOutOfBounds)?;
    let list = ArenaSlice::from_offset(ArenaOffset::new(start), span.len());
    arena
        .try_slice(list)
        .map(|_| list)
        .ok_or(HeaderError::DirectoryOutOfBounds)
}

/// Sort a published directory by identifier, e.g. after identifiers were
/// edited in place.
///
/// Works on offsets only: entries are re-pointed, never moved.
pub fn sort_directory<P: ParentAllocator>(
    arena: &mut Arena<P>,
    root: Handle<RootHeader>,
) -> HeaderResult<()> {
    let list = directory_slice(arena, root)?;
    let mut targets = Vec::with_capacity(list.len());
    for (index, slot) in list.iter().enumerate() {
        let target = arena
            .try_get(slot)
            .and_then(|ptr| ptr.target_offset(slot.offset().as_usize()))
            .map(|offset| Handle::<Header>::from_offset(ArenaOffset::new(offset)))
            .ok_or(HeaderError::HeaderOutOfBounds { index })?;
        let identifier = arena
            .try_get(target)
            .ok_or(HeaderError::HeaderOutOfBounds { index })?
            .identifier;
        targets.push((identifier, target));
    }

    targets.sort_by(|a, b| a.0.cmp(&b.0));
    for (index, (_, target)) in targets.into_iter().enumerate() {
        arena.link_element(list, index, target);
    }
    Ok(())
}

/// Sort directory entries that point into live memory, such as a directory
/// built with a [`ForeignArena`](inplace_arena::ForeignArena).
///
/// # Safety
///
/// Every entry must point at a live [`Header`].
pub unsafe fn sort_by_identifier(entries: &mut [RelPtr<Header>]) {
    let mut targets: Vec<*const Header> = entries.iter().map(|e| e.as_ptr()).collect();
    targets.sort_by(|a, b| (**a).cmp_identifier(&**b));
    for (entry, target) in entries.iter_mut().zip(targets) {
        entry.set_ptr(target);
    }
}

#[cfg(test)]
mod tests {
    use inplace_types::Version;

    use super::*;
    use crate::view::BufferView;

    #[derive(zerocopy::FromBytes, zerocopy::IntoBytes)]
    #[derive(zerocopy::Immutable, zerocopy::KnownLayout)]
    #[repr(C)]
    struct Tag {
        header: Header,
        value: u32,
    }

    unsafe impl SubHeader for Tag {
        const IDENTIFIER: Magic = Magic::new("TAG");
    }

    fn tag(name: &str, value: u32) -> Tag {
        Tag {
            header: Header::new(Magic::new(name), Version::new(1, 0, 0)),
            value,
        }
    }

    #[test]
    fn root_comes_first() {
        let builder = BufferBuilder::new(Magic::new("FIRST"), Arena::new(1024).unwrap()).unwrap();
        assert_eq!(builder.root().offset(), ArenaOffset::ZERO);
        assert_eq!(builder.header_count(), 0);
    }

    #[test]
    fn finish_sorts_directory() {
        let arena = Arena::new(4096).unwrap();
        let mut builder = BufferBuilder::new(Magic::new("SORT"), arena).unwrap();
        for (name, value) in [("c", 3), ("a", 1), ("b", 2)] {
            builder.add_header(tag(name, value)).unwrap();
        }
        let arena = builder.finish().unwrap();

        let view = BufferView::new(arena.as_bytes()).unwrap();
        let order: Vec<Magic> = view.sub_headers().map(|h| h.identifier).collect();
        assert_eq!(order, vec![Magic::new("a"), Magic::new("b"), Magic::new("c")]);
        assert_eq!(view.verify_directory().unwrap(), 3);
    }

    #[test]
    fn builder_reuses_arena() {
        let mut builder = BufferBuilder::new(Magic::new("ONE"), Arena::new(1024).unwrap()).unwrap();
        builder.add_header(tag("x", 0)).unwrap();
        let arena = builder.finish().unwrap();
        let first_size = arena.bytes_allocated();

        let builder = BufferBuilder::new(Magic::new("TWO"), arena).unwrap();
        let arena = builder.finish().unwrap();
        assert!(arena.bytes_allocated() < first_size);
        let view = BufferView::new(arena.as_bytes()).unwrap();
        assert_eq!(view.root().identifier, Magic::new("TWO"));
        assert_eq!(view.directory_len(), 0);
    }

    #[test]
    fn resort_after_edit() {
        let arena = Arena::new(4096).unwrap();
        let mut builder = BufferBuilder::new(Magic::new("EDIT"), arena).unwrap();
        let root = builder.root();
        let handles: Vec<Handle<Tag>> = ["a", "b", "c"]
            .iter()
            .map(|n| builder.add_header(tag(n, 0)).unwrap())
            .collect();
        let mut arena = builder.finish().unwrap();

        arena.get_mut(handles[0]).header.identifier = Magic::new("z");
        sort_directory(&mut arena, root).unwrap();

        let view = BufferView::new(arena.as_bytes()).unwrap();
        let order: Vec<Magic> = view.sub_headers().map(|h| h.identifier).collect();
        assert_eq!(order, vec![Magic::new("b"), Magic::new("c"), Magic::new("z")]);
    }

    #[test]
    fn broken_directory_is_reported() {
        let mut builder = BufferBuilder::new(Magic::new("BAD"), Arena::new(1024).unwrap()).unwrap();
        let root = builder.root();
        builder.add_header(tag("a", 0)).unwrap();
        let mut arena = builder.finish().unwrap();

        let list = directory_slice(&arena, root).unwrap();
        arena.slice_mut(list)[0].set_relation(1 << 20);
        assert!(matches!(
            sort_directory(&mut arena, root),
            Err(HeaderError::HeaderOutOfBounds { index: 0 })
        ));
    }

    #[test]
    fn sort_raw_entries() {
        let headers = [
            Header::new(Magic::new("gamma"), Version::new(1, 0, 0)),
            Header::new(Magic::new("alpha"), Version::new(1, 0, 0)),
            Header::new(Magic::new("beta"), Version::new(1, 0, 0)),
        ];
        let mut entries: Box<[RelPtr<Header>; 3]> = Box::default();
        for (entry, header) in entries.iter_mut().zip(&headers) {
            entry.set(header);
        }
        unsafe { sort_by_identifier(&mut entries[..]) };
        let names: Vec<String> = entries
            .iter()
            .map(|e| unsafe { e.as_ref() }.unwrap().identifier.to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    }
}
