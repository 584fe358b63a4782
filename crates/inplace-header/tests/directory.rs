mod common;

use std::collections::BTreeSet;

use common::{numbered, Ext1, Ext2};
use inplace_arena::{Arena, Handle};
use inplace_header::{
    sort_directory, BufferBuilder, BufferView, Header, HeaderError, SubHeader, VersionedSubHeader,
};
use inplace_types::{Magic, Version};
use proptest::prelude::*;

#[test]
fn find_in_scrambled_directory() {
    let arena = Arena::new(64 * 1024).unwrap();
    let mut builder = BufferBuilder::new(Magic::new("SUBHEADERS"), arena).unwrap();
    let root = builder.root();

    // Give every header a distinct identifier that matches neither type.
    let mut next_id = 123u32;
    let mut ext1s: Vec<Handle<Ext1>> = Vec::new();
    let mut ext2s: Vec<Handle<Ext2>> = Vec::new();
    for value in 0..50 {
        next_id += 1;
        let header = Header::new(numbered(next_id), Ext1::VERSION_SUPPORTED);
        ext1s.push(builder.add_header(Ext1 { header, value }).unwrap());
    }
    for value in 0..50 {
        next_id += 1;
        let header = Header::new(numbered(next_id), Ext2::VERSION_SUPPORTED);
        ext2s.push(builder.add_header(Ext2 { header, value }).unwrap());
    }
    let mut arena = builder.finish().unwrap();

    {
        let view = BufferView::new(arena.as_bytes()).unwrap();
        assert_eq!(view.directory_len(), 100);
        assert!(view.find::<Ext1>().is_none());
        assert!(view.find::<Ext2>().is_none());
    }

    // Restore the real identifiers of two headers, then re-sort.
    arena.get_mut(ext1s[13]).header.identifier = Ext1::IDENTIFIER;
    arena.get_mut(ext2s[17]).header.identifier = Ext2::IDENTIFIER;
    sort_directory(&mut arena, root).unwrap();

    let view = BufferView::new(arena.as_bytes()).unwrap();
    assert_eq!(view.verify_directory().unwrap(), 100);

    let ext1 = view.find::<Ext1>().unwrap();
    let ext2 = view.find::<Ext2>().unwrap();
    assert_eq!(view.offset_of(ext1), Some(ext1s[13].offset().as_usize()));
    assert_eq!(view.offset_of(ext2), Some(ext2s[17].offset().as_usize()));
    assert_eq!((ext1.value, ext2.value), (13, 17));
    assert!(view.find_supported::<Ext1>().is_some());
    assert!(view.find_supported::<Ext2>().is_some());
}

#[test]
fn linear_regime_needs_no_sorting() {
    let mut builder = BufferBuilder::new(Magic::new("SMALL"), Arena::new(4096).unwrap()).unwrap();
    let ext2 = builder
        .add_header(Ext2 {
            header: Header::current::<Ext2>(),
            value: 2,
        })
        .unwrap();
    let mut numbered_headers = Vec::new();
    for id in 0..5 {
        let header = Header::new(numbered(id), Version::new(1, 0, 0));
        numbered_headers.push(builder.add_header(Ext1 { header, value: id }).unwrap());
    }
    let mut arena = builder.finish().unwrap();

    // Retag the first entry without re-sorting: the directory is now out of
    // order, but short enough to be scanned linearly.
    arena.get_mut(numbered_headers[0]).header.identifier = Ext1::IDENTIFIER;

    let view = BufferView::new(arena.as_bytes()).unwrap();
    assert!(view.verify_directory().is_err());
    let ext1 = view.find::<Ext1>().unwrap();
    assert_eq!(view.offset_of(ext1), Some(numbered_headers[0].offset().as_usize()));
    assert_eq!(view.find::<Ext2>().map(|h| h.value), Some(2));
    assert_eq!(view.offset_of(view.find::<Ext2>().unwrap()), Some(ext2.offset().as_usize()));
}

#[test]
fn unsorted_long_directory_is_not_fatal() {
    let arena = Arena::new(8192).unwrap();
    let mut builder = BufferBuilder::new(Magic::new("UNSORTED"), arena).unwrap();
    let mut numbered_headers = Vec::new();
    for id in 0..19 {
        let header = Header::new(numbered(id), Version::new(1, 0, 0));
        numbered_headers.push(builder.add_header(Ext1 { header, value: id }).unwrap());
    }
    builder
        .add_header(Ext2 {
            header: Header::current::<Ext2>(),
            value: 7,
        })
        .unwrap();
    let mut arena = builder.finish().unwrap();

    // Retag the first entry so it sorts last, leaving the directory as is.
    arena.get_mut(numbered_headers[0]).header.identifier = Magic::new("zzzz");

    let view = BufferView::new(arena.as_bytes()).unwrap();
    assert_eq!(view.directory_len(), 20);
    assert!(matches!(
        view.verify_directory(),
        Err(HeaderError::UnsortedDirectory { index: 1 })
    ));
    if let Some(ext2) = view.find::<Ext2>() {
        assert_eq!(ext2.header.identifier, Ext2::IDENTIFIER);
        assert_eq!(ext2.value, 7);
    }
    if let Some(header) = view.find_by_magic(&Magic::new("zzzz")) {
        assert_eq!(header.identifier, Magic::new("zzzz"));
    }
    assert!(view.find::<Ext1>().is_none());
}

#[test]
fn boundary_sizes() {
    for count in [15u32, 16, 17] {
        let arena = Arena::new(16 * 1024).unwrap();
        let mut builder = BufferBuilder::new(Magic::new("EDGE"), arena).unwrap();
        for id in 0..count {
            let header = Header::new(numbered(id + 1000), Version::new(1, 0, 0));
            builder.add_header(Ext1 { header, value: id }).unwrap();
        }
        builder
            .add_header(Ext2 {
                header: Header::current::<Ext2>(),
                value: count,
            })
            .unwrap();
        let arena = builder.finish().unwrap();
        let view = BufferView::new(arena.as_bytes()).unwrap();
        assert_eq!(view.find::<Ext2>().map(|h| h.value), Some(count));
        assert!(view.find::<Ext1>().is_none());
        for id in 0..count {
            assert!(view.find_by_magic(&numbered(id + 1000)).is_some());
        }
    }
}

fn names() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[a-z]{1,12}", 1..48)
}

proptest! {
    #[test]
    fn every_identifier_is_found(names in names(), missing in "[A-Z]{1,8}") {
        let arena = Arena::new(64 * 1024).unwrap();
        let mut builder = BufferBuilder::new(Magic::new("PROP"), arena).unwrap();
        // Insert in reverse so the builder has to sort.
        for (value, name) in names.iter().rev().enumerate() {
            let header = Header::new(Magic::new(name), Version::new(1, 0, 0));
            builder.add_header(Ext1 { header, value: value as u32 }).unwrap();
        }
        let arena = builder.finish().unwrap();
        let view = BufferView::new(arena.as_bytes()).unwrap();

        prop_assert_eq!(view.verify_directory().unwrap(), names.len());
        for name in &names {
            let magic = Magic::new(name);
            prop_assert_eq!(view.find_by_magic(&magic).map(|h| h.identifier), Some(magic));
        }
        prop_assert!(view.find_by_magic(&Magic::new(&missing)).is_none());

        let listed: Vec<Magic> = view.sub_headers().map(|h| h.identifier).collect();
        let expected: Vec<Magic> = names.iter().map(|n| Magic::new(n)).collect();
        prop_assert_eq!(listed, expected);
    }
}
