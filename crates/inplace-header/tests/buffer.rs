mod common;

use common::{relocated, word_bytes, AppHeader, Ext1, Ext2};
use inplace_arena::{Arena, ForeignArena};
use inplace_header::{
    sort_by_identifier, BufferBuilder, BufferView, Header, HeaderError, Lookup, RootHeader,
    SubHeader, FRAMEWORK_MAGIC, FRAMEWORK_VERSION,
};
use inplace_ptr::RelPtr;
use inplace_types::{Magic, Version};
use zerocopy::IntoBytes;

fn app_buffer(version: Version) -> Arena {
    let arena = Arena::new(4096).unwrap();
    let mut builder = BufferBuilder::new(Magic::new("README"), arena).unwrap();
    let app = builder.add_header(AppHeader::with_version(version)).unwrap();
    let values = builder.arena_mut().alloc_array_fill(100, 42i32).unwrap();
    builder.arena_mut().link_slice(app, |h| &mut h.data, values);
    builder.finish().unwrap()
}

#[test]
fn write_and_read_back() {
    let arena = app_buffer(Version::new(1, 0, 0));
    // Root, app header, 100 ints and a one-entry directory.
    assert_eq!(arena.bytes_allocated(), 72 + 88 + 400 + 8);

    let view = BufferView::new(arena.as_bytes()).unwrap();
    assert_eq!(view.root().identifier, Magic::new("README"));
    let app = view.find_supported::<AppHeader>().unwrap();
    let data = view.resolve_slice(&app.data).unwrap();
    assert_eq!(data.len(), 100);
    assert!(data.iter().all(|&v| v == 42));
}

#[test]
fn read_after_relocation() {
    let arena = app_buffer(Version::new(1, 0, 0));
    let original = arena.as_bytes();
    let words = relocated(original);
    let copy = word_bytes(&words, original.len());
    assert_ne!(copy.as_ptr(), original.as_ptr());
    drop(arena);

    let view = BufferView::new(copy).unwrap();
    let app = view.find_supported::<AppHeader>().unwrap();
    let data = view.resolve_slice(&app.data).unwrap();
    assert_eq!(data.iter().sum::<i32>(), 4200);
    assert_eq!(unsafe { app.data.as_slice() }, data);
}

#[test]
fn lookup_distinguishes_incompatible() {
    for (stored, compatible) in [
        (Version::new(1, 0, 9), true),
        (Version::new(1, 5, 0), false),
        (Version::new(2, 0, 0), false),
        (Version::new(0, 0, 0), false),
        (Version::INVALID, false),
    ] {
        let arena = app_buffer(stored);
        let view = BufferView::new(arena.as_bytes()).unwrap();
        assert!(view.find::<AppHeader>().is_some());
        assert_eq!(view.find_supported::<AppHeader>().is_some(), compatible);
        match view.lookup::<AppHeader>() {
            Lookup::Found(app) => {
                assert!(compatible);
                assert_eq!(app.header.version, stored);
            }
            Lookup::Incompatible { stored: seen } => {
                assert!(!compatible);
                assert_eq!(seen, stored);
            }
            Lookup::Absent => panic!("header should be present"),
        }
        assert!(matches!(view.lookup::<Ext1>(), Lookup::Absent));
    }
}

#[test]
fn flipped_magic_byte_is_rejected() {
    let arena = app_buffer(Version::new(1, 0, 0));
    let mut words = relocated(arena.as_bytes());
    let len = arena.bytes_allocated();

    let root_magic_offset = std::mem::offset_of!(RootHeader, framework_magic);
    words.as_mut_bytes()[root_magic_offset + 5] ^= 0x01;
    let bytes = word_bytes(&words, len);
    match BufferView::new(bytes) {
        Err(HeaderError::MagicMismatch { found }) => assert_ne!(found, FRAMEWORK_MAGIC),
        other => panic!("expected magic mismatch, got {other:?}"),
    }

    // Everything but the magic still reads back as written.
    let view = BufferView::unvalidated(bytes).unwrap();
    let root = view.root();
    assert!(!root.magic_valid());
    assert_eq!(root.identifier, Magic::new("README"));
    assert_eq!(root.framework_version, FRAMEWORK_VERSION);
    assert!(root.platform.is_current());
    assert_eq!(view.directory_len(), 1);
    assert_eq!(view.verify_directory().unwrap(), 1);
    let app = view.find_supported::<AppHeader>().unwrap();
    assert_eq!(view.resolve_slice(&app.data).map(|d| d.len()), Some(100));
}

#[test]
fn truncated_buffer_fails_safely() {
    let arena = app_buffer(Version::new(1, 0, 0));
    let bytes = arena.as_bytes();

    // Cut off the directory: the root is valid but its span is out of range.
    let view = BufferView::new(&bytes[..bytes.len() - 8]).unwrap();
    assert!(view.directory().is_none());
    assert!(view.find::<AppHeader>().is_none());
    assert!(matches!(
        view.verify_directory(),
        Err(HeaderError::DirectoryOutOfBounds)
    ));

    assert!(matches!(
        BufferView::new(&bytes[..50]),
        Err(HeaderError::BufferTooSmall { .. })
    ));
}

#[test]
fn build_in_foreign_range() {
    let mut words = vec![0u64; 128];
    let len = {
        let mut arena = ForeignArena::new(words.as_mut_bytes());
        let root = arena.alloc_value(RootHeader::new(Magic::new("FOREIGN"))).unwrap();
        let ext2 = arena
            .alloc_value(Ext2 {
                header: Header::new(Ext2::IDENTIFIER, Version::new(2, 1, 0)),
                value: 22,
            })
            .unwrap();
        let ext1 = arena
            .alloc_value(Ext1 {
                header: Header::new(Ext1::IDENTIFIER, Version::new(1, 0, 0)),
                value: 11,
            })
            .unwrap();
        let list = arena.alloc_array_zeroed::<RelPtr<Header>>(2).unwrap();
        list[0].set(ext2.header());
        list[1].set(ext1.header());
        unsafe { sort_by_identifier(list) };
        root.sub_headers.set(list);
        arena.bytes_allocated()
    };

    let view = BufferView::new(word_bytes(&words, len)).unwrap();
    assert_eq!(view.verify_directory().unwrap(), 2);
    let order: Vec<Magic> = view.sub_headers().map(|h| h.identifier).collect();
    assert_eq!(order, vec![Ext1::IDENTIFIER, Ext2::IDENTIFIER]);
    assert_eq!(view.find_supported::<Ext1>().map(|h| h.value), Some(11));
    assert_eq!(view.find_supported::<Ext2>().map(|h| h.value), Some(22));
    assert_eq!(unsafe { view.root().find::<Ext2>() }.map(|h| h.value), Some(22));
}

#[test]
fn summary_lists_entries() {
    let arena = app_buffer(Version::new(1, 0, 3));
    let view = BufferView::new(arena.as_bytes()).unwrap();
    let summary = view.summarize();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].identifier, AppHeader::IDENTIFIER);
    assert_eq!(summary[0].offset, 72);
    assert_eq!(summary[0].version, Version::new(1, 0, 3));
    assert_eq!(summary[0].provenance, "unknown");

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json[0]["identifier"], "APP");
    assert_eq!(json[0]["version"]["minor"], 0);
}
