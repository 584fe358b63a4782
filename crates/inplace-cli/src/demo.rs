//! The sample buffer layout written by `inplace demo`.

use inplace_arena::{Arena, ArenaConfig, Reserved};
use inplace_header::{
    BufferBuilder, BufferView, Header, HeaderResult, SubHeader, VersionedSubHeader,
};
use inplace_ptr::RelSpan;
use inplace_types::{GitHash, Magic, Version};
use serde::Serialize;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Root identifier of demo buffers.
pub const DEMO_BUFFER: Magic = Magic::new("INPLACE-DEMO");

#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct DemoHeader {
    pub header: Header,
    _reserved: u32,
    pub values: RelSpan<i32>,
}

unsafe impl SubHeader for DemoHeader {
    const IDENTIFIER: Magic = Magic::new("DEMO-VALUES");
}

impl VersionedSubHeader for DemoHeader {
    const VERSION_SUPPORTED: Version = Version::new(1, 0, 0);
}

/// Build a demo buffer with `count` copies of `fill`.
pub fn build(
    count: usize,
    fill: i32,
    provenance: GitHash,
    config: &ArenaConfig,
) -> HeaderResult<Arena<Reserved>> {
    let arena = Arena::from_config(config)?;
    let mut builder = BufferBuilder::new(DEMO_BUFFER, arena)?;
    let demo = builder.add_header(DemoHeader {
        header: Header::current::<DemoHeader>().with_provenance(provenance),
        _reserved: 0,
        values: RelSpan::empty(),
    })?;
    let values = builder.arena_mut().alloc_array_fill(count, fill)?;
    builder.arena_mut().link_slice(demo, |h| &mut h.values, values);
    builder.finish()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DemoSummary {
    pub count: usize,
    pub first: Option<i32>,
    pub last: Option<i32>,
    pub sum: i64,
}

/// Summarize the demo values of a buffer, if it has a readable demo header
/// whose values resolve.
pub fn summarize(view: &BufferView<'_>) -> Option<DemoSummary> {
    let demo = view.find_supported::<DemoHeader>()?;
    let values = view.resolve_slice(&demo.values)?;
    Some(DemoSummary {
        count: values.len(),
        first: values.first().copied(),
        last: values.last().copied(),
        sum: values.iter().map(|&v| i64::from(v)).sum(),
    })
}
