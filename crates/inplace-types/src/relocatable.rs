use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Plain data that may be stored inside an inplace buffer.
///
/// Buffers are persisted and reloaded as raw bytes, and a reader
/// reinterprets bytes written by a process it knows nothing about. A type
/// may only live in such a buffer if:
///
/// - every bit pattern is a valid value ([`FromBytes`]), so reading hostile
///   bytes cannot produce an invalid value and all-zero is the "empty" value;
/// - it has no padding ([`IntoBytes`]), so every byte written to a buffer is
///   initialized;
/// - it has no interior mutability ([`Immutable`]) and a statically known
///   layout ([`KnownLayout`]).
///
/// All four are checked at compile time by deriving them from `zerocopy`,
/// and every such type is `Relocatable`. Padding that a `#[repr(C)]` layout
/// would insert has to be spelled out as an explicit reserved field:
///
/// ```
/// use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
///
/// #[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
/// #[repr(C)]
/// struct Sample {
///     tag: u8,
///     _reserved: [u8; 7],
///     value: u64,
/// }
///
/// fn storable<T: inplace_types::Relocatable>() {}
/// storable::<Sample>();
/// ```
///
/// Without the reserved bytes the layout has a hole and is rejected:
///
/// ```compile_fail
/// use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
///
/// #[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
/// #[repr(C)]
/// struct Sample {
///     tag: u8,
///     value: u64,
/// }
/// ```
///
/// Relocatable types must also hold no absolute addresses. References into
/// the buffer are expressed with relative pointers instead.
pub trait Relocatable: FromBytes + IntoBytes + Immutable + KnownLayout + 'static {}

impl<T> Relocatable for T where T: FromBytes + IntoBytes + Immutable + KnownLayout + 'static {}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_relocatable<T: Relocatable>() {
        assert_eq!(std::mem::size_of::<T>(), T::new_zeroed().as_bytes().len());
    }

    #[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
    #[repr(C)]
    struct Spelled {
        tag: u8,
        _reserved: [u8; 3],
        value: u32,
    }

    #[test]
    fn primitives_are_relocatable() {
        assert_relocatable::<u8>();
        assert_relocatable::<i64>();
        assert_relocatable::<f64>();
        assert_relocatable::<[u32; 7]>();
        assert_relocatable::<[[u8; 3]; 2]>();
    }

    #[test]
    fn explicit_padding_is_initialized() {
        assert_relocatable::<Spelled>();
        let value = Spelled {
            tag: 1,
            _reserved: [0; 3],
            value: 2,
        };
        let mut expected = vec![1, 0, 0, 0];
        expected.extend_from_slice(&2u32.to_ne_bytes());
        assert_eq!(value.as_bytes(), &expected[..]);
    }
}
