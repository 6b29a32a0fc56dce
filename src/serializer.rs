//! The typed serializer contract every built-in and user-registered type
//! implements against. See spec §4.4.

use crate::error::Error;
use crate::reader::ReaderState;
use crate::wire::WireType;
use crate::writer::WriterState;

/// Broad shape of a type's wire representation, used by the dispatch layer
/// and by collection serializers deciding whether an element type can be
/// packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// A single wire primitive: varint, fixed32/64, or a scalar string/bytes.
    Scalar,
    /// A length-delimited sub-message with its own field set.
    Message,
    /// A transparent single-field wrapper (e.g. a surrogate's outer shell).
    Wrapper,
    /// The legacy `StartGroup`/`EndGroup` encoding.
    Group,
}

/// Static facts about a `Serializer<T>` impl, queried by the type model and
/// by collection serializers (packed-field eligibility requires a `Scalar`
/// category with a fixed-width or varint wire type).
#[derive(Debug, Clone, Copy)]
pub struct Features {
    pub category: Category,
    pub default_wire_type: WireType,
    /// Whether a Rust `None`/default value should suppress writing the
    /// field entirely, matching protobuf's "don't emit defaults" convention
    /// for scalar fields.
    pub null_propagates: bool,
}

impl Features {
    pub const fn scalar(wire_type: WireType) -> Self {
        Features {
            category: Category::Scalar,
            default_wire_type: wire_type,
            null_propagates: true,
        }
    }

    pub const fn message() -> Self {
        Features {
            category: Category::Message,
            default_wire_type: WireType::LengthDelimited,
            null_propagates: true,
        }
    }

    pub const fn wrapper(wire_type: WireType) -> Self {
        Features {
            category: Category::Wrapper,
            default_wire_type: wire_type,
            null_propagates: false,
        }
    }

    /// Whether this type's wire type is one that packs (spec §4.5): varint
    /// and both fixed widths pack; length-delimited and group types never
    /// do.
    pub fn is_packable(&self) -> bool {
        self.category == Category::Scalar
            && matches!(
                self.default_wire_type,
                WireType::Varint | WireType::Fixed32 | WireType::Fixed64
            )
    }
}

/// Converts between a Rust value `T` and its wire representation. This is
/// the one seam every built-in and user-registered type implements; the
/// type model dispatches to one of these by `TypeId` instead of by runtime
/// reflection (spec §3/§4.4).
pub trait Serializer<T>: Send + Sync {
    fn features(&self) -> Features;

    /// Reads one value of `T`, merging into `existing` if given (repeated
    /// calls on the same field in one message merge rather than replace,
    /// per spec §4.5/§8).
    fn read(&self, reader: &mut ReaderState, existing: Option<T>) -> Result<T, Error>;

    fn write(&self, writer: &mut WriterState, value: &T) -> Result<(), Error>;
}
