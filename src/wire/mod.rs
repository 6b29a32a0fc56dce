//! Byte-level wire format primitives: varints, ZigZag, and field tags.
//! See spec §4.1.

pub mod tag;
pub mod varint;

pub use tag::{Tag, WireType, MAX_FIELD, MIN_FIELD};
pub use varint::{
    decode_varint, encode_varint, varint_len, zigzag_decode32, zigzag_decode64, zigzag_encode32,
    zigzag_encode64, MAX_VARINT_BYTES,
};
