//! Built-in wire codecs for primitive scalars, strings/bytes, dictionaries,
//! and immutable collections. See spec §4.5.

pub mod dictionaries;
pub mod immutable;
pub mod int_encoding;
pub mod scalar_codec;
