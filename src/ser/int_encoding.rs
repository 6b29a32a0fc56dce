//! Per-field integer encoding choice: the same Rust integer type can be put
//! on the wire four different ways depending on which of these marker types
//! a `FieldDescriptor::scalar` call is parameterized with. See spec §4.5's
//! `Int32Variant`/`Int64Variant` family, generalized here to both widths via
//! one `IntEncoding<F>` trait rather than four near-identical enums.

use crate::error::Error;
use crate::reader::ReaderState;
use crate::wire::WireType;
use crate::writer::WriterState;

pub trait IntEncoding<F> {
    const WIRE_TYPE: WireType;
    fn read(reader: &mut ReaderState) -> Result<F, Error>;
    fn write(writer: &mut WriterState, value: &F);
}

/// Sign-extended varint: protobuf's plain `int32`/`int64`/`uint32`/`uint64`.
pub struct Standard;

/// ZigZag-mapped varint: protobuf's `sint32`/`sint64`. Small negatives stay
/// small on the wire instead of sign-extending to ten bytes.
pub struct ZigZag;

/// Raw little-endian fixed width, unsigned reinterpretation: protobuf's
/// `fixed32`/`fixed64`.
pub struct FixedSize;

/// Raw little-endian fixed width, signed: protobuf's `sfixed32`/`sfixed64`.
pub struct TwosComplement;

impl IntEncoding<u32> for Standard {
    const WIRE_TYPE: WireType = WireType::Varint;
    fn read(reader: &mut ReaderState) -> Result<u32, Error> {
        reader.read_uint32()
    }
    fn write(writer: &mut WriterState, value: &u32) {
        writer.write_uint32(*value);
    }
}

impl IntEncoding<u32> for FixedSize {
    const WIRE_TYPE: WireType = WireType::Fixed32;
    fn read(reader: &mut ReaderState) -> Result<u32, Error> {
        reader.read_fixed32()
    }
    fn write(writer: &mut WriterState, value: &u32) {
        writer.write_fixed32(*value);
    }
}

impl IntEncoding<u64> for Standard {
    const WIRE_TYPE: WireType = WireType::Varint;
    fn read(reader: &mut ReaderState) -> Result<u64, Error> {
        reader.read_uint64()
    }
    fn write(writer: &mut WriterState, value: &u64) {
        writer.write_uint64(*value);
    }
}

impl IntEncoding<u64> for FixedSize {
    const WIRE_TYPE: WireType = WireType::Fixed64;
    fn read(reader: &mut ReaderState) -> Result<u64, Error> {
        reader.read_fixed64()
    }
    fn write(writer: &mut WriterState, value: &u64) {
        writer.write_fixed64(*value);
    }
}

impl IntEncoding<i32> for Standard {
    const WIRE_TYPE: WireType = WireType::Varint;
    fn read(reader: &mut ReaderState) -> Result<i32, Error> {
        reader.read_int32()
    }
    fn write(writer: &mut WriterState, value: &i32) {
        writer.write_int32(*value);
    }
}

impl IntEncoding<i32> for ZigZag {
    const WIRE_TYPE: WireType = WireType::Varint;
    fn read(reader: &mut ReaderState) -> Result<i32, Error> {
        reader.read_sint32()
    }
    fn write(writer: &mut WriterState, value: &i32) {
        writer.write_sint32(*value);
    }
}

impl IntEncoding<i32> for TwosComplement {
    const WIRE_TYPE: WireType = WireType::Fixed32;
    fn read(reader: &mut ReaderState) -> Result<i32, Error> {
        reader.read_sfixed32()
    }
    fn write(writer: &mut WriterState, value: &i32) {
        writer.write_sfixed32(*value);
    }
}

impl IntEncoding<i64> for Standard {
    const WIRE_TYPE: WireType = WireType::Varint;
    fn read(reader: &mut ReaderState) -> Result<i64, Error> {
        reader.read_int64()
    }
    fn write(writer: &mut WriterState, value: &i64) {
        writer.write_int64(*value);
    }
}

impl IntEncoding<i64> for ZigZag {
    const WIRE_TYPE: WireType = WireType::Varint;
    fn read(reader: &mut ReaderState) -> Result<i64, Error> {
        reader.read_sint64()
    }
    fn write(writer: &mut WriterState, value: &i64) {
        writer.write_sint64(*value);
    }
}

impl IntEncoding<i64> for TwosComplement {
    const WIRE_TYPE: WireType = WireType::Fixed64;
    fn read(reader: &mut ReaderState) -> Result<i64, Error> {
        reader.read_sfixed64()
    }
    fn write(writer: &mut WriterState, value: &i64) {
        writer.write_sfixed64(*value);
    }
}
