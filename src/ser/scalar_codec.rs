//! `ScalarCodec`: a type's one natural wire encoding, used by collection and
//! dictionary element types where field-level encoding overrides (spec
//! §4.5's `Int32Variant` family) don't apply. See `int_encoding` for the
//! per-field override codecs used directly by `FieldDescriptor::scalar`.

use crate::error::Error;
use crate::reader::ReaderState;
use crate::wire::WireType;
use crate::writer::WriterState;

pub trait ScalarCodec: Sized {
    const WIRE_TYPE: WireType;
    fn read(reader: &mut ReaderState) -> Result<Self, Error>;
    fn write(&self, writer: &mut WriterState);
}

macro_rules! impl_scalar_codec {
    ($ty:ty, $wire:expr, $read:ident, $write:ident) => {
        impl ScalarCodec for $ty {
            const WIRE_TYPE: WireType = $wire;
            fn read(reader: &mut ReaderState) -> Result<Self, Error> {
                reader.$read()
            }
            fn write(&self, writer: &mut WriterState) {
                writer.$write(*self);
            }
        }
    };
}

impl_scalar_codec!(u32, WireType::Varint, read_uint32, write_uint32);
impl_scalar_codec!(u64, WireType::Varint, read_uint64, write_uint64);
impl_scalar_codec!(i32, WireType::Varint, read_int32, write_int32);
impl_scalar_codec!(i64, WireType::Varint, read_int64, write_int64);
impl_scalar_codec!(bool, WireType::Varint, read_bool, write_bool);
impl_scalar_codec!(f32, WireType::Fixed32, read_float, write_float);
impl_scalar_codec!(f64, WireType::Fixed64, read_double, write_double);

impl ScalarCodec for String {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn read(reader: &mut ReaderState) -> Result<Self, Error> {
        reader.read_string()
    }

    fn write(&self, writer: &mut WriterState) {
        writer.write_string_field_body(self);
    }
}

impl ScalarCodec for Vec<u8> {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn read(reader: &mut ReaderState) -> Result<Self, Error> {
        reader.read_bytes()
    }

    fn write(&self, writer: &mut WriterState) {
        writer.write_bytes_field_body(self);
    }
}
