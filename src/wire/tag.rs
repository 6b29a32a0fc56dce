//! Field tags: `(field_number << 3) | wire_type`, per spec §3/§4.1.
//!
//! `StartGroup`/`EndGroup` are kept as legacy-but-in-scope wire types,
//! used by `WriterState`'s grouped sub-item strategy (spec §4.3).

use crate::error::Error;
use crate::wire::varint::{decode_varint, encode_varint};

/// The smallest legal field number.
pub const MIN_FIELD: u32 = 1;
/// The largest legal field number: `2^29 - 1`.
pub const MAX_FIELD: u32 = (1 << 29) - 1;

/// The physical encoding that accompanies a field tag on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    Fixed32 = 5,
}

impl WireType {
    fn from_low_bits(bits: u32, offset: usize) -> Result<Self, Error> {
        Ok(match bits {
            0 => WireType::Varint,
            1 => WireType::Fixed64,
            2 => WireType::LengthDelimited,
            3 => WireType::StartGroup,
            4 => WireType::EndGroup,
            5 => WireType::Fixed32,
            _ => {
                return Err(Error::Malformed {
                    offset,
                    reason: "wire type 6 and 7 are not defined",
                })
            }
        })
    }
}

/// A field number paired with its wire type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub field: u32,
    pub wire_type: WireType,
}

impl Tag {
    pub fn new(field: u32, wire_type: WireType) -> Self {
        debug_assert!(
            field >= MIN_FIELD && field <= MAX_FIELD,
            "field number {field} out of range"
        );
        Tag { field, wire_type }
    }

    #[inline]
    pub fn encoded(self) -> u64 {
        ((self.field as u64) << 3) | (self.wire_type as u64)
    }

    pub fn encode(self, out: &mut Vec<u8>) {
        encode_varint(self.encoded(), out);
    }

    pub fn encoded_len(self) -> usize {
        crate::wire::varint::varint_len(self.encoded())
    }

    /// Decodes a tag from the front of `data`. A field number of zero is
    /// reserved for "no more fields" and is reported distinctly so readers
    /// can treat it as end-of-message rather than a malformed tag.
    pub fn decode(data: &[u8], offset: usize) -> Result<Option<(Tag, usize)>, Error> {
        let (raw, consumed) = decode_varint(data, offset)?;
        if raw == 0 {
            return Ok(None);
        }
        let field = (raw >> 3) as u32;
        if field > MAX_FIELD {
            return Err(Error::Malformed {
                offset,
                reason: "field number exceeds 2^29-1",
            });
        }
        let wire_type = WireType::from_low_bits((raw & 0x7) as u32, offset)?;
        Ok(Some((Tag::new(field, wire_type), consumed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_roundtrips_recover_field_and_wire_type() {
        for (field, wt) in [
            (1u32, WireType::Varint),
            (15, WireType::Fixed64),
            (16, WireType::LengthDelimited),
            (1 << 20, WireType::Fixed32),
            (MAX_FIELD, WireType::StartGroup),
        ] {
            let tag = Tag::new(field, wt);
            let mut buf = Vec::new();
            tag.encode(&mut buf);
            assert_eq!(buf.len(), tag.encoded_len());
            let (decoded, consumed) = Tag::decode(&buf, 0).unwrap().unwrap();
            assert_eq!(consumed, buf.len());
            assert_eq!(decoded.field, field);
            assert_eq!(decoded.wire_type, wt);
        }
    }

    #[test]
    fn zero_tag_means_end_of_message() {
        let mut buf = Vec::new();
        encode_varint(0, &mut buf);
        assert!(Tag::decode(&buf, 0).unwrap().is_none());
    }

    #[test]
    fn unknown_wire_type_is_malformed() {
        let mut buf = Vec::new();
        // field 1, wire type 6 (undefined)
        encode_varint((1 << 3) | 6, &mut buf);
        assert!(matches!(
            Tag::decode(&buf, 0).unwrap_err(),
            Error::Malformed { .. }
        ));
    }

    #[test]
    fn fuzz_tag_round_trip_recovers_field_and_wire_type() {
        const WIRE_TYPES: [WireType; 6] = [
            WireType::Varint,
            WireType::Fixed64,
            WireType::LengthDelimited,
            WireType::StartGroup,
            WireType::EndGroup,
            WireType::Fixed32,
        ];

        bolero::check!()
            .with_type::<(u32, u8)>()
            .for_each(|(field, wire_bits)| {
                let field = (*field % MAX_FIELD) + 1;
                let wire_type = WIRE_TYPES[(*wire_bits % 6) as usize];

                let tag = Tag::new(field, wire_type);
                let mut buf = Vec::new();
                tag.encode(&mut buf);
                let (decoded, consumed) = Tag::decode(&buf, 0).unwrap().unwrap();
                assert_eq!(consumed, buf.len());
                assert_eq!(decoded.field, field);
                assert_eq!(decoded.wire_type, wire_type);
            });
    }
}
