//! `WriterState`: stages encoded bytes in memory so length-delimited
//! sub-items can be back-patched with their exact length, then flushes to a
//! sink. See spec §3/§4.3.
//!
//! The "buffered" sub-item strategy (measure exactly, then emit) is the
//! default; the "grouped" strategy (legacy `StartGroup`/`EndGroup`, no
//! length measurement) is available via `write_group_start`/`write_group_end`
//! for the rare field that opts into it (spec §4.3's per-field policy).

use std::io::Write;

use crate::error::Error;
use crate::wire::{encode_varint, Tag, WireType};

/// Opaque handle returned by `start_sub_item`. Tokens are strictly LIFO:
/// `end_sub_item` panics if given anything but the most recently opened
/// token (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubItemToken(usize);

pub struct WriterState<'a> {
    sink: &'a mut dyn Write,
    buf: Vec<u8>,
    stack: Vec<usize>,
}

impl<'a> WriterState<'a> {
    pub fn new(sink: &'a mut dyn Write) -> Self {
        WriterState {
            sink,
            buf: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// Bytes staged so far (not necessarily flushed to the sink yet).
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn write_field_header(&mut self, tag: Tag) {
        tag.encode(&mut self.buf);
    }

    pub fn write_uint32(&mut self, value: u32) {
        encode_varint(value as u64, &mut self.buf);
    }

    pub fn write_uint64(&mut self, value: u64) {
        encode_varint(value, &mut self.buf);
    }

    pub fn write_int32(&mut self, value: i32) {
        // Sign-extends to 64 bits, matching the "Default" int32 variant in
        // spec §4.5: negative values always occupy the full 10 bytes.
        encode_varint(value as i64 as u64, &mut self.buf);
    }

    pub fn write_int64(&mut self, value: i64) {
        encode_varint(value as u64, &mut self.buf);
    }

    pub fn write_sint32(&mut self, value: i32) {
        encode_varint(crate::wire::zigzag_encode32(value) as u64, &mut self.buf);
    }

    pub fn write_sint64(&mut self, value: i64) {
        encode_varint(crate::wire::zigzag_encode64(value), &mut self.buf);
    }

    pub fn write_bool(&mut self, value: bool) {
        encode_varint(value as u64, &mut self.buf);
    }

    pub fn write_fixed32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_sfixed32(&mut self, value: i32) {
        self.write_fixed32(value as u32);
    }

    pub fn write_sfixed64(&mut self, value: i64) {
        self.write_fixed64(value as u64);
    }

    pub fn write_float(&mut self, value: f32) {
        self.write_fixed32(value.to_bits());
    }

    pub fn write_double(&mut self, value: f64) {
        self.write_fixed64(value.to_bits());
    }

    /// Appends raw bytes with no tag or length prefix. Used to build a
    /// sub-item's body, or raw fixtures in tests.
    pub fn write_raw_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a complete length-delimited field in one step, for fields
    /// whose payload length is already known up front (strings, plain
    /// bytes) and so don't need the staged measure-then-patch dance that
    /// `start_sub_item`/`end_sub_item` does for nested messages.
    pub fn write_length_delimited_field(&mut self, tag: Tag, payload: &[u8]) {
        debug_assert_eq!(tag.wire_type, WireType::LengthDelimited);
        self.write_field_header(tag);
        encode_varint(payload.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(payload);
    }

    pub fn write_string_field(&mut self, tag: Tag, value: &str) {
        self.write_length_delimited_field(tag, value.as_bytes());
    }

    pub fn write_bytes_field(&mut self, tag: Tag, value: &[u8]) {
        self.write_length_delimited_field(tag, value);
    }

    /// Writes a length prefix followed by `payload`, with no tag. Strings
    /// and bytes are always self-delimited this way regardless of whether
    /// the caller already emitted the field header (they never pack, spec
    /// §4.5).
    pub fn write_length_delimited_body(&mut self, payload: &[u8]) {
        encode_varint(payload.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(payload);
    }

    pub fn write_string_field_body(&mut self, value: &str) {
        self.write_length_delimited_body(value.as_bytes());
    }

    pub fn write_bytes_field_body(&mut self, value: &[u8]) {
        self.write_length_delimited_body(value);
    }

    /// Opens a length-delimited sub-item: writes the field header, then
    /// marks where the body begins so `end_sub_item` can measure it and
    /// splice in the length prefix.
    pub fn start_sub_item(&mut self, tag: Tag) -> SubItemToken {
        debug_assert_eq!(tag.wire_type, WireType::LengthDelimited);
        self.write_field_header(tag);
        let marker = self.buf.len();
        self.stack.push(marker);
        SubItemToken(marker)
    }

    /// Closes the most recently opened sub-item. Panics if `token` is not
    /// the top of the LIFO stack (spec §3: "tokens are strictly LIFO").
    pub fn end_sub_item(&mut self, token: SubItemToken) {
        let marker = self
            .stack
            .pop()
            .expect("end_sub_item called with an empty sub-item stack");
        assert_eq!(
            marker, token.0,
            "sub-item tokens must be closed in LIFO order"
        );
        let body_len = self.buf.len() - marker;
        let mut len_bytes = Vec::new();
        encode_varint(body_len as u64, &mut len_bytes);
        self.buf.splice(marker..marker, len_bytes);
    }

    /// Discards a partially written sub-item (and everything written inside
    /// it) without emitting it.
    pub fn abandon_sub_item(&mut self, token: SubItemToken) {
        let marker = self
            .stack
            .pop()
            .expect("abandon_sub_item called with an empty sub-item stack");
        assert_eq!(
            marker, token.0,
            "sub-item tokens must be closed in LIFO order"
        );
        self.buf.truncate(marker);
    }

    /// Emits a legacy `StartGroup` tag for the grouped sub-item strategy —
    /// no length measurement, so no token is needed; the matching
    /// `write_group_end` just emits `EndGroup` with the same field number.
    pub fn write_group_start(&mut self, field: u32) {
        self.write_field_header(Tag::new(field, WireType::StartGroup));
    }

    pub fn write_group_end(&mut self, field: u32) {
        self.write_field_header(Tag::new(field, WireType::EndGroup));
    }

    /// Flushes all staged bytes to the sink. Fails if a sub-item was left
    /// open (spec §3's "exactly one matching `EndSubItem`" invariant).
    pub fn close(mut self) -> Result<(), Error> {
        if !self.stack.is_empty() {
            return Err(Error::ConfigurationError(format!(
                "{} sub-item(s) left open at close",
                self.stack.len()
            )));
        }
        self.sink.write_all(&self.buf)?;
        Ok(())
    }

    /// Discards everything staged so far without touching the sink.
    pub fn abandon(self) {
        // Dropping `self` drops `self.buf`; nothing more to do. Named
        // explicitly (spec §3) so callers don't need to reach for `drop`.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_sub_items_measure_correctly() {
        let mut out = Vec::new();
        {
            let mut w = WriterState::new(&mut out);
            let outer = w.start_sub_item(Tag::new(1, WireType::LengthDelimited));
            w.write_field_header(Tag::new(1, WireType::Varint));
            w.write_uint64(5);
            let inner = w.start_sub_item(Tag::new(2, WireType::LengthDelimited));
            w.write_raw_bytes(&[0xaa, 0xbb]);
            w.end_sub_item(inner);
            w.end_sub_item(outer);
            w.close().unwrap();
        }
        // tag(1,LEN) len=7 [ tag(1,varint) 5  tag(2,LEN) len=2 [aa bb] ]
        assert_eq!(out, vec![0x0a, 0x07, 0x08, 0x05, 0x12, 0x02, 0xaa, 0xbb]);
    }

    #[test]
    fn close_fails_with_open_sub_item() {
        let mut out = Vec::new();
        let mut w = WriterState::new(&mut out);
        let _token = w.start_sub_item(Tag::new(1, WireType::LengthDelimited));
        assert!(matches!(
            w.close().unwrap_err(),
            Error::ConfigurationError(_)
        ));
    }

    #[test]
    #[should_panic(expected = "LIFO")]
    fn end_sub_item_out_of_order_panics() {
        let mut out = Vec::new();
        let mut w = WriterState::new(&mut out);
        let a = w.start_sub_item(Tag::new(1, WireType::LengthDelimited));
        let b = w.start_sub_item(Tag::new(2, WireType::LengthDelimited));
        let _ = b;
        w.end_sub_item(a);
    }

    #[test]
    fn abandon_drops_everything_staged() {
        let mut out = Vec::new();
        let mut w = WriterState::new(&mut out);
        w.write_uint32(1);
        w.abandon();
        assert!(out.is_empty());
    }

    #[test]
    fn packed_root_list_matches_spec_scenario_4() {
        // List<int>{1,2,3} at root, unpacked: 08 01 08 02 08 03
        let mut out = Vec::new();
        {
            let mut w = WriterState::new(&mut out);
            for v in [1u32, 2, 3] {
                w.write_field_header(Tag::new(1, WireType::Varint));
                w.write_uint32(v);
            }
            w.close().unwrap();
        }
        assert_eq!(out, vec![0x08, 0x01, 0x08, 0x02, 0x08, 0x03]);

        // packed: 0A 03 01 02 03
        let mut out = Vec::new();
        {
            let mut w = WriterState::new(&mut out);
            let token = w.start_sub_item(Tag::new(1, WireType::LengthDelimited));
            for v in [1u32, 2, 3] {
                w.write_uint32(v);
            }
            w.end_sub_item(token);
            w.close().unwrap();
        }
        assert_eq!(out, vec![0x0a, 0x03, 0x01, 0x02, 0x03]);
    }
}
