//! `ReaderState`: a positional cursor over one input buffer, with a
//! sub-item stack for bounded (length-delimited) regions. See spec §3/§4.2.
//!
//! An owned cursor with an explicit sub-item stack rather than a streaming
//! iterator, since the type model needs `start_sub_item`/`end_sub_item` as
//! first-class operations (spec §3).

use std::rc::Rc;

use crate::context::Context;
use crate::error::{Error, OverrunContext};
use crate::intern::InternPool;
use crate::wire::{Tag, WireType};

/// Default recursion guard, generous enough for realistic message graphs
/// while still catching runaway self-referential cycles (spec §4.2, §7).
pub const DEFAULT_DEPTH_LIMIT: usize = 100;

pub struct ReaderState<'a> {
    data: &'a [u8],
    pos: usize,
    /// Absolute end offset of the innermost active region. Starts as
    /// `data.len()`.
    limit: usize,
    /// Limits of enclosing regions, outermost first.
    stack: Vec<usize>,
    depth_limit: usize,
    current: Option<Tag>,
    intern: Option<InternPool>,
    context: Context,
}

impl<'a> ReaderState<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_options(data, DEFAULT_DEPTH_LIMIT, false)
    }

    pub fn with_options(data: &'a [u8], depth_limit: usize, intern_strings: bool) -> Self {
        ReaderState {
            limit: data.len(),
            data,
            pos: 0,
            stack: Vec::new(),
            depth_limit,
            current: None,
            intern: intern_strings.then(InternPool::new),
            context: Context::new(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read in the innermost active region.
    pub fn remaining(&self) -> usize {
        self.limit - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.limit
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn current_tag(&self) -> Tag {
        self.current
            .expect("scalar read without a preceding read_field_header")
    }

    /// The wire type of the most recently read field header. Used by
    /// repeated-field decoding to tell a packed encoding (length-delimited)
    /// from an unpacked one (the element's own wire type) without the
    /// caller re-threading the tag.
    pub fn current_wire_type(&self) -> WireType {
        self.current_tag().wire_type
    }

    /// Reads the next field header, or `None` if the current region
    /// (sub-item, or the whole input at the root) is exhausted.
    pub fn read_field_header(&mut self) -> Result<Option<Tag>, Error> {
        if self.is_at_end() {
            self.current = None;
            return Ok(None);
        }
        match Tag::decode(&self.data[self.pos..self.limit], self.pos)? {
            None => {
                self.current = None;
                Ok(None)
            }
            Some((tag, consumed)) => {
                self.pos += consumed;
                self.current = Some(tag);
                Ok(Some(tag))
            }
        }
    }

    fn take_bytes(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.pos + n > self.limit {
            return Err(Error::Truncated {
                offset: self.pos,
                needed: self.pos + n - self.limit,
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn raw_varint(&mut self) -> Result<u64, Error> {
        let (value, consumed) =
            crate::wire::decode_varint(&self.data[self.pos..self.limit], self.pos)?;
        self.pos += consumed;
        Ok(value)
    }

    fn raw_fixed32(&mut self) -> Result<u32, Error> {
        let bytes = self.take_bytes(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn raw_fixed64(&mut self) -> Result<u64, Error> {
        let bytes = self.take_bytes(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// Reads an integer payload, accepting the declared wire type or the
    /// same-width fixed/varint "upgrade" pairing described in spec §4.2 for
    /// legacy data (varint tagged fields that were later changed to fixed,
    /// or vice versa, still decode).
    fn int_payload(&mut self, width64: bool) -> Result<u64, Error> {
        match self.current_tag().wire_type {
            WireType::Varint => self.raw_varint(),
            WireType::Fixed32 if !width64 => Ok(self.raw_fixed32()? as u64),
            WireType::Fixed64 if width64 => self.raw_fixed64(),
            other => Err(Error::Malformed {
                offset: self.pos,
                reason: wire_type_mismatch_reason(other),
            }),
        }
    }

    pub fn read_bool(&mut self) -> Result<bool, Error> {
        Ok(self.int_payload(false)? != 0)
    }

    pub fn read_uint32(&mut self) -> Result<u32, Error> {
        Ok(self.int_payload(false)? as u32)
    }

    pub fn read_uint64(&mut self) -> Result<u64, Error> {
        self.int_payload(true)
    }

    pub fn read_int32(&mut self) -> Result<i32, Error> {
        Ok(self.int_payload(false)? as i32)
    }

    pub fn read_int64(&mut self) -> Result<i64, Error> {
        Ok(self.int_payload(true)? as i64)
    }

    pub fn read_sint32(&mut self) -> Result<i32, Error> {
        Ok(crate::wire::zigzag_decode32(self.int_payload(false)? as u32))
    }

    pub fn read_sint64(&mut self) -> Result<i64, Error> {
        Ok(crate::wire::zigzag_decode64(self.int_payload(true)?))
    }

    pub fn read_fixed32(&mut self) -> Result<u32, Error> {
        self.expect_wire_type(WireType::Fixed32)?;
        self.raw_fixed32()
    }

    pub fn read_fixed64(&mut self) -> Result<u64, Error> {
        self.expect_wire_type(WireType::Fixed64)?;
        self.raw_fixed64()
    }

    pub fn read_sfixed32(&mut self) -> Result<i32, Error> {
        Ok(self.read_fixed32()? as i32)
    }

    pub fn read_sfixed64(&mut self) -> Result<i64, Error> {
        Ok(self.read_fixed64()? as i64)
    }

    pub fn read_float(&mut self) -> Result<f32, Error> {
        Ok(f32::from_bits(self.read_fixed32()?))
    }

    pub fn read_double(&mut self) -> Result<f64, Error> {
        Ok(f64::from_bits(self.read_fixed64()?))
    }

    fn expect_wire_type(&self, expected: WireType) -> Result<(), Error> {
        let actual = self.current_tag().wire_type;
        if actual == expected {
            Ok(())
        } else {
            Err(Error::Malformed {
                offset: self.pos,
                reason: wire_type_mismatch_reason(actual),
            })
        }
    }

    fn length_delimited_slice(&mut self) -> Result<&'a [u8], Error> {
        self.expect_wire_type(WireType::LengthDelimited)?;
        let len = self.raw_varint()? as usize;
        self.take_bytes(len)
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>, Error> {
        Ok(self.length_delimited_slice()?.to_vec())
    }

    /// Appends the current bytes field into a caller-provided buffer,
    /// supporting the pluggable-allocation scenario from spec §4.2 — if a
    /// `BytesAllocator` capability is registered on this reader's
    /// `Context`, it gets first say in how `dest` grows; otherwise this
    /// falls back to `Vec::reserve`.
    pub fn append_bytes(&mut self, dest: &mut Vec<u8>) -> Result<(), Error> {
        let bytes = self.length_delimited_slice()?;
        match self.context.bytes_allocator() {
            Some(allocator) => allocator.reserve(dest, bytes.len()),
            None => dest.reserve(bytes.len()),
        }
        dest.extend_from_slice(bytes);
        Ok(())
    }

    pub fn read_string(&mut self) -> Result<String, Error> {
        let bytes = self.length_delimited_slice()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| Error::Malformed {
                offset: self.pos,
                reason: "invalid UTF-8 in string field",
            })
    }

    /// Like `read_string`, but returns the pool's existing instance when
    /// string interning is enabled and an equal string was already seen in
    /// this `ReaderState` (spec §4.2).
    pub fn read_interned_string(&mut self) -> Result<Rc<str>, Error> {
        let bytes = self.length_delimited_slice()?;
        let s = std::str::from_utf8(bytes).map_err(|_| Error::Malformed {
            offset: self.pos,
            reason: "invalid UTF-8 in string field",
        })?;
        match &mut self.intern {
            Some(pool) => Ok(pool.intern(s)),
            None => Ok(Rc::from(s)),
        }
    }

    pub fn interning_enabled(&self) -> bool {
        self.intern.is_some()
    }

    /// Enters a length-delimited sub-item, bounding subsequent reads to its
    /// declared length. Must be paired with `end_sub_item`.
    pub fn start_sub_item(&mut self) -> Result<(), Error> {
        let tag = self.current_tag();
        self.expect_wire_type(WireType::LengthDelimited)?;
        let len = self.raw_varint()? as usize;
        let new_limit = self.pos + len;
        if new_limit > self.limit {
            return Err(Error::Overrun {
                tag: tag.field,
                offset: self.pos,
                context: OverrunContext::SubItemLength,
            });
        }
        if self.stack.len() >= self.depth_limit {
            return Err(Error::DepthExceeded {
                limit: self.depth_limit,
            });
        }
        self.stack.push(self.limit);
        self.limit = new_limit;
        Ok(())
    }

    /// Leaves the current sub-item. Fails if bytes remain unread, per the
    /// `EndSubItem` contract in spec §4.2.
    pub fn end_sub_item(&mut self) -> Result<(), Error> {
        if self.pos != self.limit {
            let tag = self.current.map(|t| t.field).unwrap_or(0);
            return Err(Error::Overrun {
                tag,
                offset: self.pos,
                context: OverrunContext::UnconsumedBytes,
            });
        }
        self.limit = self
            .stack
            .pop()
            .expect("end_sub_item called without a matching start_sub_item");
        self.current = None;
        Ok(())
    }

    /// Consumes the current field per its wire type, without interpreting
    /// the payload — used to silently skip unknown fields (spec §4.8).
    pub fn skip_field(&mut self) -> Result<(), Error> {
        match self.current_tag().wire_type {
            WireType::Varint => {
                self.raw_varint()?;
            }
            WireType::Fixed32 => {
                self.raw_fixed32()?;
            }
            WireType::Fixed64 => {
                self.raw_fixed64()?;
            }
            WireType::LengthDelimited => {
                let len = self.raw_varint()? as usize;
                self.take_bytes(len)?;
            }
            WireType::StartGroup => self.skip_group(self.current_tag().field)?,
            WireType::EndGroup => {
                return Err(Error::Malformed {
                    offset: self.pos,
                    reason: "unmatched end-group tag",
                })
            }
        }
        Ok(())
    }

    fn skip_group(&mut self, field: u32) -> Result<(), Error> {
        loop {
            let tag = self.read_field_header()?.ok_or(Error::Truncated {
                offset: self.pos,
                needed: 1,
            })?;
            if tag.wire_type == WireType::EndGroup {
                if tag.field != field {
                    return Err(Error::Malformed {
                        offset: self.pos,
                        reason: "mismatched group end tag",
                    });
                }
                return Ok(());
            }
            self.skip_field()?;
        }
    }
}

fn wire_type_mismatch_reason(actual: WireType) -> &'static str {
    match actual {
        WireType::Varint => "expected a different wire type, found Varint",
        WireType::Fixed32 => "expected a different wire type, found Fixed32",
        WireType::Fixed64 => "expected a different wire type, found Fixed64",
        WireType::LengthDelimited => "expected a different wire type, found LengthDelimited",
        WireType::StartGroup => "expected a different wire type, found StartGroup",
        WireType::EndGroup => "expected a different wire type, found EndGroup",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::WriterState;

    #[test]
    fn reads_varint_field() {
        let mut buf = Vec::new();
        {
            let mut w = WriterState::new(&mut buf);
            w.write_field_header(Tag::new(1, WireType::Varint));
            w.write_uint64(150);
            w.close().unwrap();
        }
        let mut r = ReaderState::new(&buf);
        let tag = r.read_field_header().unwrap().unwrap();
        assert_eq!(tag.field, 1);
        assert_eq!(r.read_uint64().unwrap(), 150);
        assert!(r.read_field_header().unwrap().is_none());
    }

    #[test]
    fn append_bytes_falls_back_to_heap_allocation_without_a_capability() {
        let mut buf = Vec::new();
        {
            let mut w = WriterState::new(&mut buf);
            w.write_bytes_field(Tag::new(1, WireType::LengthDelimited), &[9, 8, 7]);
            w.close().unwrap();
        }
        let mut r = ReaderState::new(&buf);
        r.read_field_header().unwrap().unwrap();
        let mut dest = Vec::new();
        r.append_bytes(&mut dest).unwrap();
        assert_eq!(dest, vec![9, 8, 7]);
    }

    #[test]
    fn append_bytes_consults_a_registered_allocator_capability() {
        use crate::context::BytesAllocator;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        struct CountingAllocator {
            reserved: AtomicUsize,
        }

        impl BytesAllocator for CountingAllocator {
            fn reserve(&self, dest: &mut Vec<u8>, additional: usize) {
                self.reserved.fetch_add(additional, Ordering::SeqCst);
                dest.reserve(additional);
            }
        }

        let mut buf = Vec::new();
        {
            let mut w = WriterState::new(&mut buf);
            w.write_bytes_field(Tag::new(1, WireType::LengthDelimited), &[1, 2, 3, 4]);
            w.close().unwrap();
        }
        let mut r = ReaderState::new(&buf);
        r.read_field_header().unwrap().unwrap();

        let allocator = Arc::new(CountingAllocator {
            reserved: AtomicUsize::new(0),
        });
        r.context_mut().set_bytes_allocator(allocator.clone());

        let mut dest = Vec::new();
        r.append_bytes(&mut dest).unwrap();
        assert_eq!(dest, vec![1, 2, 3, 4]);
        assert_eq!(allocator.reserved.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn sub_item_rejects_unconsumed_bytes() {
        let mut buf = Vec::new();
        {
            let mut w = WriterState::new(&mut buf);
            let token = w.start_sub_item(Tag::new(1, WireType::LengthDelimited));
            w.write_raw_bytes(&[1, 2, 3]);
            w.end_sub_item(token);
            w.close().unwrap();
        }
        let mut r = ReaderState::new(&buf);
        r.read_field_header().unwrap().unwrap();
        r.start_sub_item().unwrap();
        // deliberately don't consume the 3 bytes
        assert!(matches!(
            r.end_sub_item().unwrap_err(),
            Error::Overrun {
                context: OverrunContext::UnconsumedBytes,
                ..
            }
        ));
    }

    #[test]
    fn fixed_upgrade_on_legacy_varint_field() {
        let mut buf = Vec::new();
        {
            let mut w = WriterState::new(&mut buf);
            w.write_field_header(Tag::new(1, WireType::Fixed32));
            w.write_fixed32(7);
            w.close().unwrap();
        }
        let mut r = ReaderState::new(&buf);
        r.read_field_header().unwrap();
        assert_eq!(r.read_uint32().unwrap(), 7);
    }

    #[test]
    fn depth_exceeded_trips_the_guard() {
        // Build depth_limit+1 nested length-delimited fields and confirm the
        // guard trips before the innermost is ever reached.
        let mut buf = Vec::new();
        {
            let mut w = WriterState::new(&mut buf);
            fn nest(w: &mut WriterState<'_>, depth: usize) {
                if depth == 0 {
                    return;
                }
                let token = w.start_sub_item(Tag::new(1, WireType::LengthDelimited));
                nest(w, depth - 1);
                w.end_sub_item(token);
            }
            nest(&mut w, 5);
            w.close().unwrap();
        }
        let mut r = ReaderState::with_options(&buf, 3, false);
        for _ in 0..3 {
            r.read_field_header().unwrap();
            r.start_sub_item().unwrap();
        }
        r.read_field_header().unwrap();
        assert!(matches!(
            r.start_sub_item().unwrap_err(),
            Error::DepthExceeded { limit: 3 }
        ));
    }
}
