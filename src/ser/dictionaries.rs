//! Dictionary wire shape: each entry is its own length-delimited
//! submessage, field 1 the key and field 2 the value, the same convention
//! protobuf's generated `map<K, V>` support uses. Last-write-wins on a
//! duplicate key, since a later entry simply overwrites the earlier one in
//! the target map (spec §4.5/§8).

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::error::Error;
use crate::reader::ReaderState;
use crate::ser::scalar_codec::ScalarCodec;
use crate::wire::Tag;
use crate::writer::WriterState;

const KEY_FIELD: u32 = 1;
const VALUE_FIELD: u32 = 2;

/// Minimal map surface `FieldDescriptor::map_scalar` needs, implemented for
/// both map flavors the engine supports so entry write/read stays generic
/// over the container.
pub trait MapLike<K, V> {
    fn entries(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_>;
    fn upsert(&mut self, key: K, value: V);
}

impl<K: Eq + Hash, V> MapLike<K, V> for HashMap<K, V> {
    fn entries(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self.iter())
    }

    fn upsert(&mut self, key: K, value: V) {
        self.insert(key, value);
    }
}

impl<K: Ord, V> MapLike<K, V> for BTreeMap<K, V> {
    fn entries(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self.iter())
    }

    fn upsert(&mut self, key: K, value: V) {
        self.insert(key, value);
    }
}

pub fn write_entry<K: ScalarCodec, V: ScalarCodec>(
    writer: &mut WriterState,
    entry_tag: Tag,
    key: &K,
    value: &V,
) {
    let token = writer.start_sub_item(entry_tag);
    writer.write_field_header(Tag::new(KEY_FIELD, K::WIRE_TYPE));
    key.write(writer);
    writer.write_field_header(Tag::new(VALUE_FIELD, V::WIRE_TYPE));
    value.write(writer);
    writer.end_sub_item(token);
}

pub fn read_entry<K, V>(reader: &mut ReaderState) -> Result<(K, V), Error>
where
    K: ScalarCodec + Default,
    V: ScalarCodec + Default,
{
    reader.start_sub_item()?;
    let mut key = K::default();
    let mut value = V::default();
    while let Some(tag) = reader.read_field_header()? {
        match tag.field {
            KEY_FIELD => key = K::read(reader)?,
            VALUE_FIELD => value = V::read(reader)?,
            _ => reader.skip_field()?,
        }
    }
    reader.end_sub_item()?;
    Ok((key, value))
}
