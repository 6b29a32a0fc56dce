//! Message descriptors: the Rust substitute for reflection over struct
//! fields. See spec §3/§4.5.

use crate::error::Error;
use crate::model::TypeModel;
use crate::reader::ReaderState;
use crate::wire::{Tag, WireType};
use crate::writer::WriterState;

/// Entry point a message type implements so the model can auto-construct a
/// dispatch stub for it (`ModelOptions::auto_add_missing_types`,
/// `register_message`).
pub trait ProtoMessage: Sized + 'static {
    fn descriptor() -> MessageDescriptor<Self>;
}

/// Distinguishes a scalar field (written as a single wire value) from a
/// message field (wrapped in a length-delimited sub-item) for the parts of
/// `MessageSerializer` that need to know whether to open a sub-item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    Message,
}

type WriteFn<T> = Box<dyn Fn(&T, &mut WriterState, &TypeModel) -> Result<(), Error> + Send + Sync>;
type ReadFn<T> =
    Box<dyn Fn(&mut T, &mut ReaderState, &TypeModel) -> Result<(), Error> + Send + Sync>;

/// One field of a `MessageDescriptor<T>`: its wire tag, its kind, and two
/// closures bound to `T` at construction time — this is what stands in for
/// runtime member introspection (spec §3).
pub struct FieldDescriptor<T> {
    pub tag: Tag,
    pub kind: FieldKind,
    pub packed: bool,
    pub required: bool,
    write: WriteFn<T>,
    read: ReadFn<T>,
}

impl<T> FieldDescriptor<T> {
    pub(crate) fn write(
        &self,
        value: &T,
        writer: &mut WriterState,
        model: &TypeModel,
    ) -> Result<(), Error> {
        (self.write)(value, writer, model)
    }

    pub(crate) fn read(
        &self,
        value: &mut T,
        reader: &mut ReaderState,
        model: &TypeModel,
    ) -> Result<(), Error> {
        (self.read)(value, reader, model)
    }

    /// Marks this field required: `MessageSerializer::read` fails with
    /// `Error::MissingRequiredField` if the message is deserialized without
    /// this field's tag ever appearing (spec §3's "is-required" descriptor
    /// bit).
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// A plain scalar field stored directly on `T` (no `Option` wrapper —
    /// absence is represented by the zero/default value, matching
    /// protobuf's scalar-field convention). `Enc` picks the wire encoding
    /// (spec §4.5's `Int32Variant`/`Int64Variant` family) independently of
    /// `F`'s native Rust representation.
    pub fn scalar<F, Enc>(
        field: u32,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        get_mut: impl Fn(&mut T) -> &mut F + Send + Sync + 'static,
    ) -> Self
    where
        F: Clone + Default + PartialEq + Send + Sync + 'static,
        Enc: crate::ser::int_encoding::IntEncoding<F>,
    {
        let tag = Tag::new(field, Enc::WIRE_TYPE);
        FieldDescriptor {
            tag,
            kind: FieldKind::Scalar,
            packed: false,
            required: false,
            write: Box::new(move |value, writer, _model| {
                let field_value = get(value);
                if *field_value == F::default() {
                    return Ok(());
                }
                writer.write_field_header(tag);
                Enc::write(writer, field_value);
                Ok(())
            }),
            read: Box::new(move |value, reader, _model| {
                *get_mut(value) = Enc::read(reader)?;
                Ok(())
            }),
        }
    }

    /// A `String`/`Vec<u8>` scalar field, via `ScalarCodec`.
    pub fn scalar_bytes<F>(
        field: u32,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        get_mut: impl Fn(&mut T) -> &mut F + Send + Sync + 'static,
    ) -> Self
    where
        F: Clone + Default + PartialEq + Send + Sync + 'static,
        F: crate::ser::scalar_codec::ScalarCodec,
    {
        let tag = Tag::new(field, WireType::LengthDelimited);
        FieldDescriptor {
            tag,
            kind: FieldKind::Scalar,
            packed: false,
            required: false,
            write: Box::new(move |value, writer, _model| {
                let field_value = get(value);
                if *field_value == F::default() {
                    return Ok(());
                }
                writer.write_field_header(tag);
                field_value.write(writer);
                Ok(())
            }),
            read: Box::new(move |value, reader, _model| {
                *get_mut(value) = F::read(reader)?;
                Ok(())
            }),
        }
    }

    /// An optional nested message field, wrapped in its own length-delimited
    /// sub-item. Nested types are resolved through the model's `TypeId`
    /// dispatch rather than a closure captured at registration time, so `F`
    /// may be registered after `T` (spec §4.5's cyclic-graph supplement).
    pub fn message<F>(
        field: u32,
        get: impl Fn(&T) -> &Option<F> + Send + Sync + 'static,
        get_mut: impl Fn(&mut T) -> &mut Option<F> + Send + Sync + 'static,
    ) -> Self
    where
        F: ProtoMessage + Clone + Send + Sync + 'static,
    {
        let tag = Tag::new(field, WireType::LengthDelimited);
        FieldDescriptor {
            tag,
            kind: FieldKind::Message,
            packed: false,
            required: false,
            write: Box::new(move |value, writer, model| {
                if let Some(inner) = get(value) {
                    let token = writer.start_sub_item(tag);
                    model.serialize_message(writer, inner)?;
                    writer.end_sub_item(token);
                }
                Ok(())
            }),
            read: Box::new(move |value, reader, model| {
                reader.start_sub_item()?;
                // A field repeated in the same message merges into the
                // previously decoded value rather than replacing it,
                // matching protobuf's singular-message merge semantics.
                let existing = get(value).clone();
                let decoded = model.deserialize_message(reader, existing)?;
                reader.end_sub_item()?;
                *get_mut(value) = Some(decoded);
                Ok(())
            }),
        }
    }

    /// A repeated scalar field backed by `Vec<E>` via `ScalarCodec` (the
    /// element's one natural encoding). `packed` chooses the write-side
    /// encoding; both forms are always accepted on read (spec §4.5).
    pub fn repeated_scalar<E>(
        field: u32,
        packed: bool,
        get: impl Fn(&T) -> &Vec<E> + Send + Sync + 'static,
        get_mut: impl Fn(&mut T) -> &mut Vec<E> + Send + Sync + 'static,
    ) -> Self
    where
        E: crate::ser::scalar_codec::ScalarCodec + Send + Sync + 'static,
    {
        let packed = packed && E::WIRE_TYPE != WireType::LengthDelimited;
        // Whether the *bytes on the wire* could ever be a packed blob for
        // this element type, regardless of how this field was registered.
        // Length-delimited elements (strings, bytes, sub-messages) never
        // pack, so a `LengthDelimited` tag for those is always one element;
        // for packable element types it's ambiguous from the tag alone, so
        // we accept either form (spec §4.5: "on read, accept either form").
        let read_may_be_packed = E::WIRE_TYPE != WireType::LengthDelimited;
        let tag = Tag::new(field, E::WIRE_TYPE);
        FieldDescriptor {
            tag,
            kind: FieldKind::Scalar,
            packed,
            required: false,
            write: Box::new(move |value, writer, _model| {
                let items = get(value);
                if items.is_empty() {
                    return Ok(());
                }
                if packed {
                    let packed_tag = Tag::new(field, WireType::LengthDelimited);
                    let token = writer.start_sub_item(packed_tag);
                    for item in items {
                        item.write(writer);
                    }
                    writer.end_sub_item(token);
                } else {
                    for item in items {
                        writer.write_field_header(tag);
                        item.write(writer);
                    }
                }
                Ok(())
            }),
            read: Box::new(move |value, reader, _model| {
                let items = get_mut(value);
                if read_may_be_packed && reader.current_wire_type() == WireType::LengthDelimited {
                    reader.start_sub_item()?;
                    while !reader.is_at_end() {
                        items.push(E::read(reader)?);
                    }
                    reader.end_sub_item()?;
                } else {
                    items.push(E::read(reader)?);
                }
                Ok(())
            }),
        }
    }

    /// A repeated scalar field backed by a `Frozen<E>` immutable collection
    /// rather than a plain `Vec<E>` (spec §4.5's immutable-collection
    /// strategy). Builds via `ImmutableCollection` on read, iterates via it
    /// on write.
    pub fn frozen_scalar<E>(
        field: u32,
        packed: bool,
        get: impl Fn(&T) -> &crate::ser::immutable::Frozen<E> + Send + Sync + 'static,
        get_mut: impl Fn(&mut T) -> &mut crate::ser::immutable::Frozen<E> + Send + Sync + 'static,
    ) -> Self
    where
        E: crate::ser::scalar_codec::ScalarCodec + Clone + Send + Sync + 'static,
    {
        use crate::ser::immutable::{Frozen, ImmutableCollection};

        let packed = packed && E::WIRE_TYPE != WireType::LengthDelimited;
        // See `repeated_scalar`: the read side accepts either wire form
        // regardless of how this field was registered for writing.
        let read_may_be_packed = E::WIRE_TYPE != WireType::LengthDelimited;
        let tag = Tag::new(field, E::WIRE_TYPE);
        FieldDescriptor {
            tag,
            kind: FieldKind::Scalar,
            packed,
            required: false,
            write: Box::new(move |value, writer, _model| {
                let items = get(value);
                if items.is_empty() {
                    return Ok(());
                }
                if packed {
                    let packed_tag = Tag::new(field, WireType::LengthDelimited);
                    let token = writer.start_sub_item(packed_tag);
                    for item in items.iter() {
                        item.write(writer);
                    }
                    writer.end_sub_item(token);
                } else {
                    for item in items.iter() {
                        writer.write_field_header(tag);
                        item.write(writer);
                    }
                }
                Ok(())
            }),
            read: Box::new(move |value, reader, _model| {
                let mut builder = Frozen::<E>::builder();
                for existing in get(value).iter() {
                    Frozen::push(&mut builder, existing.clone());
                }
                if read_may_be_packed && reader.current_wire_type() == WireType::LengthDelimited {
                    reader.start_sub_item()?;
                    while !reader.is_at_end() {
                        Frozen::push(&mut builder, E::read(reader)?);
                    }
                    reader.end_sub_item()?;
                } else {
                    Frozen::push(&mut builder, E::read(reader)?);
                }
                *get_mut(value) = Frozen::finish(builder);
                Ok(())
            }),
        }
    }

    /// A `HashMap<K, V>`/`BTreeMap<K, V>` field of scalar keys and values.
    /// Each entry is its own length-delimited submessage (field 1 key,
    /// field 2 value); a later entry with a duplicate key overwrites the
    /// earlier one (spec §4.5/§8).
    pub fn map_scalar<M, K, V>(
        field: u32,
        get: impl Fn(&T) -> &M + Send + Sync + 'static,
        get_mut: impl Fn(&mut T) -> &mut M + Send + Sync + 'static,
    ) -> Self
    where
        M: crate::ser::dictionaries::MapLike<K, V> + Send + Sync + 'static,
        K: crate::ser::scalar_codec::ScalarCodec + Default + Send + Sync + 'static,
        V: crate::ser::scalar_codec::ScalarCodec + Default + Send + Sync + 'static,
    {
        let tag = Tag::new(field, WireType::LengthDelimited);
        FieldDescriptor {
            tag,
            kind: FieldKind::Scalar,
            packed: false,
            required: false,
            write: Box::new(move |value, writer, _model| {
                for (key, val) in get(value).entries() {
                    crate::ser::dictionaries::write_entry(writer, tag, key, val);
                }
                Ok(())
            }),
            read: Box::new(move |value, reader, _model| {
                let (key, val) = crate::ser::dictionaries::read_entry(reader)?;
                get_mut(value).upsert(key, val);
                Ok(())
            }),
        }
    }

    /// A repeated nested-message field backed by `Vec<E>`. Message fields
    /// never pack (each element is already length-delimited).
    pub fn repeated_message<E>(
        field: u32,
        get: impl Fn(&T) -> &Vec<E> + Send + Sync + 'static,
        get_mut: impl Fn(&mut T) -> &mut Vec<E> + Send + Sync + 'static,
    ) -> Self
    where
        E: ProtoMessage + Send + Sync + 'static,
    {
        let tag = Tag::new(field, WireType::LengthDelimited);
        FieldDescriptor {
            tag,
            kind: FieldKind::Message,
            packed: false,
            required: false,
            write: Box::new(move |value, writer, model| {
                for item in get(value) {
                    let token = writer.start_sub_item(tag);
                    model.serialize_message(writer, item)?;
                    writer.end_sub_item(token);
                }
                Ok(())
            }),
            read: Box::new(move |value, reader, model| {
                reader.start_sub_item()?;
                let decoded = model.deserialize_message(reader, None)?;
                reader.end_sub_item()?;
                get_mut(value).push(decoded);
                Ok(())
            }),
        }
    }
}

/// The `Serializer<T>` a registered message descriptor runs through:
/// iterates its fields in order, then its sub-type links (spec §4.5/§4.6).
pub(crate) struct MessageSerializer<T: 'static> {
    descriptor: MessageDescriptor<T>,
    model: TypeModel,
}

impl<T: 'static> MessageSerializer<T> {
    pub fn new(descriptor: MessageDescriptor<T>, model: TypeModel) -> Self {
        MessageSerializer { descriptor, model }
    }
}

impl<T: Send + Sync + 'static> crate::serializer::Serializer<T> for MessageSerializer<T> {
    fn features(&self) -> crate::serializer::Features {
        crate::serializer::Features::message()
    }

    fn write(&self, writer: &mut WriterState, value: &T) -> Result<(), Error> {
        for field in &self.descriptor.fields {
            field.write(value, writer, &self.model)?;
        }
        for sub_type in &self.descriptor.sub_types {
            sub_type.try_write(value, writer, &self.model)?;
        }
        Ok(())
    }

    fn read(&self, reader: &mut ReaderState, existing: Option<T>) -> Result<T, Error> {
        let mut value = existing.unwrap_or_else(|| (self.descriptor.construct)());
        let mut seen = std::collections::HashSet::new();
        while let Some(tag) = reader.read_field_header()? {
            if let Some(field) = self.descriptor.find_field(tag.field) {
                field.read(&mut value, reader, &self.model)?;
                seen.insert(tag.field);
            } else if let Some(sub_type) = self.descriptor.find_sub_type(tag.field) {
                value = sub_type.read(reader, &self.model)?;
                seen.insert(tag.field);
            } else if self.model.options().reject_unknown_fields {
                return Err(Error::ConfigurationError(format!(
                    "unknown field {} (reject_unknown_fields is set)",
                    tag.field
                )));
            } else {
                tracing::trace!(field = tag.field, "skipping unknown field");
                reader.skip_field()?;
            }
        }
        for field in &self.descriptor.fields {
            if field.required && !seen.contains(&field.tag.field) {
                return Err(Error::MissingRequiredField {
                    field: field.tag.field,
                });
            }
        }
        Ok(value)
    }
}

/// Ordered field list plus a zero-value constructor and an optional
/// tagged-sub-type table (inheritance-like polymorphism, spec §4.5).
pub struct MessageDescriptor<T: 'static> {
    pub(crate) fields: Vec<FieldDescriptor<T>>,
    pub(crate) construct: fn() -> T,
    pub(crate) sub_types: Vec<crate::model::subtype::SubTypeLink<T>>,
}

impl<T: 'static> MessageDescriptor<T> {
    pub fn new(construct: fn() -> T) -> Self {
        MessageDescriptor {
            fields: Vec::new(),
            construct,
            sub_types: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDescriptor<T>) -> Self {
        self.fields.push(field);
        self
    }

    pub fn sub_type(mut self, link: crate::model::subtype::SubTypeLink<T>) -> Self {
        self.sub_types.push(link);
        self
    }

    pub(crate) fn find_field(&self, field_number: u32) -> Option<&FieldDescriptor<T>> {
        self.fields.iter().find(|f| f.tag.field == field_number)
    }

    pub(crate) fn find_sub_type(
        &self,
        field_number: u32,
    ) -> Option<&crate::model::subtype::SubTypeLink<T>> {
        self.sub_types.iter().find(|s| s.field == field_number)
    }
}
