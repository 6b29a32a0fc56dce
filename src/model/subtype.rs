//! Tagged-union polymorphism: a base message type whose wire encoding picks
//! one of several derived types by a dedicated field number, since Rust has
//! no runtime-open class hierarchies to hang a tag table off of. See spec
//! §4.5.

use crate::error::Error;
use crate::model::message::ProtoMessage;
use crate::model::TypeModel;
use crate::reader::ReaderState;
use crate::wire::{Tag, WireType};
use crate::writer::WriterState;

/// A derived type participating in `Base`'s tagged union.
pub trait SubType<Base>: ProtoMessage + Clone {
    fn into_base(self) -> Base;
    fn from_base(base: &Base) -> Option<&Self>;
}

type SubTypeWrite<Base> =
    Box<dyn Fn(&Base, &mut WriterState, &TypeModel) -> Result<bool, Error> + Send + Sync>;
type SubTypeRead<Base> =
    Box<dyn Fn(&mut ReaderState, &TypeModel) -> Result<Base, Error> + Send + Sync>;

/// Binds one derived type `D` to a field number on `Base`'s envelope. At
/// most one link's case should match a given `Base` value; `write` returns
/// `false` (and writes nothing) when `D` isn't the active case.
pub struct SubTypeLink<Base> {
    pub field: u32,
    write: SubTypeWrite<Base>,
    read: SubTypeRead<Base>,
}

impl<Base: 'static> SubTypeLink<Base> {
    pub fn new<D>(field: u32) -> Self
    where
        D: SubType<Base> + Send + Sync + 'static,
    {
        SubTypeLink {
            field,
            write: Box::new(move |base, writer, model| match D::from_base(base) {
                Some(derived) => {
                    let tag = Tag::new(field, WireType::LengthDelimited);
                    let token = writer.start_sub_item(tag);
                    model.serialize_message(writer, derived)?;
                    writer.end_sub_item(token);
                    Ok(true)
                }
                None => Ok(false),
            }),
            read: Box::new(move |reader, model| {
                reader.start_sub_item()?;
                let derived: D = model.deserialize_message(reader, None)?;
                reader.end_sub_item()?;
                Ok(derived.into_base())
            }),
        }
    }

    pub(crate) fn try_write(
        &self,
        base: &Base,
        writer: &mut WriterState,
        model: &TypeModel,
    ) -> Result<bool, Error> {
        (self.write)(base, writer, model)
    }

    pub(crate) fn read(&self, reader: &mut ReaderState, model: &TypeModel) -> Result<Base, Error> {
        (self.read)(reader, model)
    }
}
