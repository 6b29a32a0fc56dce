//! Surrogates: substituting an alternate representation `S` for a type `T`
//! that the model would otherwise not know how to serialize directly. See
//! spec §4.5.

use crate::error::Error;
use crate::model::message::ProtoMessage;
use crate::model::TypeModel;
use crate::reader::ReaderState;
use crate::serializer::{Features, Serializer};
use crate::writer::WriterState;

/// Lifecycle hooks fired on the surrogate value `S`, not on `T` — mirrors
/// the common "pre/post (de)serialize callback" shape without tying the
/// hooks to `T` itself, since by the time a hook runs the conversion has
/// already happened one way or the other.
#[derive(Default)]
pub struct SurrogateHooks<S> {
    pub on_serializing: Option<fn(&mut S)>,
    pub on_serialized: Option<fn(&S)>,
    pub on_deserializing: Option<fn(&mut S)>,
    pub on_deserialized: Option<fn(&mut S)>,
}

/// A pair of total conversion functions `T <-> S`, registered via
/// `TypeModel::set_surrogate` to swap out `T`'s wire representation for
/// `S`'s.
pub struct Surrogate<T, S> {
    pub to_surrogate: fn(&T) -> S,
    pub from_surrogate: fn(S) -> T,
    pub hooks: SurrogateHooks<S>,
}

impl<T, S> Surrogate<T, S> {
    pub fn new(to_surrogate: fn(&T) -> S, from_surrogate: fn(S) -> T) -> Self {
        Surrogate {
            to_surrogate,
            from_surrogate,
            hooks: SurrogateHooks::default(),
        }
    }

    pub fn with_hooks(mut self, hooks: SurrogateHooks<S>) -> Self {
        self.hooks = hooks;
        self
    }
}

/// The `Serializer<T>` that `TypeModel::set_surrogate` publishes: converts
/// to `S`, delegates to `S`'s own registered serializer (looked up by
/// `TypeId` at call time, same late-binding rule as nested message fields),
/// converts back.
pub(crate) struct SurrogateSerializer<T, S> {
    surrogate: Surrogate<T, S>,
    model: TypeModel,
}

impl<T, S> SurrogateSerializer<T, S> {
    pub fn new(surrogate: Surrogate<T, S>, model: TypeModel) -> Self {
        SurrogateSerializer { surrogate, model }
    }
}

impl<T, S> Serializer<T> for SurrogateSerializer<T, S>
where
    T: Send + Sync,
    S: ProtoMessage + Send + Sync + 'static,
{
    fn features(&self) -> Features {
        Features::wrapper(crate::wire::WireType::LengthDelimited)
    }

    fn read(&self, reader: &mut ReaderState, _existing: Option<T>) -> Result<T, Error> {
        let mut surrogate_value = self.model.deserialize_message::<S>(reader, None)?;
        if let Some(hook) = self.surrogate.hooks.on_deserializing {
            hook(&mut surrogate_value);
        }
        if let Some(hook) = self.surrogate.hooks.on_deserialized {
            hook(&mut surrogate_value);
        }
        Ok((self.surrogate.from_surrogate)(surrogate_value))
    }

    fn write(&self, writer: &mut WriterState, value: &T) -> Result<(), Error> {
        let mut surrogate_value = (self.surrogate.to_surrogate)(value);
        if let Some(hook) = self.surrogate.hooks.on_serializing {
            hook(&mut surrogate_value);
        }
        self.model.serialize_message(writer, &surrogate_value)?;
        if let Some(hook) = self.surrogate.hooks.on_serialized {
            hook(&surrogate_value);
        }
        Ok(())
    }
}
