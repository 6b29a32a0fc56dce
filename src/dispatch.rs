//! Type-erased dispatch from a `TypeId` to a concrete, statically-typed
//! `Serializer<T>`. See spec §3/§4.7.
//!
//! Rust has no runtime reflection, so there is no way to hold a
//! heterogeneous collection of `Serializer<T>` for different `T` except
//! behind a common non-generic trait object. `DispatchStub` is that trait
//! object: `TypedStub<T>` implements it once, generically, for every `T`,
//! closing over a concrete `Arc<dyn Serializer<T>>` and downcasting the
//! type-erased `&dyn Any` arguments back to `&T`/`T` internally. The
//! downcast can never fail in practice because a stub is only ever reached
//! through the registry entry keyed by `TypeId::of::<T>()`.

use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::error::Error;
use crate::reader::ReaderState;
use crate::serializer::{Features, Serializer};
use crate::writer::WriterState;

/// Non-generic face of a `Serializer<T>` for some erased `T`, keyed in the
/// model's registry by `TypeId`.
pub trait DispatchStub: Send + Sync {
    fn type_id(&self) -> TypeId;

    fn features(&self) -> Features;

    /// Writes `value` (must be a `&T` for this stub's `T`) into `writer`.
    fn write_any(&self, writer: &mut WriterState, value: &dyn Any) -> Result<(), Error>;

    /// Reads one value of `T`, merging into `existing` if given. Returns a
    /// boxed `T`.
    fn read_any(
        &self,
        reader: &mut ReaderState,
        existing: Option<Box<dyn Any>>,
    ) -> Result<Box<dyn Any>, Error>;
}

pub struct TypedStub<T> {
    serializer: Arc<dyn Serializer<T>>,
}

impl<T> TypedStub<T> {
    pub fn new(serializer: Arc<dyn Serializer<T>>) -> Self {
        TypedStub { serializer }
    }
}

impl<T: 'static> DispatchStub for TypedStub<T> {
    fn type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn features(&self) -> Features {
        self.serializer.features()
    }

    fn write_any(&self, writer: &mut WriterState, value: &dyn Any) -> Result<(), Error> {
        let value = value.downcast_ref::<T>().ok_or_else(|| {
            Error::ConfigurationError("dispatch stub type mismatch on write".to_string())
        })?;
        self.serializer.write(writer, value)
    }

    fn read_any(
        &self,
        reader: &mut ReaderState,
        existing: Option<Box<dyn Any>>,
    ) -> Result<Box<dyn Any>, Error> {
        let existing = match existing {
            Some(boxed) => Some(*boxed.downcast::<T>().map_err(|_| {
                Error::ConfigurationError("dispatch stub type mismatch on read".to_string())
            })?),
            None => None,
        };
        let value = self.serializer.read(reader, existing)?;
        Ok(Box::new(value))
    }
}

/// Registry entry. `Constructing` is published under the write lock before
/// a stub is built so a build that re-enters the registry for its own type
/// (which should never happen for a well-formed model) is caught as a
/// configuration error instead of deadlocking or infinitely recursing.
pub(crate) enum Entry {
    Constructing,
    Ready(Arc<dyn DispatchStub>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::Category;
    use crate::wire::WireType;

    struct EchoU32;

    impl Serializer<u32> for EchoU32 {
        fn features(&self) -> Features {
            Features::scalar(WireType::Varint)
        }

        fn read(&self, reader: &mut ReaderState, _existing: Option<u32>) -> Result<u32, Error> {
            reader.read_uint32()
        }

        fn write(&self, writer: &mut WriterState, value: &u32) -> Result<(), Error> {
            writer.write_uint32(*value);
            Ok(())
        }
    }

    #[test]
    fn typed_stub_roundtrips_through_any() {
        let stub: Arc<dyn DispatchStub> = Arc::new(TypedStub::new(Arc::new(EchoU32)));
        assert_eq!(stub.type_id(), TypeId::of::<u32>());
        assert_eq!(stub.features().category, Category::Scalar);

        let mut buf = Vec::new();
        {
            let mut w = WriterState::new(&mut buf);
            stub.write_any(&mut w, &7u32).unwrap();
            w.close().unwrap();
        }
        let mut r = ReaderState::new(&buf);
        let boxed = stub.read_any(&mut r, None).unwrap();
        assert_eq!(*boxed.downcast::<u32>().unwrap(), 7);
    }

    #[test]
    fn write_any_rejects_mismatched_type() {
        let stub: Arc<dyn DispatchStub> = Arc::new(TypedStub::new(Arc::new(EchoU32)));
        let mut buf = Vec::new();
        let mut w = WriterState::new(&mut buf);
        assert!(matches!(
            stub.write_any(&mut w, &"not a u32".to_string()),
            Err(Error::ConfigurationError(_))
        ));
    }
}
