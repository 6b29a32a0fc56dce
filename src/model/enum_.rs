//! Enum serialization: a declared-value <-> wire-value mapping, with a
//! strict/lenient policy for wire values with no declared mapping. See spec
//! §4.5/§4.8.

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::Error;
use crate::reader::ReaderState;
use crate::serializer::{Features, Serializer};
use crate::wire::WireType;
use crate::writer::WriterState;

/// Records which constructor built an `EnumDescriptor`, purely for callers
/// that want to introspect it (the serialization behavior itself is the
/// same code path either way).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumMode {
    /// The declared value *is* the wire value (`T: Into<i64> + TryFrom<i64>`
    /// on the nose, no translation table needed).
    Passthrough,
    /// An explicit declared-to-wire table, with a strict/lenient policy for
    /// unmapped wire values.
    Mapped { strict: bool },
}

pub struct EnumDescriptor<T> {
    mode: EnumMode,
    to_wire: HashMap<T, i64>,
    from_wire: HashMap<i64, T>,
    default: T,
}

impl<T: Eq + Hash + Clone> EnumDescriptor<T> {
    /// Builds a mapped descriptor from an explicit `(declared, wire)` table.
    /// `default` is what an unmapped wire value decodes to when not
    /// `strict`.
    pub fn mapped(pairs: Vec<(T, i64)>, default: T, strict: bool) -> Self {
        let mut to_wire = HashMap::with_capacity(pairs.len());
        let mut from_wire = HashMap::with_capacity(pairs.len());
        for (declared, wire) in pairs {
            to_wire.insert(declared.clone(), wire);
            from_wire.insert(wire, declared);
        }
        EnumDescriptor {
            mode: EnumMode::Mapped { strict },
            to_wire,
            from_wire,
            default,
        }
    }

    pub fn mode(&self) -> EnumMode {
        self.mode
    }
}

impl<T> EnumDescriptor<T>
where
    T: Eq + Hash + Clone + Into<i64> + TryFrom<i64>,
{
    /// Builds a passthrough descriptor over every variant in `all_variants`
    /// (the declared value is used as the wire value directly).
    pub fn passthrough(all_variants: Vec<T>, default: T) -> Self {
        let pairs: Vec<(T, i64)> = all_variants
            .into_iter()
            .map(|v| {
                let wire: i64 = v.clone().into();
                (v, wire)
            })
            .collect();
        let mut descriptor = Self::mapped(pairs, default, false);
        descriptor.mode = EnumMode::Passthrough;
        descriptor
    }
}

impl<T> Serializer<T> for EnumDescriptor<T>
where
    T: Eq + Hash + Clone + Send + Sync,
{
    fn features(&self) -> Features {
        Features::scalar(WireType::Varint)
    }

    fn read(&self, reader: &mut ReaderState, _existing: Option<T>) -> Result<T, Error> {
        let wire = reader.read_int64()?;
        match self.from_wire.get(&wire) {
            Some(declared) => Ok(declared.clone()),
            None => match self.mode {
                EnumMode::Mapped { strict: true } => Err(Error::UnknownEnumValue { value: wire }),
                _ => {
                    tracing::debug!(wire, "unmapped enum wire value, falling back to default");
                    Ok(self.default.clone())
                }
            },
        }
    }

    fn write(&self, writer: &mut WriterState, value: &T) -> Result<(), Error> {
        let wire = self.to_wire.get(value).copied().ok_or_else(|| {
            Error::ConfigurationError("enum value has no declared wire mapping".to_string())
        })?;
        writer.write_int64(wire);
        Ok(())
    }
}
