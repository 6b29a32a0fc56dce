//! The type-model registry: the single place a host registers its types and
//! asks the engine to serialize/deserialize/deep-clone them. See spec
//! §3/§4.6.

pub mod enum_;
pub mod message;
pub mod subtype;
pub mod surrogate;

pub use enum_::{EnumDescriptor, EnumMode};
pub use message::{FieldDescriptor, FieldKind, MessageDescriptor, ProtoMessage};
pub use subtype::{SubType, SubTypeLink};
pub use surrogate::{Surrogate, SurrogateHooks};

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::io::Write;
use std::sync::{Arc, RwLock};

use crate::dispatch::{DispatchStub, Entry, TypedStub};
use crate::error::Error;
use crate::reader::ReaderState;
use crate::serializer::Serializer;
use crate::writer::WriterState;
use message::MessageSerializer;
use surrogate::SurrogateSerializer;

/// Tunables for a `TypeModel`. Construct via `ModelOptions::builder()`
/// rather than struct-literal syntax, matching the options-struct pattern
/// used across the pack's larger crates (spec §9).
#[derive(Debug, Clone)]
pub struct ModelOptions {
    /// Register an unregistered `ProtoMessage` type on first use instead of
    /// failing with `UnknownType`.
    pub auto_add_missing_types: bool,
    /// Reserved for a future identity-optimization pass; `TypeModel::compile`
    /// is the documented hook either way (spec §4.6).
    pub auto_compile: bool,
    /// Whether a repeated scalar field at the document root may use the
    /// packed encoding (some consumers expect root-level repeats unpacked).
    pub allow_packed_at_root: bool,
    pub intern_strings: bool,
    pub depth_limit: usize,
    /// Treat a field number with no matching descriptor entry as an error
    /// instead of silently skipping it (spec §4.8's supplement).
    pub reject_unknown_fields: bool,
}

impl Default for ModelOptions {
    fn default() -> Self {
        ModelOptions {
            auto_add_missing_types: true,
            auto_compile: false,
            allow_packed_at_root: true,
            intern_strings: false,
            depth_limit: crate::reader::DEFAULT_DEPTH_LIMIT,
            reject_unknown_fields: false,
        }
    }
}

impl ModelOptions {
    pub fn builder() -> ModelOptionsBuilder {
        ModelOptionsBuilder(ModelOptions::default())
    }
}

pub struct ModelOptionsBuilder(ModelOptions);

impl ModelOptionsBuilder {
    pub fn auto_add_missing_types(mut self, value: bool) -> Self {
        self.0.auto_add_missing_types = value;
        self
    }

    pub fn auto_compile(mut self, value: bool) -> Self {
        self.0.auto_compile = value;
        self
    }

    pub fn allow_packed_at_root(mut self, value: bool) -> Self {
        self.0.allow_packed_at_root = value;
        self
    }

    pub fn intern_strings(mut self, value: bool) -> Self {
        self.0.intern_strings = value;
        self
    }

    pub fn depth_limit(mut self, value: usize) -> Self {
        self.0.depth_limit = value;
        self
    }

    pub fn reject_unknown_fields(mut self, value: bool) -> Self {
        self.0.reject_unknown_fields = value;
        self
    }

    pub fn build(self) -> ModelOptions {
        self.0
    }
}

struct Inner {
    stubs: RwLock<HashMap<TypeId, Entry>>,
    /// Surrogate-target bookkeeping (`T -> S`'s `TypeId`), walked at
    /// `set_surrogate` time to reject a cycle before it's ever reachable at
    /// serialize time.
    surrogate_targets: RwLock<HashMap<TypeId, TypeId>>,
    options: ModelOptions,
}

/// A cheap-to-clone handle over the shared type registry. Registration
/// methods mutate the registry through this handle; `serialize`/
/// `deserialize`/`deep_clone` read it. No explicit freeze step is required
/// for correctness — the registry is safe to read concurrently with further
/// inserts (spec §4.6/§5).
#[derive(Clone)]
pub struct TypeModel(Arc<Inner>);

impl TypeModel {
    pub fn new() -> Self {
        Self::with_options(ModelOptions::default())
    }

    pub fn with_options(options: ModelOptions) -> Self {
        TypeModel(Arc::new(Inner {
            stubs: RwLock::new(HashMap::new()),
            surrogate_targets: RwLock::new(HashMap::new()),
            options,
        }))
    }

    pub fn options(&self) -> &ModelOptions {
        &self.0.options
    }

    fn lookup(&self, id: TypeId) -> Option<Arc<dyn DispatchStub>> {
        match self.0.stubs.read().unwrap().get(&id) {
            Some(Entry::Ready(stub)) => Some(stub.clone()),
            Some(Entry::Constructing) | None => None,
        }
    }

    fn publish<T: 'static>(&self, stub: Arc<dyn DispatchStub>) {
        self.0
            .stubs
            .write()
            .unwrap()
            .insert(TypeId::of::<T>(), Entry::Ready(stub));
    }

    /// Registers a hand-built `Serializer<T>`, the path `register_enum` and
    /// `set_surrogate` both funnel through.
    pub fn register_scalar<T: 'static>(&self, serializer: impl Serializer<T> + 'static) {
        let stub: Arc<dyn DispatchStub> = Arc::new(TypedStub::new(Arc::new(serializer)));
        self.publish::<T>(stub);
    }

    pub fn register_enum<T>(&self, descriptor: EnumDescriptor<T>)
    where
        T: Eq + Hash + Clone + Send + Sync + 'static,
    {
        self.register_scalar::<T>(descriptor);
    }

    /// Registers `T`'s `MessageDescriptor`. Fails if two fields declare the
    /// same field number (spec §7's `ConfigurationError`).
    pub fn register_message<T: ProtoMessage + Send + Sync + 'static>(&self) -> Result<(), Error> {
        let descriptor = T::descriptor();
        let mut seen_fields = HashSet::new();
        for field in &descriptor.fields {
            if !seen_fields.insert(field.tag.field) {
                return Err(Error::ConfigurationError(format!(
                    "duplicate field number {} in message descriptor",
                    field.tag.field
                )));
            }
        }
        for sub_type in &descriptor.sub_types {
            if !seen_fields.insert(sub_type.field) {
                return Err(Error::ConfigurationError(format!(
                    "duplicate field number {} between a field and a sub-type",
                    sub_type.field
                )));
            }
        }
        let serializer = MessageSerializer::new(descriptor, self.clone());
        self.register_scalar::<T>(serializer);
        Ok(())
    }

    /// Registers a `Surrogate<T, S>`: `T` serializes as whatever `S`'s own
    /// registered serializer does. Rejects a surrogate chain that would
    /// cycle back to `T` (spec §7).
    pub fn set_surrogate<T, S>(&self, surrogate: Surrogate<T, S>) -> Result<(), Error>
    where
        T: Send + Sync + 'static,
        S: ProtoMessage + Send + Sync + 'static,
    {
        let t_id = TypeId::of::<T>();
        let s_id = TypeId::of::<S>();
        if t_id == s_id {
            return Err(Error::ConfigurationError(
                "a type cannot be its own surrogate".to_string(),
            ));
        }
        {
            let mut targets = self.0.surrogate_targets.write().unwrap();
            let mut cursor = s_id;
            while let Some(&next) = targets.get(&cursor) {
                if next == t_id {
                    return Err(Error::ConfigurationError(
                        "surrogate registration would introduce a cycle".to_string(),
                    ));
                }
                cursor = next;
            }
            targets.insert(t_id, s_id);
        }
        let serializer = SurrogateSerializer::new(surrogate, self.clone());
        self.register_scalar::<T>(serializer);
        Ok(())
    }

    /// Registers `T` if `auto_add_missing_types` is set and it isn't
    /// registered yet. A no-op otherwise (including when it's already
    /// registered).
    ///
    /// This is the one registration path reachable from ordinary
    /// serialize/deserialize calls rather than from explicit, single-threaded
    /// setup code, so it's the one place concurrent first-use races are
    /// realistic: two threads can both call `serialize_message::<T>()` for a
    /// never-before-seen `T` at once. Double-checked locking (spec §4.7)
    /// handles it — a fast read-locked lookup, then a write-locked recheck
    /// that publishes `Entry::Constructing` before dropping the lock to
    /// build the real stub. A thread that observes `Constructing` here is
    /// witnessing a cyclic auto-registration (`T`'s own descriptor
    /// construction recursing back into registering `T`), not a benign race,
    /// since the lock is released before any building happens — so it's
    /// reported as a configuration error rather than spun on.
    fn ensure_message_registered<T: ProtoMessage + Send + Sync + 'static>(
        &self,
    ) -> Result<(), Error> {
        let id = TypeId::of::<T>();
        if self.lookup(id).is_some() {
            return Ok(());
        }
        if !self.0.options.auto_add_missing_types {
            return Ok(());
        }

        {
            let mut stubs = self.0.stubs.write().unwrap();
            match stubs.get(&id) {
                Some(Entry::Ready(_)) => return Ok(()),
                Some(Entry::Constructing) => {
                    return Err(Error::ConfigurationError(
                        "type is already being registered (cyclic auto-registration?)"
                            .to_string(),
                    ));
                }
                None => {
                    stubs.insert(id, Entry::Constructing);
                }
            }
        }

        let result = self.register_message::<T>();
        if result.is_err() {
            // Don't leave a dead `Constructing` placeholder behind if
            // building the descriptor failed — a later call should get to
            // retry from scratch rather than permanently read this type as
            // "already being registered".
            let mut stubs = self.0.stubs.write().unwrap();
            if matches!(stubs.get(&id), Some(Entry::Constructing)) {
                stubs.remove(&id);
            }
        }
        result
    }

    /// Writes `value` using whatever `Serializer<F>` is registered for `F`.
    /// Looked up by `TypeId` at call time, not bound at field-registration
    /// time — this is what lets a cyclic message graph's field reference a
    /// type that isn't registered yet (spec §4.5's supplement).
    pub fn serialize_into<F: 'static>(
        &self,
        writer: &mut WriterState,
        value: &F,
    ) -> Result<(), Error> {
        let stub = self.lookup(TypeId::of::<F>()).ok_or(Error::UnknownType)?;
        stub.write_any(writer, value)
    }

    pub fn deserialize_into<F: 'static>(
        &self,
        reader: &mut ReaderState,
        existing: Option<F>,
    ) -> Result<F, Error> {
        let stub = self.lookup(TypeId::of::<F>()).ok_or(Error::UnknownType)?;
        let existing: Option<Box<dyn Any>> = existing.map(|v| Box::new(v) as Box<dyn Any>);
        let boxed = stub.read_any(reader, existing)?;
        boxed
            .downcast::<F>()
            .map(|b| *b)
            .map_err(|_| Error::ConfigurationError("dispatch stub type mismatch".to_string()))
    }

    /// Like `serialize_into`, but auto-registers `F` first when the model
    /// allows it — the entry point `FieldDescriptor::message` and
    /// `repeated_message` use for nested types.
    pub fn serialize_message<F: ProtoMessage + Send + Sync + 'static>(
        &self,
        writer: &mut WriterState,
        value: &F,
    ) -> Result<(), Error> {
        self.ensure_message_registered::<F>()?;
        self.serialize_into(writer, value)
    }

    pub fn deserialize_message<F: ProtoMessage + Send + Sync + 'static>(
        &self,
        reader: &mut ReaderState,
        existing: Option<F>,
    ) -> Result<F, Error> {
        self.ensure_message_registered::<F>()?;
        self.deserialize_into(reader, existing)
    }

    /// Serializes `value` as a complete document: the bare field sequence,
    /// with no enclosing length-delimited wrapper (spec §6).
    pub fn serialize<T: ProtoMessage + Send + Sync + 'static>(
        &self,
        out: &mut dyn Write,
        value: &T,
    ) -> Result<(), Error> {
        self.ensure_message_registered::<T>()?;
        let mut writer = WriterState::new(out);
        self.serialize_into(&mut writer, value)?;
        writer.close()
    }

    pub fn deserialize<T: ProtoMessage + Send + Sync + 'static>(
        &self,
        input: &[u8],
        existing: Option<T>,
    ) -> Result<T, Error> {
        self.ensure_message_registered::<T>()?;
        let mut reader =
            ReaderState::with_options(input, self.0.options.depth_limit, self.0.options.intern_strings);
        self.deserialize_into(&mut reader, existing)
    }

    /// Round-trips `value` through the wire format to produce an
    /// independent deep copy (spec §4.6). Whether `allow_packed_at_root`
    /// applies here too: yes — `deep_clone` reuses the same root-level
    /// `serialize`/`deserialize` path, so a packed-at-root list clones the
    /// same way it would round-trip through bytes explicitly (see
    /// DESIGN.md, Open Question 2).
    pub fn deep_clone<T: ProtoMessage + Send + Sync + 'static>(&self, value: &T) -> Result<T, Error> {
        let mut buf = Vec::new();
        self.serialize(&mut buf, value)?;
        self.deserialize(&buf, None)
    }

    pub fn can_serialize<T: 'static>(&self) -> bool {
        self.lookup(TypeId::of::<T>()).is_some()
    }

    /// Documented identity-optimization hook (spec §4.6). The registry is
    /// already safe to read concurrently with further inserts, so there is
    /// nothing this build needs to precompute; a future release may use
    /// this call to pre-resolve field dispatch chains.
    pub fn compile(&self) {}
}

impl Default for TypeModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Leaf {
        value: i32,
    }

    impl ProtoMessage for Leaf {
        fn descriptor() -> MessageDescriptor<Self> {
            MessageDescriptor::new(Leaf::default).field(FieldDescriptor::scalar::<
                i32,
                crate::ser::int_encoding::Standard,
            >(
                1,
                |v: &Leaf| &v.value,
                |v: &mut Leaf| &mut v.value,
            ))
        }
    }

    #[test]
    fn ensure_message_registered_is_idempotent() {
        let model = TypeModel::new();
        assert!(!model.can_serialize::<Leaf>());
        model.ensure_message_registered::<Leaf>().unwrap();
        assert!(model.can_serialize::<Leaf>());
        // A second call finds `Entry::Ready` on the fast-path lookup and is a
        // cheap no-op rather than re-registering.
        model.ensure_message_registered::<Leaf>().unwrap();
        assert!(model.can_serialize::<Leaf>());
    }

    #[test]
    fn constructing_placeholder_is_reported_as_a_configuration_error() {
        let model = TypeModel::new();
        {
            let mut stubs = model.0.stubs.write().unwrap();
            stubs.insert(TypeId::of::<Leaf>(), Entry::Constructing);
        }
        // Observing `Constructing` on the write-locked recheck means some
        // other in-progress build owns this slot; `ensure_message_registered`
        // must not silently build a second, competing stub for it.
        assert!(matches!(
            model.ensure_message_registered::<Leaf>(),
            Err(Error::ConfigurationError(_))
        ));
    }
}
