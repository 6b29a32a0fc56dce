//! A runtime-schema-driven Protocol Buffers serialization engine: hosts
//! describe their types to a [`TypeModel`] once, and the model handles wire
//! encoding/decoding, nested-message dispatch, surrogates, and tagged
//! sub-type polymorphism without any `.proto`-generated code.
//!
//! The crate is organized bottom-up:
//!
//! - [`wire`] — varint/ZigZag/tag primitives.
//! - [`reader`] / [`writer`] — cursor and staging-buffer state machines over
//!   a byte stream, with sub-item bracketing for length-delimited regions.
//! - [`serializer`] / [`dispatch`] — the `Serializer<T>` trait and the
//!   type-erased stub that lets a [`TypeModel`] hold serializers for many
//!   unrelated `T`s in one registry.
//! - [`ser`] — built-in codecs for scalars, dictionaries, and immutable
//!   collections.
//! - [`model`] — message descriptors, enums, surrogates, tagged sub-types,
//!   and the [`TypeModel`] registry itself.
//! - [`clone`] — deep cloning via a round trip through the wire format.

pub mod clone;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod intern;
pub mod model;
pub mod reader;
pub mod ser;
pub mod serializer;
pub mod wire;
pub mod writer;

pub use clone::DeepClone;
pub use context::{BytesAllocator, Context};
pub use error::{Error, Result};
pub use model::{
    EnumDescriptor, EnumMode, FieldDescriptor, FieldKind, MessageDescriptor, ModelOptions,
    ModelOptionsBuilder, ProtoMessage, SubType, SubTypeLink, Surrogate, SurrogateHooks, TypeModel,
};
pub use reader::ReaderState;
pub use serializer::{Category, Features, Serializer};
pub use wire::{Tag, WireType};
pub use writer::WriterState;

use std::sync::OnceLock;

/// A process-wide [`TypeModel`] for hosts that are happy sharing one
/// registry across the whole program, the common case for a single
/// self-contained schema. Anything needing isolated registries (tests,
/// multiple independent schemas in one process) should build its own
/// `TypeModel::new()` instead.
pub fn default_model() -> &'static TypeModel {
    static MODEL: OnceLock<TypeModel> = OnceLock::new();
    MODEL.get_or_init(TypeModel::new)
}
