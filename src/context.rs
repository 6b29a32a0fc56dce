//! The user-context bag carried by a `ReaderState`, per spec §4.2/§9:
//! "Express [pluggable byte allocation] as a capability passed via the
//! user-context on the reader state, queried by name." Rust has no runtime
//! name-based capability lookup, so this queries by `TypeId` instead — the
//! same "ask for a capability, get `None` if the caller didn't provide one"
//! shape, just keyed on a type rather than a string.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// A small type-indexed bag of caller-supplied capabilities. Absent unless
/// populated, in which case callers fall back to heap allocation (spec §9).
#[derive(Default)]
pub struct Context {
    values: HashMap<TypeId, Box<dyn Any>>,
}

/// The pluggable allocation capability spec §4.2/§9 describes for
/// `AppendBytes`: a host registers one of these in a `ReaderState`'s
/// `Context` to get a say in how the destination buffer grows (an
/// arena-backed `reserve`, a pool lookup) instead of always taking whatever
/// growth strategy `Vec::reserve` picks. Queried by type (`Arc<dyn
/// BytesAllocator>`) rather than by name, since Rust has no runtime
/// string-keyed capability lookup.
pub trait BytesAllocator: Send + Sync {
    /// Ensures `dest` has room for `additional` more bytes before the caller
    /// extends it.
    fn reserve(&self, dest: &mut Vec<u8>, additional: usize);
}

impl Context {
    /// Registers a `BytesAllocator` capability, queried by
    /// `ReaderState::append_bytes`.
    pub fn set_bytes_allocator(&mut self, allocator: Arc<dyn BytesAllocator>) {
        self.insert(allocator);
    }

    /// The `BytesAllocator` capability, if one was registered.
    pub fn bytes_allocator(&self) -> Option<&Arc<dyn BytesAllocator>> {
        self.get::<Arc<dyn BytesAllocator>>()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: 'static>(&mut self, value: T) {
        self.values.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.values.get(&TypeId::of::<T>())?.downcast_ref::<T>()
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.values
            .get_mut(&TypeId::of::<T>())?
            .downcast_mut::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_capability_is_none() {
        let ctx = Context::new();
        assert!(ctx.get::<u32>().is_none());
    }

    #[test]
    fn present_capability_roundtrips() {
        let mut ctx = Context::new();
        ctx.insert(42u32);
        assert_eq!(ctx.get::<u32>(), Some(&42));
        *ctx.get_mut::<u32>().unwrap() += 1;
        assert_eq!(ctx.get::<u32>(), Some(&43));
    }
}
