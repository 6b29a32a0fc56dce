//! Deep cloning via round trip: serialize a value then deserialize it back
//! into a fresh instance, rather than requiring every registered type to
//! also implement Rust's `Clone`. See spec §4.6.

use crate::error::Error;
use crate::model::{ProtoMessage, TypeModel};

/// Extension trait over `ProtoMessage` types giving them a `deep_clone`
/// call site without threading a `TypeModel` through by hand everywhere.
/// Equivalent to calling `TypeModel::deep_clone` directly.
pub trait DeepClone: ProtoMessage + Send + Sync + Sized + 'static {
    fn deep_clone(&self, model: &TypeModel) -> Result<Self, Error> {
        model.deep_clone(self)
    }
}

impl<T: ProtoMessage + Send + Sync + 'static> DeepClone for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::{FieldDescriptor, MessageDescriptor};

    #[derive(Clone, Debug, PartialEq, Default)]
    struct Point {
        x: i32,
        y: i32,
    }

    impl ProtoMessage for Point {
        fn descriptor() -> MessageDescriptor<Self> {
            MessageDescriptor::new(Point::default)
                .field(FieldDescriptor::scalar::<i32, crate::ser::int_encoding::Standard>(
                    1,
                    |v| &v.x,
                    |v| &mut v.x,
                ))
                .field(FieldDescriptor::scalar::<i32, crate::ser::int_encoding::Standard>(
                    2,
                    |v| &v.y,
                    |v| &mut v.y,
                ))
        }
    }

    #[test]
    fn deep_clone_round_trips_through_the_wire() {
        let model = TypeModel::new();
        let original = Point { x: 3, y: -7 };
        let cloned = original.deep_clone(&model).unwrap();
        assert_eq!(original, cloned);
    }
}
