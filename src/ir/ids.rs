//! Newtype IDs for the three record families.
//!
//! COCO uses plain integers for every id, which makes it easy to look up an
//! image with a category id by accident. The newtypes keep the families apart.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            #[inline]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value.
            #[inline]
            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Identifies an image record.
    ImageId
);
record_id!(
    /// Identifies a single annotation (one object instance).
    AnnotationId
);
record_id!(
    /// Identifies a category. Category ids also order co-occurrence edges.
    CategoryId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_ordering_follows_raw_value() {
        assert!(CategoryId(3) < CategoryId(10));
        assert!(ImageId(1) < ImageId(2));
    }

    #[test]
    fn test_id_debug_names_the_family() {
        assert_eq!(format!("{:?}", ImageId(7)), "ImageId(7)");
        assert_eq!(format!("{}", AnnotationId(42)), "42");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&CategoryId(5)).unwrap();
        assert_eq!(json, "5");
    }
}
