//! Macro for defining typed integer ID types.

/// Macro to define a typed ID wrapping an `i32`.
///
/// This generates a newtype with:
/// - `new()` and `value()` accessors
/// - `Display` printing the bare integer
/// - `From<i32>` in both directions
/// - `Serialize` and `Deserialize` as a bare integer
/// - `Ord`, `Hash`, and other standard traits
///
/// # Example
///
/// ```ignore
/// define_id!(TaskId);
///
/// let id = TaskId::new(7);
/// assert_eq!(id.value(), 7);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        /// A typed ID for this resource type.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(i32);

        impl $name {
            /// Creates an ID from a raw integer.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Returns the underlying integer value.
            #[must_use]
            pub const fn value(&self) -> i32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_i32(self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let id = i32::deserialize(deserializer)?;
                Ok(Self(id))
            }
        }
    };
}
