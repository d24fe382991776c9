//! Integer identifiers for persisted aggregates.
//!
//! Every table in the farm schema uses a `SERIAL` primary key, so ids are
//! positive `i32` values. Wrapping them keeps a `ZoneId` from being passed
//! where a `FieldId` is expected.

use serde::{Deserialize, Serialize};

/// Error returned when an identifier is zero or negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("identifier must be a positive integer, got {0}")]
pub struct InvalidId(pub i32);

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "i32", into = "i32")]
        pub struct $name(i32);

        impl $name {
            /// Validate and wrap a raw identifier.
            pub fn new(raw: i32) -> Result<Self, InvalidId> {
                if raw > 0 { Ok(Self(raw)) } else { Err(InvalidId(raw)) }
            }

            /// Raw database value.
            #[must_use]
            pub const fn get(self) -> i32 {
                self.0
            }
        }

        impl TryFrom<i32> for $name {
            type Error = InvalidId;

            fn try_from(value: i32) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a registered account.
    UserId
);
define_id!(
    /// Identifier of a field.
    FieldId
);
define_id!(
    /// Identifier of a zone inside a field.
    ZoneId
);
define_id!(
    /// Identifier of a tree mark.
    MarkId
);
define_id!(
    /// Identifier of an inspection round.
    InspectionId
);
define_id!(
    /// Identifier of an uploaded inspection image.
    ImageId
);
define_id!(
    /// Identifier of a fertilizer recommendation.
    RecommendationId
);
define_id!(
    /// Identifier of a fertilizer reference row.
    FertilizerId
);
