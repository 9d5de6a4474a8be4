//! Newtype identifiers for type-safe entity references.
//!
//! Two flavours exist:
//!
//! - [`define_id!`] wraps a database-assigned `i32` (production groups).
//! - [`define_key!`] wraps an externally supplied string key (tenants, catalog
//!   items, orders, sales people). Keys are trimmed on construction and must not
//!   be empty.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Error returned when a string key is empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} must not be empty")]
pub struct EmptyKeyError {
    /// Name of the key type that was rejected.
    pub kind: &'static str,
}

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_i32()`
/// - `From<i32>` and `Into<i32>` implementations
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use prodplan_core::define_id;
/// define_id!(LineId);
/// define_id!(ShiftId);
///
/// let line_id = LineId::new(1);
/// let shift_id = ShiftId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: LineId = shift_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
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

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

/// Macro to define a type-safe string key wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` (transparent) and a validating `Deserialize` that trims and
///   rejects empty input
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - `parse()` (validating), `as_str()`, `Display`, `FromStr`
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use prodplan_core::define_key;
/// define_key!(LineCode);
///
/// let code = LineCode::parse("  L1 ").unwrap();
/// assert_eq!(code.as_str(), "L1");
/// assert!(LineCode::parse("   ").is_err());
/// ```
#[macro_export]
macro_rules! define_key {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ::serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a key from a string, trimming surrounding whitespace.
            ///
            /// # Errors
            ///
            /// Returns `EmptyKeyError` if nothing remains after trimming.
            pub fn parse(value: impl AsRef<str>) -> Result<Self, $crate::EmptyKeyError> {
                let trimmed = value.as_ref().trim();
                if trimmed.is_empty() {
                    return Err($crate::EmptyKeyError {
                        kind: stringify!($name),
                    });
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Get the key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::EmptyKeyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                $crate::types::id::deserialize_key(deserializer, |raw| Self::parse(raw))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let key = <String as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(key))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

/// Shared deserialisation path for [`define_key!`] types.
#[doc(hidden)]
pub fn deserialize_key<'de, D, T>(
    deserializer: D,
    parse: impl FnOnce(String) -> Result<T, EmptyKeyError>,
) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(raw).map_err(serde::de::Error::custom)
}

define_key!(TenantId);
define_key!(ItemId);
define_key!(OrderId);
define_key!(SalesPersonId);
define_key!(UserId);

define_id!(ProductionGroupId);

/// Products and production items share one catalog namespace.
///
/// Daily summaries are keyed by product, batches and groups by item; both refer
/// to the same catalog entry.
pub type ProductId = ItemId;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_key_trims_whitespace() {
        let tenant = TenantId::parse("  T1 ").unwrap();
        assert_eq!(tenant.as_str(), "T1");
        assert_eq!(tenant.to_string(), "T1");
    }

    #[test]
    fn test_key_rejects_blank() {
        let err = ItemId::parse("   ").unwrap_err();
        assert_eq!(err.kind, "ItemId");
        assert_eq!(err.to_string(), "ItemId must not be empty");
    }

    #[test]
    fn test_key_deserialize_validates() {
        let item: ItemId = serde_json::from_str("\" I1 \"").unwrap();
        assert_eq!(item.as_str(), "I1");
        assert!(serde_json::from_str::<ItemId>("\"\"").is_err());
    }

    #[test]
    fn test_group_id_roundtrip() {
        let id = ProductionGroupId::new(7);
        assert_eq!(id.as_i32(), 7);
        assert_eq!(i32::from(id), 7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
    }
}
