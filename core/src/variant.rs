//! Shared machinery for polymorphic payload families.
//!
//! # Design
//! A family is a closed enum of known shapes plus an `Unknown(RawFields)`
//! case. Its `resolve` is a pure function from the raw JSON object to a
//! variant; serde impls for every family are generated by
//! `impl_variant_serde!` and only ever call `resolve` / `to_fields`.
//!
//! Decoding never fails past the family boundary. A value that matches a
//! known tag or structure but does not decode as that shape, or that is not a
//! JSON object at all, becomes `Unknown` and a warning goes to the active
//! codec sink. Syntax errors are not absorbed here; they belong to the
//! surrounding document.

use serde::de::DeserializeOwned;
use serde::ser::Error as _;
use serde::Serialize;
use serde_json::{Map, Value};

pub(crate) use crate::codec::report;

/// The raw field set of a JSON object.
pub type RawFields = Map<String, Value>;

/// A closed set of known JSON shapes plus an unknown fallback.
pub trait VariantFamily: Sized {
    /// Family name used in log output.
    const FAMILY: &'static str;

    /// Pick a variant for a JSON object. Must not fail.
    fn resolve(fields: RawFields) -> Self;

    /// The fallback variant.
    fn unknown(fields: RawFields) -> Self;

    /// Encode the variant back into its wire object.
    fn to_fields(&self) -> Result<RawFields, serde_json::Error>;

    /// Handle a family value that is not a JSON object.
    fn from_non_object(value: Value) -> Self {
        report(&format!("{}: expected a JSON object, got {value}", Self::FAMILY));
        Self::unknown(RawFields::new())
    }
}

/// True when every key in `keys` is present.
pub(crate) fn has_all(fields: &RawFields, keys: &[&str]) -> bool {
    keys.iter().all(|key| fields.contains_key(*key))
}

/// Decode `fields` as the known shape `K`; on failure log and return `None`.
pub(crate) fn decode_known<K: DeserializeOwned>(
    family: &'static str,
    variant: &'static str,
    fields: &RawFields,
) -> Option<K> {
    match serde_json::from_value(Value::Object(fields.clone())) {
        Ok(known) => Some(known),
        Err(e) => {
            report(&format!("{family}: {variant} did not decode ({e}), keeping it as unknown"));
            None
        }
    }
}

/// Serialize a known shape into an object, inserting `tag` when given.
pub(crate) fn known_fields<K: Serialize>(
    known: &K,
    tag: Option<(&str, &str)>,
) -> Result<RawFields, serde_json::Error> {
    match serde_json::to_value(known)? {
        Value::Object(mut fields) => {
            if let Some((key, name)) = tag {
                fields.insert(key.to_string(), Value::String(name.to_string()));
            }
            Ok(fields)
        }
        other => Err(serde_json::Error::custom(format!(
            "variant encoded to {other} instead of an object"
        ))),
    }
}

/// Implements `Serialize` and `Deserialize` for a [`VariantFamily`].
macro_rules! impl_variant_serde {
    ($family:ty) => {
        impl ::serde::Serialize for $family {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                use ::serde::ser::Error as _;
                let fields = $crate::variant::VariantFamily::to_fields(self).map_err(S::Error::custom)?;
                ::serde::Serialize::serialize(&fields, serializer)
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $family {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                match <::serde_json::Value as ::serde::Deserialize>::deserialize(deserializer)? {
                    ::serde_json::Value::Object(fields) => {
                        Ok(<$family as $crate::variant::VariantFamily>::resolve(fields))
                    }
                    other => Ok(<$family as $crate::variant::VariantFamily>::from_non_object(other)),
                }
            }
        }
    };
}

pub(crate) use impl_variant_serde;
