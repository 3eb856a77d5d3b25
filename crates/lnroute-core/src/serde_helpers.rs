//! Serde helpers for LND's JSON encoding.
//!
//! LND's REST gateway renders `uint64`/`int64` proto fields as decimal
//! strings, while our own API emits plain numbers. Deserializers here accept
//! both forms.

use serde::de::{self, Deserializer, Visitor};
use std::fmt;

struct U64Visitor;

impl<'de> Visitor<'de> for U64Visitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an unsigned integer or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
        u64::try_from(v).map_err(|_| E::custom(format!("negative value {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
        v.trim()
            .parse::<u64>()
            .map_err(|_| E::custom(format!("not an unsigned integer: {:?}", v)))
    }
}

/// Deserialize a `u64` given either as a JSON number or a decimal string.
pub fn u64_from_str_or_num<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(U64Visitor)
}

/// Like [`u64_from_str_or_num`], for fields that fit a `u32`.
pub fn u32_from_str_or_num<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let v = deserializer.deserialize_any(U64Visitor)?;
    u32::try_from(v).map_err(|_| de::Error::custom(format!("value {} exceeds u32", v)))
}
