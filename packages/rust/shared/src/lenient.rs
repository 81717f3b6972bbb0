//! Tolerant decoding for third-party payloads whose shape is not guaranteed.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// An object-shaped element that either decodes as `T` or is kept as raw JSON.
///
/// Only JSON objects are offered to `T`; strings, numbers, arrays, and objects
/// that `T` rejects all land in `Malformed`. Decoding a `Vec<Lenient<T>>`
/// therefore never fails because of a single odd element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Lenient<T> {
    Valid(T),
    Malformed(serde_json::Value),
}

impl<T> Lenient<T> {
    /// The decoded value, if this element had the expected shape.
    pub fn valid(&self) -> Option<&T> {
        match self {
            Self::Valid(v) => Some(v),
            Self::Malformed(_) => None,
        }
    }

    pub fn into_valid(self) -> Option<T> {
        match self {
            Self::Valid(v) => Some(v),
            Self::Malformed(_) => None,
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Lenient<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if !value.is_object() {
            return Ok(Self::Malformed(value));
        }
        match T::deserialize(&value) {
            Ok(v) => Ok(Self::Valid(v)),
            Err(_) => Ok(Self::Malformed(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Deserialize, Serialize)]
    struct Named {
        #[serde(default)]
        name: Option<String>,
    }

    #[test]
    fn odd_elements_do_not_fail_the_list() {
        let items: Vec<Lenient<Named>> = serde_json::from_str(
            r#"[{"name": "a"}, 42, "text", {"name": 7}, ["b"], {}, {"name": "c"}]"#,
        )
        .expect("decode");

        let names: Vec<Option<&str>> = items
            .iter()
            .filter_map(Lenient::valid)
            .map(|n| n.name.as_deref())
            .collect();
        assert_eq!(names, vec![Some("a"), None, Some("c")]);
        assert!(matches!(items[1], Lenient::Malformed(_)));
        // Arrays are never read positionally into a struct
        assert!(matches!(items[4], Lenient::Malformed(_)));
    }
}
