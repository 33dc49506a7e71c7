//! Serde adapter for maps keyed by a question position.
//!
//! BSON documents only allow string keys, so positions are written as their
//! decimal text and parsed back on read.

use std::collections::BTreeMap;

use serde::{de::Error as _, ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<S, V>(map: &BTreeMap<usize, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    let mut out = serializer.serialize_map(Some(map.len()))?;
    for (position, value) in map {
        out.serialize_entry(&position.to_string(), value)?;
    }
    out.end()
}

pub fn deserialize<'de, D, V>(deserializer: D) -> Result<BTreeMap<usize, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    let raw = BTreeMap::<String, V>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, value)| {
            key.parse::<usize>()
                .map(|position| (position, value))
                .map_err(|_| D::Error::custom(format!("invalid question position '{}'", key)))
        })
        .collect()
}
