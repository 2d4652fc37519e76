// Typed decoding helpers for console config JSON
//
// The appliance stores its configuration as XML and `json_encode` turns it
// into loosely-typed JSON: every scalar is a string, repeated elements are a
// string when there is one and an array when there are several, booleans
// are "element present", and empty containers come back as "" or null.
// These serde helpers normalize that at the schema layer so resource
// modules can declare plain Rust types.

use std::time::Duration;

use serde::de::{DeserializeOwned, Deserializer, IgnoredAny};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::Error;

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(u64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<String>),
    One(String),
}

/// Decode the list at a config path into records.
///
/// `null` (path absent) and `""` (empty element) decode as no records.
pub fn records<T: DeserializeOwned>(raw: Value) -> Result<Vec<T>, Error> {
    match raw {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.is_empty() => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value(item)
                    .map_err(|e| Error::parse(format!("record {i} has unexpected shape: {e}")))
            })
            .collect(),
        other => Err(Error::parse(format!(
            "expected a list of records, got {}",
            kind_of(&other)
        ))),
    }
}

/// `true` whenever the key is present, whatever its value.
///
/// Use with `#[serde(default, deserialize_with = "decode::presence")]`.
pub fn presence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    IgnoredAny::deserialize(deserializer)?;
    Ok(true)
}

/// Bare integer seconds, as a number or a string. Empty means unset.
pub fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Scalar::Number(secs)) => Ok(Some(Duration::from_secs(secs))),
        Some(Scalar::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Scalar::Text(text)) => text
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| serde::de::Error::custom(format!("invalid seconds value '{text}'"))),
    }
}

/// A list given as a `,`/`;`/whitespace-joined string or as an array.
pub fn list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::Many(items)) => items.into_iter().flat_map(|s| split_list(&s)).collect(),
        Some(OneOrMany::One(joined)) => split_list(&joined),
    })
}

/// A `||`-joined list. Items may themselves contain spaces or commas.
pub fn pipe_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|joined| {
            joined
                .split("||")
                .map(str::trim)
                .map(str::to_owned)
                .collect::<Vec<_>>()
        })
        .filter(|items| !(items.len() == 1 && items[0].is_empty()))
        .unwrap_or_default())
}

/// Free text where an absent or `null` element reads as empty.
pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Optional text where the empty string means unset.
pub fn non_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty()))
}

/// Nested repeated elements: `{"item": [...]}`, `{"item": {...}}`, `""` or `null`.
pub fn items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Value::deserialize(deserializer)?;
    let inner = match raw {
        Value::Object(mut map) => map.remove("item").unwrap_or(Value::Null),
        other => other,
    };
    let inner = match inner {
        Value::Object(_) => Value::Array(vec![inner]),
        other => other,
    };
    records(inner).map_err(serde::de::Error::custom)
}

fn split_list(joined: &str) -> Vec<String> {
    joined
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Serde adapter for `Option<Duration>` as human-readable text (`"1h 30m"`).
///
/// Used on the public resource types so JSON/YAML written by people reads
/// naturally; the console's own integer seconds are handled by [`seconds`].
pub mod humantime_opt {
    use super::{Deserialize, Deserializer, Duration, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        value
            .map(|d| humantime::format_duration(d).to_string())
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| humantime::parse_duration(&text).map_err(serde::de::Error::custom))
            .transpose()
    }
}
