//! Raw declared values
//!
//! A [`Value`] is whatever a document declares under a domain: nested maps,
//! lists and scalars. It deserializes from any self-describing format so the
//! same document can be written in YAML, TOML or JSON.

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;

use crate::types::ValueFormat;

/// A declared value
///
/// Equality is structural. Map equality ignores key order.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Render for template substitution
    pub fn render(&self, format: ValueFormat) -> String {
        match format {
            ValueFormat::Plain => self.render_plain(),
            ValueFormat::Gvariant => self.render_gvariant(),
        }
    }

    fn render_plain(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s.clone(),
            Self::List(_) | Self::Map(_) => self.to_json(),
        }
    }

    fn render_gvariant(&self) -> String {
        match self {
            Self::Null => "<@mb nothing>".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => gvariant_string(s),
            Self::List(items) => {
                let items: Vec<String> = items.iter().map(Self::render_gvariant).collect();
                format!("[{}]", items.join(", "))
            }
            Self::Map(map) => {
                let pairs: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{}: {}", gvariant_string(k), v.render_gvariant()))
                    .collect();
                format!("{{ {} }}", pairs.join(", "))
            }
        }
    }

    /// Canonical text for hashing: equal values give equal text
    ///
    /// Map keys are sorted, so declaration order does not matter.
    pub(crate) fn identity(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format!("{f:?}"),
            Self::String(s) => format!("{s:?}"),
            Self::List(items) => {
                let items: Vec<String> = items.iter().map(Self::identity).collect();
                format!("[{}]", items.join(","))
            }
            Self::Map(map) => {
                let mut pairs: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{k:?}:{}", v.identity()))
                    .collect();
                pairs.sort();
                format!("{{{}}}", pairs.join(","))
            }
        }
    }

    fn to_json(&self) -> String {
        // Serializing a tree of plain data into a String cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_plain())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Serde
// ============================================================================

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar, list or map")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        i64::try_from(v)
            .map(Value::Int)
            .map_err(|_| E::custom(format!("integer {v} is out of range")))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(key) = access.next_key::<MapKey>()? {
            let value = access.next_value()?;
            if map.insert(key.0.clone(), value).is_some() {
                return Err(de::Error::custom(format!("duplicate key '{}'", key.0)));
            }
        }
        Ok(Value::Map(map))
    }
}

/// Double-quoted GVariant string literal
///
/// Single quotes become `\u0027` so the literal can sit inside a
/// single-quoted shell word.
fn gvariant_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\u0027"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Map key accepting strings as well as scalar keys (`8080:` in YAML)
pub(crate) struct MapKey(pub(crate) String);

impl<'de> Deserialize<'de> for MapKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MapKeyVisitor)
    }
}

struct MapKeyVisitor;

impl Visitor<'_> for MapKeyVisitor {
    type Value = MapKey;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or scalar key")
    }

    fn visit_bool<E>(self, v: bool) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_i64<E>(self, v: i64) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_u64<E>(self, v: u64) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_f64<E>(self, v: f64) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_str<E>(self, v: &str) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<MapKey, E> {
        Ok(MapKey(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml_ng::from_str(s).unwrap()
    }

    #[test]
    fn test_deserialize_nested() {
        let value = yaml("root:\n  /dir: [file1, 2, true, ~]\n");
        let Value::Map(root) = value else {
            panic!("expected map");
        };
        let Value::Map(inner) = &root["root"] else {
            panic!("expected inner map");
        };
        assert_eq!(
            inner["/dir"],
            Value::List(vec![
                Value::from("file1"),
                Value::Int(2),
                Value::Bool(true),
                Value::Null,
            ])
        );
    }

    #[test]
    fn test_scalar_keys_are_stringified() {
        let value = yaml("8080: web\ntrue: yes-please\n");
        let Value::Map(map) = value else {
            panic!("expected map");
        };
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["8080", "true"]);
    }

    #[test]
    fn test_map_equality_ignores_order() {
        assert_eq!(yaml("a: 1\nb: 2\n"), yaml("b: 2\na: 1\n"));
        assert_ne!(yaml("[1, 2]"), yaml("[2, 1]"));
    }

    #[test]
    fn test_identity_follows_equality() {
        assert_eq!(yaml("a: 1\nb: [x]\n").identity(), yaml("b: [x]\na: 1\n").identity());
        assert_ne!(Value::Int(1).identity(), Value::Float(1.0).identity());
        assert_ne!(Value::from("1").identity(), Value::Int(1).identity());
        assert_ne!(yaml("[1, 2]").identity(), yaml("[2, 1]").identity());
    }

    #[test]
    fn test_render_plain() {
        assert_eq!(Value::from("git").render(ValueFormat::Plain), "git");
        assert_eq!(Value::Null.render(ValueFormat::Plain), "");
        assert_eq!(Value::Float(1.5).render(ValueFormat::Plain), "1.5");
        assert_eq!(
            yaml("[a, 1]").render(ValueFormat::Plain),
            "[\"a\",1]"
        );
        assert_eq!(
            yaml("k: v").render(ValueFormat::Plain),
            "{\"k\":\"v\"}"
        );
    }

    #[test]
    fn test_render_gvariant() {
        assert_eq!(Value::from("dark").render(ValueFormat::Gvariant), "\"dark\"");
        assert_eq!(Value::Bool(false).render(ValueFormat::Gvariant), "false");
        assert_eq!(
            yaml("[a, b]").render(ValueFormat::Gvariant),
            "[\"a\", \"b\"]"
        );
        assert_eq!(
            yaml("k: 1").render(ValueFormat::Gvariant),
            "{ \"k\": 1 }"
        );
        assert_eq!(Value::Null.render(ValueFormat::Gvariant), "<@mb nothing>");
    }

    #[test]
    fn test_render_gvariant_escapes_quotes() {
        assert_eq!(
            Value::from("it's").render(ValueFormat::Gvariant),
            "\"it\\u0027s\""
        );
        assert_eq!(
            Value::from(r#"say "hi" \o/"#).render(ValueFormat::Gvariant),
            r#""say \"hi\" \\o/""#
        );
        assert!(!yaml("\"it's\": [\"o'k\"]").render(ValueFormat::Gvariant).contains('\''));
    }

    #[test]
    fn test_serialize_round_shape() {
        let value = yaml("a: [1, x]\n");
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "{\"a\":[1,\"x\"]}");
    }
}
