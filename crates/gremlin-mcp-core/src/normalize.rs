//! Result normalization
//!
//! Drivers hand back GraphSON typed wrappers (`{"@type": ..., "@value": ...}`),
//! maps encoded as alternating key/value lists, or maps encoded as lists of
//! `[key, value]` pairs. Everything is mapped to plain JSON here, before any
//! engine code looks at it.

use serde_json::{Map, Value};

/// Copies of one `g:BulkSet` member kept when expanding. The bulk count comes
/// from the server and is otherwise unbounded.
pub const MAX_BULK_EXPANSION: u64 = 1000;

/// Strip driver-specific encodings from a result value.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            let typed = map.len() == 2
                && matches!(map.get("@type"), Some(Value::String(_)))
                && map.contains_key("@value");
            if typed {
                let type_name = match map.remove("@type") {
                    Some(Value::String(name)) => name,
                    _ => String::new(),
                };
                let inner = map.remove("@value").unwrap_or(Value::Null);
                return normalize_typed(&type_name, inner);
            }
            Value::Object(map.into_iter().map(|(k, v)| (k, normalize(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        other => other,
    }
}

/// Normalize a whole result list, flattening a top-level GraphSON list wrapper.
pub fn normalize_results(data: Value) -> Vec<Value> {
    match normalize(data) {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn normalize_typed(type_name: &str, inner: Value) -> Value {
    match type_name {
        "g:List" | "g:Set" => normalize(inner),
        "g:BulkSet" => expand_bulk_set(inner),
        "g:Map" => alternating_to_object(inner),
        "g:Vertex" => normalize_element(inner),
        "g:Edge" => normalize_element(inner),
        "g:VertexProperty" | "g:Property" => match inner {
            Value::Object(mut map) => normalize(map.remove("value").unwrap_or(Value::Null)),
            other => normalize(other),
        },
        "g:Traverser" => match inner {
            Value::Object(mut map) => normalize(map.remove("value").unwrap_or(Value::Null)),
            other => normalize(other),
        },
        _ => normalize(inner),
    }
}

fn expand_bulk_set(inner: Value) -> Value {
    let Value::Array(items) = inner else {
        return normalize(inner);
    };
    let mut out = Vec::new();
    let mut iter = items.into_iter();
    while let Some(value) = iter.next() {
        let bulk = iter
            .next()
            .map(normalize)
            .and_then(|b| as_count(&b))
            .unwrap_or(1)
            .min(MAX_BULK_EXPANSION);
        let value = normalize(value);
        for _ in 0..bulk {
            out.push(value.clone());
        }
    }
    Value::Array(out)
}

fn alternating_to_object(inner: Value) -> Value {
    let Value::Array(items) = inner else {
        return normalize(inner);
    };
    let mut map = Map::new();
    let mut iter = items.into_iter();
    while let Some(key) = iter.next() {
        let value = iter.next().map(normalize).unwrap_or(Value::Null);
        map.insert(key_string(normalize(key)), value);
    }
    Value::Object(map)
}

/// Vertices and edges keep their shape; property lists collapse to values.
fn normalize_element(inner: Value) -> Value {
    let Value::Object(map) = normalize(inner) else {
        return Value::Null;
    };
    let mut out = Map::new();
    for (key, value) in map {
        if key == "properties" {
            out.insert(key, collapse_properties(value));
        } else {
            out.insert(key, value);
        }
    }
    Value::Object(out)
}

fn collapse_properties(value: Value) -> Value {
    let Value::Object(props) = value else {
        return value;
    };
    props
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::Array(mut items) if items.len() == 1 => items.remove(0),
                other => other,
            };
            (k, v)
        })
        .collect::<Map<String, Value>>()
        .into()
}

fn key_string(key: Value) -> String {
    match key {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// View a normalized value as a key/value map.
///
/// Accepts plain objects and lists of `[key, value]` pairs.
pub fn as_object(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::Array(entries) => {
            let mut map = Map::new();
            for entry in entries {
                match entry {
                    Value::Array(pair) if pair.len() == 2 => {
                        map.insert(key_string(pair[0].clone()), pair[1].clone());
                    }
                    _ => return None,
                }
            }
            Some(map)
        }
        _ => None,
    }
}

/// Non-empty string content of a normalized value.
pub fn as_string(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}

/// Non-negative integer content of a normalized value.
pub fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        _ => None,
    }
}

/// Native type name of a normalized value.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
