use serde_json::Value;

use super::reference::{lookup, ref_of, RefChain};
use crate::error::Result;
use crate::model::{Exclusivity, Property, Schema, SchemaType};

/// Resolve a raw schema object into a normalized `Schema`, expanding every
/// `$ref` transitively.
pub fn resolve_schema(root: &Value, raw: &Value, chain: &mut RefChain) -> Result<Schema> {
    if let Some(reference) = ref_of(raw) {
        chain.enter(reference)?;
        let resolved = lookup(root, reference).and_then(|target| resolve_schema(root, target, chain));
        chain.leave();
        return resolved;
    }

    if !raw.is_object() {
        return Ok(Schema::default());
    }

    let schema_type = declared_type(raw);
    let mut schema = Schema {
        schema_type,
        format: str_field(raw, "format"),
        description: str_field(raw, "description"),
        required: string_list(raw.get("required")),
        ..Default::default()
    };

    match schema_type {
        SchemaType::String => {
            schema.min_length = raw.get("minLength").and_then(Value::as_u64);
            schema.max_length = raw.get("maxLength").and_then(Value::as_u64);
            schema.pattern = str_field(raw, "pattern");
            schema.enum_values = enum_values(raw);
        }
        SchemaType::Integer | SchemaType::Number => {
            schema.minimum = raw.get("minimum").and_then(Value::as_f64);
            schema.maximum = raw.get("maximum").and_then(Value::as_f64);
            schema.exclusive_minimum = exclusivity(raw.get("exclusiveMinimum"));
            schema.exclusive_maximum = exclusivity(raw.get("exclusiveMaximum"));
            schema.enum_values = enum_values(raw);
        }
        SchemaType::Array => {
            if let Some(items) = raw.get("items") {
                schema.items = Some(Box::new(resolve_schema(root, items, chain)?));
            }
            schema.min_items = raw.get("minItems").and_then(Value::as_u64);
            schema.max_items = raw.get("maxItems").and_then(Value::as_u64);
        }
        SchemaType::Object => {
            if let Some(props) = raw.get("properties").and_then(Value::as_object) {
                for (name, prop) in props {
                    schema.properties.push(Property {
                        name: name.clone(),
                        schema: resolve_schema(root, prop, chain)?,
                    });
                }
            }
        }
        SchemaType::Boolean | SchemaType::Unknown => {}
    }

    Ok(schema)
}

/// `type` may be a string, a 3.1-style list (`["string", "null"]`), or
/// missing on an object that only declares `properties`.
fn declared_type(raw: &Value) -> SchemaType {
    match raw.get("type") {
        Some(Value::String(t)) => SchemaType::from_str_lenient(t),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .map(SchemaType::from_str_lenient)
            .unwrap_or_default(),
        _ if raw.get("properties").is_some() => SchemaType::Object,
        _ => SchemaType::Unknown,
    }
}

fn str_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn enum_values(raw: &Value) -> Vec<Value> {
    raw.get("enum")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn exclusivity(value: Option<&Value>) -> Option<Exclusivity> {
    match value? {
        Value::Bool(b) => Some(Exclusivity::Flag(*b)),
        v => v.as_f64().map(Exclusivity::Value),
    }
}
