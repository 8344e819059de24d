//! JSON Schema helpers for schemars
//!
//! Tool input schemas are published to LLM clients, several of which choke on
//! `$ref` indirection and on the non-standard `format` values schemars emits
//! for unsigned integers. Schemas are therefore generated draft-07 style with
//! subschemas inlined, and the helpers below replace the integer formats.

use schemars::JsonSchema;
use serde_json::Value;

/// Generate an inlined draft-07 schema for `T` as a JSON value.
pub fn schema_for<T: JsonSchema>() -> Value {
    let settings = schemars::generate::SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
    });
    let generator = settings.into_generator();
    let schema = generator.into_root_schema_for::<T>();
    let mut value = serde_json::to_value(schema).unwrap_or_default();
    if let Value::Object(map) = &mut value {
        map.remove("$schema");
        map.remove("title");
    }
    value
}

/// Schema for `u32` fields: integer, non-negative, no format.
pub fn u32_schema(_gen: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": "integer",
        "minimum": 0
    })
}

/// Schema for `Option<u32>` fields.
pub fn optional_u32_schema(_gen: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": ["integer", "null"],
        "minimum": 0
    })
}
