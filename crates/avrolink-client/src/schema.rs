//! Compiled Avro schemas
//!
//! A [`Schema`] pairs the exact JSON text a schema was written in with the
//! compiled `apache_avro` form used to encode and decode values. Identity is the
//! text: two schemas are equal when their text is byte-for-byte equal, which is
//! also the key the registry cache uses.
//!
//! Values move between three forms:
//!
//! ```text
//!   JSON text ──parse_json_value──▶ avro Value ──encode──▶ Avro binary
//!   JSON text ◀──to_json_text─── avro Value ◀──decode─── Avro binary
//! ```
//!
//! ## Textual Projection
//!
//! `to_json_text` accepts every value the schema can decode. JSON has no
//! spelling for non-finite numbers, so NaN and infinities render as the
//! strings `"NaN"`, `"Infinity"` and `"-Infinity"`. Decimals render as a
//! decimal string with the schema's scale applied (`"12.34"`).

use crate::error::{RegistryError, Result};
use apache_avro::schema::{Name, Schema as AvroSchema};
use apache_avro::types::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Immutable schema: exact JSON text plus its compiled codec.
///
/// Cloning is cheap; both halves are reference counted.
#[derive(Clone)]
pub struct Schema {
    text: Arc<str>,
    compiled: Arc<AvroSchema>,
}

impl Schema {
    /// Compile schema text.
    ///
    /// Fails with [`RegistryError::SchemaCompile`] when the text is not a valid
    /// Avro schema. The original text is kept verbatim.
    pub fn parse(text: &str) -> Result<Self> {
        let compiled = AvroSchema::parse_str(text)
            .map_err(|e| RegistryError::SchemaCompile(e.to_string()))?;

        Ok(Self {
            text: Arc::from(text),
            compiled: Arc::new(compiled),
        })
    }

    /// The schema's JSON text, exactly as supplied or as served by the registry.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The compiled Avro schema.
    pub fn avro(&self) -> &AvroSchema {
        &self.compiled
    }

    /// Encode a native value with Avro's binary encoding.
    ///
    /// The value is resolved against the schema first, so a `Value::Map` can
    /// stand in for a record and a `Value::Long` for an `int` field.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let resolved = self.resolve(value.clone())?;

        apache_avro::to_avro_datum(&self.compiled, resolved)
            .map_err(|e| RegistryError::Encode(e.to_string()))
    }

    /// Decode an Avro binary payload into its native form.
    pub fn decode(&self, payload: &[u8]) -> Result<Value> {
        let mut reader = payload;
        apache_avro::from_avro_datum(&self.compiled, &mut reader, None)
            .map_err(RegistryError::decode)
    }

    /// Convert a JSON textual value into the native form for this schema.
    pub fn parse_json_value(&self, json: &str) -> Result<Value> {
        let parsed: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| RegistryError::Encode(format!("value is not valid JSON: {}", e)))?;

        self.resolve(Value::from(parsed))
    }

    /// Project a native value of this schema to its JSON textual form.
    pub fn to_json_text(&self, value: &Value) -> Result<String> {
        let mut names = HashMap::new();
        collect_named(&self.compiled, &mut names);

        let json = project(value, Some(&self.compiled), &names)?;
        serde_json::to_string(&json).map_err(RegistryError::decode)
    }

    /// Resolve a value against the schema, refusing lossy `long` to `int`
    /// narrowing.
    fn resolve(&self, value: Value) -> Result<Value> {
        let resolved = value
            .clone()
            .resolve(&self.compiled)
            .map_err(|e| RegistryError::Encode(e.to_string()))?;

        if let Some(n) = narrowed_long(&value, &resolved) {
            return Err(RegistryError::Encode(format!(
                "value {} is out of range for int",
                n
            )));
        }
        Ok(resolved)
    }
}

/// First `long` in `input` whose `int` counterpart in `resolved` lost bits.
fn narrowed_long(input: &Value, resolved: &Value) -> Option<i64> {
    match (input, resolved) {
        (Value::Long(n), Value::Int(i)) if *n != i64::from(*i) => Some(*n),
        (Value::Union(_, inner), other) => narrowed_long(inner, other),
        (other, Value::Union(_, inner)) => narrowed_long(other, inner),
        (Value::Array(items), Value::Array(resolved_items)) => items
            .iter()
            .zip(resolved_items)
            .find_map(|(a, b)| narrowed_long(a, b)),
        (Value::Map(entries), Value::Map(resolved_entries)) => entries
            .iter()
            .find_map(|(k, v)| resolved_entries.get(k).and_then(|r| narrowed_long(v, r))),
        (Value::Map(entries), Value::Record(fields)) => fields
            .iter()
            .find_map(|(name, r)| entries.get(name).and_then(|v| narrowed_long(v, r))),
        (Value::Record(fields), Value::Record(resolved_fields)) => {
            fields.iter().find_map(|(name, v)| {
                resolved_fields
                    .iter()
                    .find(|(n, _)| n == name)
                    .and_then(|(_, r)| narrowed_long(v, r))
            })
        }
        _ => None,
    }
}

/// Named schemas reachable from `schema`, for following `Ref`s.
fn collect_named<'a>(schema: &'a AvroSchema, names: &mut HashMap<&'a Name, &'a AvroSchema>) {
    match schema {
        AvroSchema::Record(record) => {
            if names.insert(&record.name, schema).is_none() {
                for field in &record.fields {
                    collect_named(&field.schema, names);
                }
            }
        }
        AvroSchema::Array(items) => collect_named(items, names),
        AvroSchema::Map(values) => collect_named(values, names),
        AvroSchema::Union(union) => {
            for variant in union.variants() {
                collect_named(variant, names);
            }
        }
        _ => {}
    }
}

fn project(
    value: &Value,
    schema: Option<&AvroSchema>,
    names: &HashMap<&Name, &AvroSchema>,
) -> Result<serde_json::Value> {
    let schema = match schema {
        Some(AvroSchema::Ref { name }) => names.get(name).copied(),
        other => other,
    };

    let json = match value {
        Value::Float(f) if !f.is_finite() => non_finite(f64::from(*f)),
        Value::Double(d) if !d.is_finite() => non_finite(*d),
        Value::Decimal(decimal) => {
            let scale = match schema {
                Some(AvroSchema::Decimal(decimal_schema)) => decimal_schema.scale,
                _ => 0,
            };
            let bytes = Vec::<u8>::try_from(decimal).map_err(RegistryError::decode)?;
            serde_json::Value::String(decimal_text(&bytes, scale))
        }
        Value::Union(index, inner) => {
            let variant = match schema {
                Some(AvroSchema::Union(union)) => union.variants().get(*index as usize),
                _ => None,
            };
            project(inner, variant, names)?
        }
        Value::Array(items) => {
            let item_schema = match schema {
                Some(AvroSchema::Array(item)) => Some(&**item),
                _ => None,
            };
            serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| project(item, item_schema, names))
                    .collect::<Result<_>>()?,
            )
        }
        Value::Map(entries) => {
            let value_schema = match schema {
                Some(AvroSchema::Map(value)) => Some(&**value),
                _ => None,
            };
            serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), project(v, value_schema, names)?)))
                    .collect::<Result<_>>()?,
            )
        }
        Value::Record(fields) => {
            let record = match schema {
                Some(AvroSchema::Record(record)) => Some(record),
                _ => None,
            };
            serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(name, v)| {
                        let field_schema = record.and_then(|r| {
                            r.fields.iter().find(|f| &f.name == name).map(|f| &f.schema)
                        });
                        Ok((name.clone(), project(v, field_schema, names)?))
                    })
                    .collect::<Result<_>>()?,
            )
        }
        other => serde_json::Value::try_from(other.clone()).map_err(RegistryError::decode)?,
    };
    Ok(json)
}

fn non_finite(x: f64) -> serde_json::Value {
    let text = if x.is_nan() {
        "NaN"
    } else if x > 0.0 {
        "Infinity"
    } else {
        "-Infinity"
    };
    serde_json::Value::String(text.to_string())
}

/// Render a big-endian two's-complement unscaled integer with `scale`
/// fractional digits.
fn decimal_text(bytes: &[u8], scale: usize) -> String {
    let negative = bytes.first().map_or(false, |b| b & 0x80 != 0);
    let mut magnitude = bytes.to_vec();
    if negative {
        for b in magnitude.iter_mut() {
            *b = !*b;
        }
        for b in magnitude.iter_mut().rev() {
            let (sum, carry) = b.overflowing_add(1);
            *b = sum;
            if !carry {
                break;
            }
        }
    }

    // Repeated division by 10, least significant digit first
    let mut digits = Vec::new();
    while magnitude.iter().any(|&b| b != 0) {
        let mut rem = 0u32;
        for b in magnitude.iter_mut() {
            let cur = (rem << 8) | u32::from(*b);
            *b = (cur / 10) as u8;
            rem = cur % 10;
        }
        digits.push(b'0' + rem as u8);
    }
    while digits.len() <= scale {
        digits.push(b'0');
    }
    digits.reverse();

    let mut text = String::with_capacity(digits.len() + 2);
    if negative {
        text.push('-');
    }
    let split = digits.len() - scale;
    text.extend(digits[..split].iter().map(|&d| d as char));
    if scale > 0 {
        text.push('.');
        text.extend(digits[split..].iter().map(|&d| d as char));
    }
    text
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Schema {}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema").field("text", &self.text).finish()
    }
}
