//! Conversion to and from `serde_json::Value`.
//!
//! Scalars without a JSON counterpart are rendered as strings the same way
//! the text writer renders them. Constructors become arrays of their
//! arguments; comments are dropped.

use base64::Engine as _;
use json_joy_json_text::format::{
    format_decimal, format_iso_offset, format_iso_utc, format_timespan,
};
use json_joy_json_text::{DuplicatePropertyHandling, Primitive};
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Number, Value};

use crate::document::Document;
use crate::error::TreeResult;
use crate::node::{NodeId, NodeKind};

/// Scalar for a JSON number: signed when it fits, then unsigned, then
/// floating.
pub fn primitive_from_number(number: &Number) -> Primitive {
    if let Some(i) = number.as_i64() {
        Primitive::Integer(i)
    } else if let Some(u) = number.as_u64() {
        Primitive::UInteger(u)
    } else {
        Primitive::Float(number.as_f64().unwrap_or(f64::NAN))
    }
}

fn primitive_to_json(value: &Primitive) -> Option<Value> {
    Some(match value {
        Primitive::Null | Primitive::Undefined => Value::Null,
        Primitive::Boolean(b) => Value::Bool(*b),
        Primitive::Integer(i) => Value::from(*i),
        Primitive::UInteger(u) => Value::from(*u),
        Primitive::BigInteger(b) => Value::String(b.to_string()),
        Primitive::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Primitive::Decimal(d) => match d.to_f64().and_then(Number::from_f64) {
            Some(n) => Value::Number(n),
            None => Value::String(format_decimal(d)),
        },
        Primitive::String(s) | Primitive::Uri(s) | Primitive::Raw(s) => Value::String(s.clone()),
        Primitive::Date(d) => Value::String(format_iso_utc(d)),
        Primitive::DateOffset(d) => Value::String(format_iso_offset(d)),
        Primitive::Bytes(b) => {
            Value::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
        Primitive::Guid(g) => Value::String(g.hyphenated().to_string()),
        Primitive::TimeSpan(t) => Value::String(format_timespan(t)),
        Primitive::Comment(_) => return None,
    })
}

impl Document {
    /// Build a detached tree from a `serde_json` value.
    pub fn from_json_value(&mut self, value: &Value) -> TreeResult<NodeId> {
        Ok(match value {
            Value::Null => self.new_value(Primitive::Null),
            Value::Bool(b) => self.new_value(*b),
            Value::Number(n) => self.new_value(primitive_from_number(n)),
            Value::String(s) => self.new_value(s.as_str()),
            Value::Array(items) => {
                let array = self.new_array();
                for item in items {
                    let child = self.from_json_value(item)?;
                    self.add(array, child)?;
                }
                array
            }
            Value::Object(map) => {
                let object = self.new_object();
                for (name, item) in map {
                    let child = self.from_json_value(item)?;
                    let property = self.new_property(name.as_str(), child)?;
                    let len = self.len(object);
                    self.insert_with(object, len, property, Some(DuplicatePropertyHandling::Replace))?;
                }
                object
            }
        })
    }

    /// `serde_json` form of the subtree at `id`. A property converts as its
    /// value.
    pub fn to_json_value(&self, id: NodeId) -> TreeResult<Value> {
        Ok(match self.kind(id)? {
            NodeKind::Object => {
                let mut map = Map::new();
                for (name, value) in self.properties(id) {
                    map.insert(name.to_owned(), self.to_json_value(value)?);
                }
                Value::Object(map)
            }
            NodeKind::Array | NodeKind::Constructor => {
                let mut items = Vec::with_capacity(self.len(id));
                for &child in self.children(id) {
                    if matches!(self.value(child), Some(Primitive::Comment(_))) {
                        continue;
                    }
                    items.push(self.to_json_value(child)?);
                }
                Value::Array(items)
            }
            NodeKind::Property => match self.property_value(id) {
                Some(value) => self.to_json_value(value)?,
                None => Value::Null,
            },
            NodeKind::Value => self
                .value(id)
                .and_then(primitive_to_json)
                .unwrap_or(Value::Null),
        })
    }
}
