//! Structural validation of JSON values against a derived schema
//!
//! Walks a `serde_json::Value` alongside a `schemars` [`RootSchema`] and
//! reports the first field that fails, as a path like
//! `weeks[0].days[1].exercises[2].sets`. Covers the subset of JSON Schema
//! that derived plan schemas use: references, instance types, `anyOf` /
//! `allOf` / `oneOf`, enums, numeric bounds, integer widths from `format`,
//! array length and object properties.

use schemars::schema::{
    ArrayValidation, InstanceType, NumberValidation, ObjectValidation, RootSchema, Schema,
    SchemaObject, SingleOrVec,
};
use serde_json::Value;

use crate::error::{Error, Result};

const ROOT_PATH: &str = "<root>";

/// Validates values against one root schema
#[derive(Debug, Clone, Copy)]
pub struct SchemaValidator<'a> {
    root: &'a RootSchema,
}

impl<'a> SchemaValidator<'a> {
    /// Create a validator for `root`
    pub fn new(root: &'a RootSchema) -> Self {
        Self { root }
    }

    /// Validate `value`, failing with [`Error::SchemaViolation`] at the first bad field
    pub fn validate(&self, value: &Value) -> Result<()> {
        self.check_object(&self.root.schema, value, "")
    }

    fn check(&self, schema: &Schema, value: &Value, path: &str) -> Result<()> {
        match schema {
            Schema::Bool(true) => Ok(()),
            Schema::Bool(false) => Err(violation(path, "no value is allowed here")),
            Schema::Object(object) => self.check_object(object, value, path),
        }
    }

    fn check_object(&self, schema: &SchemaObject, value: &Value, path: &str) -> Result<()> {
        if let Some(reference) = &schema.reference {
            let target = self.resolve(reference)?;
            return self.check(target, value, path);
        }

        if let Some(subschemas) = &schema.subschemas {
            if let Some(all_of) = &subschemas.all_of {
                for sub in all_of {
                    self.check(sub, value, path)?;
                }
            }
            if let Some(any_of) = &subschemas.any_of {
                self.check_alternatives(any_of, value, path, false)?;
            }
            if let Some(one_of) = &subschemas.one_of {
                self.check_alternatives(one_of, value, path, true)?;
            }
        }

        if let Some(types) = &schema.instance_type {
            if !type_matches(types, value) {
                return Err(violation(
                    path,
                    format!("expected {}, found {}", describe_types(types), value_kind(value)),
                ));
            }
        }

        if let Some(allowed) = &schema.enum_values {
            if !allowed.contains(value) {
                return Err(violation(path, format!("{value} is not an allowed value")));
            }
        }

        if let (Some(number), Some(n)) = (&schema.number, value.as_f64()) {
            check_number(number, n, path)?;
        }

        if let (Some(format), Value::Number(n)) = (&schema.format, value) {
            check_integer_width(format, n, path)?;
        }

        if let (Some(array), Value::Array(items)) = (&schema.array, value) {
            self.check_array(array, items, path)?;
        }

        if let (Some(object), Value::Object(map)) = (&schema.object, value) {
            self.check_properties(object, map, path)?;
        }

        Ok(())
    }

    fn check_alternatives(
        &self,
        alternatives: &[Schema],
        value: &Value,
        path: &str,
        exactly_one: bool,
    ) -> Result<()> {
        let mut first_failure = None;
        let mut matched = 0;
        for sub in alternatives {
            match self.check(sub, value, path) {
                Ok(()) => matched += 1,
                Err(e) => {
                    first_failure.get_or_insert(e);
                }
            }
        }

        match (matched, exactly_one) {
            (0, _) => Err(first_failure
                .unwrap_or_else(|| violation(path, "no alternative matches"))),
            (1, _) | (_, false) => Ok(()),
            (n, true) => Err(violation(path, format!("matches {n} alternatives, expected one"))),
        }
    }

    fn check_array(&self, array: &ArrayValidation, items: &[Value], path: &str) -> Result<()> {
        if let Some(min) = array.min_items {
            if (items.len() as u32) < min {
                return Err(violation(
                    path,
                    format!("expected at least {min} item(s), found {}", items.len()),
                ));
            }
        }
        if let Some(max) = array.max_items {
            if (items.len() as u32) > max {
                return Err(violation(
                    path,
                    format!("expected at most {max} item(s), found {}", items.len()),
                ));
            }
        }

        match &array.items {
            Some(SingleOrVec::Single(item_schema)) => {
                for (i, item) in items.iter().enumerate() {
                    self.check(item_schema, item, &index_path(path, i))?;
                }
            }
            Some(SingleOrVec::Vec(tuple)) => {
                for (i, (item_schema, item)) in tuple.iter().zip(items).enumerate() {
                    self.check(item_schema, item, &index_path(path, i))?;
                }
            }
            None => {}
        }
        Ok(())
    }

    fn check_properties(
        &self,
        object: &ObjectValidation,
        map: &serde_json::Map<String, Value>,
        path: &str,
    ) -> Result<()> {
        for (name, property) in &object.properties {
            let field_path = field_path(path, name);
            match map.get(name) {
                Some(value) => self.check(property, value, &field_path)?,
                None if object.required.contains(name) => {
                    return Err(violation(&field_path, "required field is missing"));
                }
                None => {}
            }
        }

        for required in &object.required {
            if !object.properties.contains_key(required) && !map.contains_key(required) {
                return Err(violation(&field_path(path, required), "required field is missing"));
            }
        }

        if let Some(additional) = &object.additional_properties {
            for (key, value) in map {
                if !object.properties.contains_key(key) {
                    self.check(additional, value, &field_path(path, key))?;
                }
            }
        }
        Ok(())
    }

    fn resolve(&self, reference: &str) -> Result<&'a Schema> {
        let name = reference.rsplit('/').next().unwrap_or(reference);
        self.root
            .definitions
            .get(name)
            .ok_or_else(|| Error::Internal(format!("unresolved schema reference: {reference}")))
    }
}

fn check_number(number: &NumberValidation, n: f64, path: &str) -> Result<()> {
    if let Some(min) = number.minimum {
        if n < min {
            return Err(violation(path, format!("{n} is below the minimum of {min}")));
        }
    }
    if let Some(max) = number.maximum {
        if n > max {
            return Err(violation(path, format!("{n} is above the maximum of {max}")));
        }
    }
    if let Some(min) = number.exclusive_minimum {
        if n <= min {
            return Err(violation(path, format!("{n} must be greater than {min}")));
        }
    }
    if let Some(max) = number.exclusive_maximum {
        if n >= max {
            return Err(violation(path, format!("{n} must be less than {max}")));
        }
    }
    Ok(())
}

/// Integers must fit the Rust type the schema was derived from
fn check_integer_width(format: &str, n: &serde_json::Number, path: &str) -> Result<()> {
    let (min, max): (i128, i128) = match format {
        "uint8" => (0, u8::MAX.into()),
        "uint16" => (0, u16::MAX.into()),
        "uint32" => (0, u32::MAX.into()),
        "uint64" | "uint" => (0, u64::MAX.into()),
        "int8" => (i8::MIN.into(), i8::MAX.into()),
        "int16" => (i16::MIN.into(), i16::MAX.into()),
        "int32" => (i32::MIN.into(), i32::MAX.into()),
        "int64" | "int" => (i64::MIN.into(), i64::MAX.into()),
        _ => return Ok(()),
    };
    let value = n
        .as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from));
    match value {
        Some(v) if v < min || v > max => {
            Err(violation(path, format!("{v} is out of range for {format}")))
        }
        _ => Ok(()),
    }
}

fn type_matches(types: &SingleOrVec<InstanceType>, value: &Value) -> bool {
    match types {
        SingleOrVec::Single(t) => instance_matches(t, value),
        SingleOrVec::Vec(ts) => ts.iter().any(|t| instance_matches(t, value)),
    }
}

fn instance_matches(instance: &InstanceType, value: &Value) -> bool {
    match (instance, value) {
        (InstanceType::Null, Value::Null)
        | (InstanceType::Boolean, Value::Bool(_))
        | (InstanceType::Number, Value::Number(_))
        | (InstanceType::String, Value::String(_))
        | (InstanceType::Array, Value::Array(_))
        | (InstanceType::Object, Value::Object(_)) => true,
        (InstanceType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
        _ => false,
    }
}

fn describe_types(types: &SingleOrVec<InstanceType>) -> String {
    match types {
        SingleOrVec::Single(t) => instance_name(t).to_string(),
        SingleOrVec::Vec(ts) => ts
            .iter()
            .map(instance_name)
            .collect::<Vec<_>>()
            .join(" or "),
    }
}

fn instance_name(instance: &InstanceType) -> &'static str {
    match instance {
        InstanceType::Null => "null",
        InstanceType::Boolean => "boolean",
        InstanceType::Object => "object",
        InstanceType::Array => "array",
        InstanceType::Number => "number",
        InstanceType::String => "string",
        InstanceType::Integer => "integer",
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn field_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

fn violation(path: &str, reason: impl Into<String>) -> Error {
    let field = if path.is_empty() { ROOT_PATH } else { path };
    Error::schema_violation(field, reason)
}
