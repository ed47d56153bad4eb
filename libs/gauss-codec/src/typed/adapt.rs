//! Shape adapters used by `#[derive(Record)]`.
//!
//! The derive classifies every field type into a [`Shape`](crate::Shape)
//! and calls the matching `*_to_value` / `*_from_value` pair with the
//! scalar component spelled out, so each field resolves to exactly one
//! adapter.

use std::vec;

use super::scalar::Scalar;
use crate::error::{DecodeError, EncodeError};
use crate::value::Value;

/// Decoded values of one row, handed out field by field.
#[derive(Debug)]
pub struct FieldReader {
    values: vec::IntoIter<Value>,
    position: usize,
}

impl FieldReader {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Convert the next value; errors carry the field position and name.
    pub fn take<T>(
        &mut self,
        name: &str,
        convert: impl FnOnce(Value) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        let position = self.position;
        self.position += 1;
        let value = self
            .values
            .next()
            .ok_or(DecodeError::EndOfRow { position })?;
        convert(value).map_err(|e| e.in_field(position, name))
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

/// Values of one row being encoded, in field order.
#[derive(Debug, Default)]
pub struct FieldWriter {
    values: Vec<Value>,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, name: &str, value: Result<Value, EncodeError>) -> Result<(), EncodeError> {
        let position = self.values.len();
        self.values.push(value.map_err(|e| e.in_field(position, name))?);
        Ok(())
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

// ═══════════════════════════════════════════════════════════════
//  Record → Value
// ═══════════════════════════════════════════════════════════════

pub fn scalar_to_value<S: Scalar>(value: &S) -> Result<Value, EncodeError> {
    value.to_value()
}

pub fn optional_to_value<S: Scalar>(value: &Option<S>) -> Result<Value, EncodeError> {
    match value {
        Some(v) => v.to_value(),
        None => Ok(Value::Null),
    }
}

pub fn sequence_to_value<S: Scalar>(items: &[S]) -> Result<Value, EncodeError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| item.to_value().map_err(|e| e.in_element(i)))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

pub fn optional_sequence_to_value<S: Scalar>(items: &[Option<S>]) -> Result<Value, EncodeError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| optional_to_value(item).map_err(|e| e.in_element(i)))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

// ═══════════════════════════════════════════════════════════════
//  Value → Record
// ═══════════════════════════════════════════════════════════════

pub fn scalar_from_value<S: Scalar>(value: Value) -> Result<S, DecodeError> {
    match value {
        Value::Null => Err(DecodeError::UnexpectedNull),
        value => S::from_value(value),
    }
}

pub fn optional_from_value<S: Scalar>(value: Value) -> Result<Option<S>, DecodeError> {
    match value {
        Value::Null => Ok(None),
        value => S::from_value(value).map(Some),
    }
}

pub fn sequence_from_value<S: Scalar>(value: Value) -> Result<Vec<S>, DecodeError> {
    array_items(value)?
        .into_iter()
        .enumerate()
        .map(|(i, item)| scalar_from_value(item).map_err(|e| e.in_element(i)))
        .collect()
}

pub fn optional_sequence_from_value<S: Scalar>(
    value: Value,
) -> Result<Vec<Option<S>>, DecodeError> {
    array_items(value)?
        .into_iter()
        .enumerate()
        .map(|(i, item)| optional_from_value(item).map_err(|e| e.in_element(i)))
        .collect()
}

fn array_items(value: Value) -> Result<Vec<Value>, DecodeError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Err(DecodeError::UnexpectedNull),
        other => Err(DecodeError::mismatch("array", other.kind())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_tags_errors_with_field() {
        let mut reader = FieldReader::new(vec![Value::Int8(1), Value::Null]);
        assert_eq!(reader.take("id", scalar_from_value::<i64>), Ok(1));
        assert_eq!(
            reader.take("name", scalar_from_value::<String>),
            Err(DecodeError::UnexpectedNull.in_field(1, "name"))
        );
        assert_eq!(
            reader.take("extra", scalar_from_value::<String>),
            Err(DecodeError::EndOfRow { position: 2 })
        );
    }

    #[test]
    fn writer_positions_follow_push_order() {
        let mut writer = FieldWriter::new();
        writer.put("a", scalar_to_value(&1i32)).unwrap();
        let err = writer.put("b", u64::MAX.to_value()).unwrap_err();
        assert!(matches!(err, EncodeError::Field { position: 1, .. }));
        assert_eq!(writer.into_values(), vec![Value::Int4(1)]);
    }

    #[test]
    fn optional_sequence_keeps_nulls_in_place() {
        let items = vec![Some(1i32), None, Some(3)];
        let value = optional_sequence_to_value(&items).unwrap();
        assert_eq!(
            value,
            Value::Array(vec![Value::Int4(1), Value::Null, Value::Int4(3)])
        );
        assert_eq!(optional_sequence_from_value::<i32>(value), Ok(items));
    }

    #[test]
    fn sequence_rejects_null_elements() {
        let value = Value::Array(vec![Value::Text("a".into()), Value::Null]);
        assert_eq!(
            sequence_from_value::<String>(value),
            Err(DecodeError::UnexpectedNull.in_element(1))
        );
    }
}
