//! One-dimensional array layout shared by the sequence shapes.
//!
//! ```text
//! ndim:i32 has_null:i32 elem_oid:u32 [len:i32 lower_bound:i32]*ndim
//! (elem_len:i32 elem_bytes)*   elem_len = -1 for null
//! ```
//!
//! An empty array has `ndim = 0` and no dimension header.

use crate::error::{DecodeError, EncodeError};
use crate::registry::ScalarCodec;
use crate::value::Value;
use crate::wire::ByteReader;

const ARRAY: &str = "array";

/// Decode an array column. Null elements become `Value::Null` when
/// `nullable_elements`, otherwise they fail the decode.
pub(crate) fn decode_array(
    element: &dyn ScalarCodec,
    raw: &[u8],
    nullable_elements: bool,
) -> Result<Vec<Value>, DecodeError> {
    let mut r = ByteReader::new(raw, ARRAY);
    let ndim = r.i32()?;
    let _has_null = r.i32()?;
    let elem_oid = r.u32()?;

    let expected_oid = element.oid();
    if expected_oid != 0 && elem_oid != 0 && elem_oid != expected_oid {
        return Err(DecodeError::mismatch(
            element.type_name(),
            format!("element oid {elem_oid}"),
        ));
    }

    match ndim {
        0 => {
            r.finish()?;
            return Ok(Vec::new());
        }
        1 => {}
        n => {
            return Err(DecodeError::malformed(
                ARRAY,
                format!("{n} dimensions, only one-dimensional arrays are supported"),
            ));
        }
    }

    let len = r.i32()?;
    let _lower_bound = r.i32()?;
    let len = usize::try_from(len)
        .map_err(|_| DecodeError::malformed(ARRAY, format!("length {len}")))?;

    // Each element needs at least its length prefix.
    let mut items = Vec::with_capacity(len.min(raw.len() / 4));
    for index in 0..len {
        let elem_len = r.i32()?;
        if elem_len < 0 {
            if !nullable_elements {
                return Err(DecodeError::UnexpectedNull.in_element(index));
            }
            items.push(Value::Null);
            continue;
        }
        let bytes = r.take(elem_len as usize)?;
        let value = element.decode(bytes).map_err(|e| e.in_element(index))?;
        items.push(value);
    }
    r.finish()?;
    Ok(items)
}

/// Encode `items` as an array of `element`.
pub(crate) fn encode_array(
    element: &dyn ScalarCodec,
    items: &[Value],
    nullable_elements: bool,
    out: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let has_null = items.iter().any(Value::is_null);
    if items.is_empty() {
        out.extend_from_slice(&0i32.to_be_bytes());
        out.extend_from_slice(&0i32.to_be_bytes());
        out.extend_from_slice(&element.oid().to_be_bytes());
        return Ok(());
    }

    let len = i32::try_from(items.len())
        .map_err(|_| EncodeError::out_of_range(items.len(), ARRAY))?;
    out.extend_from_slice(&1i32.to_be_bytes());
    out.extend_from_slice(&i32::from(has_null).to_be_bytes());
    out.extend_from_slice(&element.oid().to_be_bytes());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&1i32.to_be_bytes());

    for (index, item) in items.iter().enumerate() {
        if item.is_null() {
            if !nullable_elements {
                return Err(EncodeError::UnexpectedNull.in_element(index));
            }
            out.extend_from_slice(&(-1i32).to_be_bytes());
            continue;
        }
        let start = out.len();
        out.extend_from_slice(&[0; 4]);
        element
            .encode(item, out)
            .map_err(|e| e.in_element(index))?;
        let elem_len = out.len() - start - 4;
        let elem_len = i32::try_from(elem_len)
            .map_err(|_| EncodeError::out_of_range(elem_len, ARRAY).in_element(index))?;
        out[start..start + 4].copy_from_slice(&elem_len.to_be_bytes());
    }
    Ok(())
}
