use std::fmt;
use std::sync::Arc;

use crate::array::{decode_array, encode_array};
use crate::error::{BuildError, DecodeError, EncodeError};
use crate::registry::{CodecRegistry, ScalarCodec};
use crate::row::{ParamWriter, RowReader};
use crate::shape::{SemanticType, Shape};
use crate::value::Value;

/// Codec for one field: the shape wrapper around a shared scalar codec.
///
/// A field always occupies exactly one column / parameter; sequences are
/// carried as one array value.
#[derive(Clone)]
pub struct FieldCodec {
    shape: Shape,
    element: Arc<dyn ScalarCodec>,
}

impl FieldCodec {
    /// Resolve the scalar component of `ty` in `registry`.
    ///
    /// Fails only when the scalar type is not registered.
    pub fn resolve(registry: &CodecRegistry, ty: &SemanticType) -> Result<Self, BuildError> {
        let element = registry.resolve(&ty.scalar)?;
        Ok(Self {
            shape: ty.shape,
            element,
        })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn type_name(&self) -> &str {
        self.element.type_name()
    }

    /// OID of the parameter this field encodes to.
    pub fn oid(&self) -> u32 {
        if self.shape.is_sequence() {
            self.element.array_oid()
        } else {
            self.element.oid()
        }
    }

    /// Read exactly one column.
    pub fn decode(&self, reader: &mut dyn RowReader) -> Result<Value, DecodeError> {
        let raw = reader.next_column()?;
        match self.shape {
            Shape::OptionalSequence => {
                decode_array(&*self.element, required(raw)?, true).map(Value::Array)
            }
            Shape::Sequence => {
                decode_array(&*self.element, required(raw)?, false).map(Value::Array)
            }
            Shape::Optional => match raw {
                None => Ok(Value::Null),
                Some(bytes) => self.element.decode(bytes),
            },
            Shape::Scalar => self.element.decode(required(raw)?),
        }
    }

    /// Append exactly one parameter.
    pub fn encode(&self, value: &Value, writer: &mut dyn ParamWriter) -> Result<(), EncodeError> {
        let bytes = match (self.shape, value) {
            (Shape::OptionalSequence | Shape::Sequence, Value::Array(items)) => {
                let mut out = Vec::new();
                let nullable = self.shape == Shape::OptionalSequence;
                encode_array(&*self.element, items, nullable, &mut out)?;
                Some(out)
            }
            (Shape::OptionalSequence | Shape::Sequence, Value::Null) => {
                return Err(EncodeError::UnexpectedNull);
            }
            (Shape::OptionalSequence | Shape::Sequence, other) => {
                return Err(EncodeError::mismatch("array", other.kind()));
            }
            (Shape::Optional, Value::Null) => None,
            (Shape::Scalar, Value::Null) => return Err(EncodeError::UnexpectedNull),
            (Shape::Optional | Shape::Scalar, value) => {
                let mut out = Vec::new();
                self.element.encode(value, &mut out)?;
                Some(out)
            }
        };
        writer.push(self.oid(), bytes);
        Ok(())
    }
}

fn required(raw: Option<&[u8]>) -> Result<&[u8], DecodeError> {
    raw.ok_or(DecodeError::UnexpectedNull)
}

impl fmt::Debug for FieldCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCodec")
            .field("shape", &self.shape)
            .field("type", &self.element.type_name())
            .finish()
    }
}
