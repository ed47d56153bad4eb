use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::error::{DecodeError, EncodeError};
use crate::value::{Decimal, Interval, TimeTz, Value};

/// Rust type stored as one scalar column.
///
/// `TYPE_NAME` is the registry key used when a record field of this type
/// has no explicit `#[codec(scalar = "...")]`.
pub trait Scalar: Sized {
    const TYPE_NAME: &'static str;

    fn to_value(&self) -> Result<Value, EncodeError>;

    /// Never called with `Value::Null`; null handling belongs to the shape.
    fn from_value(value: Value) -> Result<Self, DecodeError>;
}

macro_rules! direct_scalar {
    ($($ty:ty => $variant:ident, $name:literal;)*) => {$(
        impl Scalar for $ty {
            const TYPE_NAME: &'static str = $name;

            fn to_value(&self) -> Result<Value, EncodeError> {
                Ok(Value::$variant(self.clone()))
            }

            fn from_value(value: Value) -> Result<Self, DecodeError> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(DecodeError::mismatch($name, other.kind())),
                }
            }
        }
    )*};
}

direct_scalar! {
    bool => Bool, "bool";
    f32 => Float4, "float4";
    f64 => Float8, "float8";
    char => Char, "char";
    String => Text, "text";
    Vec<u8> => Bytea, "bytea";
    Decimal => Numeric, "numeric";
    NaiveDate => Date, "date";
    NaiveDateTime => Timestamp, "timestamp";
    DateTime<Utc> => TimestampTz, "timestamptz";
    NaiveTime => Time, "time";
    TimeTz => TimeTz, "timetz";
    Interval => Interval, "interval";
    Uuid => Uuid, "uuid";
    serde_json::Value => Json, "jsonb";
}

// Signed integers accept any narrower integer column on decode.

impl Scalar for i16 {
    const TYPE_NAME: &'static str = "int2";

    fn to_value(&self) -> Result<Value, EncodeError> {
        Ok(Value::Int2(*self))
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Int2(v) => Ok(v),
            other => Err(DecodeError::mismatch("int2", other.kind())),
        }
    }
}

impl Scalar for i32 {
    const TYPE_NAME: &'static str = "int4";

    fn to_value(&self) -> Result<Value, EncodeError> {
        Ok(Value::Int4(*self))
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Int4(v) => Ok(v),
            Value::Int2(v) => Ok(i32::from(v)),
            other => Err(DecodeError::mismatch("int4", other.kind())),
        }
    }
}

impl Scalar for i64 {
    const TYPE_NAME: &'static str = "int8";

    fn to_value(&self) -> Result<Value, EncodeError> {
        Ok(Value::Int8(*self))
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Int8(v) => Ok(v),
            Value::Int4(v) => Ok(i64::from(v)),
            Value::Int2(v) => Ok(i64::from(v)),
            other => Err(DecodeError::mismatch("int8", other.kind())),
        }
    }
}

/// Integer types without a column type of their own, stored in the
/// smallest signed column that holds every value they can take (`u64`
/// and the pointer-sized types go to `int8`). Values that do not fit fail
/// with `OutOfRange` in either direction; nothing is truncated.
macro_rules! widened_scalar {
    ($($ty:ty => $wide:ty, $variant:ident, $name:literal;)*) => {$(
        impl Scalar for $ty {
            const TYPE_NAME: &'static str = $name;

            fn to_value(&self) -> Result<Value, EncodeError> {
                <$wide>::try_from(*self)
                    .map(Value::$variant)
                    .map_err(|_| EncodeError::out_of_range(self, $name))
            }

            fn from_value(value: Value) -> Result<Self, DecodeError> {
                match value {
                    Value::$variant(v) => <$ty>::try_from(v)
                        .map_err(|_| DecodeError::out_of_range(v, stringify!($ty))),
                    other => Err(DecodeError::mismatch($name, other.kind())),
                }
            }
        }
    )*};
}

widened_scalar! {
    i8 => i16, Int2, "int2";
    u8 => i16, Int2, "int2";
    u16 => i32, Int4, "int4";
    u32 => i64, Int8, "int8";
    u64 => i64, Int8, "int8";
    usize => i64, Int8, "int8";
    isize => i64, Int8, "int8";
}

/// Exact durations only: month and day components are calendar-relative
/// and do not convert.
impl Scalar for TimeDelta {
    const TYPE_NAME: &'static str = "interval";

    fn to_value(&self) -> Result<Value, EncodeError> {
        let micros = self
            .num_microseconds()
            .ok_or_else(|| EncodeError::out_of_range(self, "interval"))?;
        Ok(Value::Interval(Interval::new(0, 0, micros)))
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Interval(iv) if iv.months == 0 && iv.days == 0 => {
                Ok(TimeDelta::microseconds(iv.microseconds))
            }
            Value::Interval(iv) => Err(DecodeError::out_of_range(iv, "TimeDelta")),
            other => Err(DecodeError::mismatch("interval", other.kind())),
        }
    }
}
