use std::fmt;
use std::str::FromStr;

use crate::error::{BuildError, DecodeError};

// ════════════════════════════════════════════════════════════════
//  Wire Type
// ════════════════════════════════════════════════════════════════

/// Scalar wire types with a built-in codec.
///
/// Names and type OIDs follow PostgreSQL; the binary layouts are the ones
/// PostgreSQL uses for `send`/`recv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    /// Arbitrary precision. Base-10000 digit groups.
    Numeric,
    /// One character. PG: `character(1)`, sent as UTF-8 text.
    Char,
    Text,
    Bytea,
    /// Days since 2000-01-01.
    Date,
    /// Microseconds since 2000-01-01 00:00:00, no zone.
    Timestamp,
    /// Microseconds since 2000-01-01 00:00:00 UTC.
    TimestampTz,
    /// Microseconds since midnight.
    Time,
    /// Microseconds since midnight + zone offset in seconds west of UTC.
    TimeTz,
    Interval,
    Uuid,
    Json,
    /// Version byte `1` followed by JSON text.
    Jsonb,
}

impl WireType {
    pub const ALL: [WireType; 19] = [
        WireType::Bool,
        WireType::Int2,
        WireType::Int4,
        WireType::Int8,
        WireType::Float4,
        WireType::Float8,
        WireType::Numeric,
        WireType::Char,
        WireType::Text,
        WireType::Bytea,
        WireType::Date,
        WireType::Timestamp,
        WireType::TimestampTz,
        WireType::Time,
        WireType::TimeTz,
        WireType::Interval,
        WireType::Uuid,
        WireType::Json,
        WireType::Jsonb,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            WireType::Bool => "bool",
            WireType::Int2 => "int2",
            WireType::Int4 => "int4",
            WireType::Int8 => "int8",
            WireType::Float4 => "float4",
            WireType::Float8 => "float8",
            WireType::Numeric => "numeric",
            WireType::Char => "char",
            WireType::Text => "text",
            WireType::Bytea => "bytea",
            WireType::Date => "date",
            WireType::Timestamp => "timestamp",
            WireType::TimestampTz => "timestamptz",
            WireType::Time => "time",
            WireType::TimeTz => "timetz",
            WireType::Interval => "interval",
            WireType::Uuid => "uuid",
            WireType::Json => "json",
            WireType::Jsonb => "jsonb",
        }
    }

    pub const fn oid(self) -> u32 {
        match self {
            WireType::Bool => 16,
            WireType::Bytea => 17,
            WireType::Int8 => 20,
            WireType::Int2 => 21,
            WireType::Int4 => 23,
            WireType::Text => 25,
            WireType::Json => 114,
            WireType::Float4 => 700,
            WireType::Float8 => 701,
            WireType::Char => 1042,
            WireType::Date => 1082,
            WireType::Time => 1083,
            WireType::Timestamp => 1114,
            WireType::TimestampTz => 1184,
            WireType::Interval => 1186,
            WireType::TimeTz => 1266,
            WireType::Numeric => 1700,
            WireType::Uuid => 2950,
            WireType::Jsonb => 3802,
        }
    }

    /// OID of the one-dimensional array type over this element type.
    pub const fn array_oid(self) -> u32 {
        match self {
            WireType::Json => 199,
            WireType::Bool => 1000,
            WireType::Bytea => 1001,
            WireType::Int2 => 1005,
            WireType::Int4 => 1007,
            WireType::Text => 1009,
            WireType::Char => 1014,
            WireType::Int8 => 1016,
            WireType::Float4 => 1021,
            WireType::Float8 => 1022,
            WireType::Timestamp => 1115,
            WireType::Date => 1182,
            WireType::Time => 1183,
            WireType::TimestampTz => 1185,
            WireType::Interval => 1187,
            WireType::Numeric => 1231,
            WireType::TimeTz => 1270,
            WireType::Uuid => 2951,
            WireType::Jsonb => 3807,
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WireType {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WireType::ALL
            .into_iter()
            .find(|wire| wire.name() == s)
            .ok_or_else(|| BuildError::Unregistered(s.to_string()))
    }
}

// ════════════════════════════════════════════════════════════════
//  ByteReader
// ════════════════════════════════════════════════════════════════

/// Big-endian reader over one raw value.
///
/// Every short read is reported as a malformed value of `type_name`.
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    type_name: &'a str,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(buf: &'a [u8], type_name: &'a str) -> Self {
        Self { buf, type_name }
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.buf.len() < len {
            return Err(DecodeError::malformed(
                self.type_name,
                format!("need {len} bytes, {} left", self.buf.len()),
            ));
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_be_bytes(self.array()?))
    }

    pub(crate) fn u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub(crate) fn i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    pub(crate) fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    pub(crate) fn i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    /// Fail unless every byte was consumed.
    pub(crate) fn finish(self) -> Result<(), DecodeError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::malformed(
                self.type_name,
                format!("{} trailing bytes", self.buf.len()),
            ))
        }
    }
}
