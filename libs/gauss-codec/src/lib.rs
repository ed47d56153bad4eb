//! Codecs between records and flat rows of PostgreSQL binary columns.
//!
//! A [`RecordCodec`] is derived once per record shape from a
//! [`CodecRegistry`] of scalar codecs and then decodes rows into values
//! and encodes values into query parameters, one column per field.
//! `#[derive(Record)]` and `#[derive(Enum)]` bind Rust types to it.

extern crate self as gauss_codec;

mod array;
pub mod builtin;
pub mod config;
pub mod enums;
pub mod error;
pub mod field;
pub mod record;
pub mod registry;
pub mod row;
pub mod shape;
pub mod typed;
pub mod value;
pub mod wire;

pub use gauss_codec_derive::{Enum, Record};

pub use config::{Catalog, SchemaConfig};
pub use enums::{enum_from_value, Enum, EnumCodec, LabelTable};
pub use error::{BuildError, DecodeError, EncodeError};
pub use field::FieldCodec;
pub use record::RecordCodec;
pub use registry::{CodecRegistry, ScalarCodec};
pub use row::{Param, ParamWriter, Params, RawRow, RowCursor, RowReader};
pub use shape::{EnumShape, FieldDescriptor, RecordShape, SemanticType, Shape};
pub use typed::{Record, Scalar, TypedCodec};
pub use value::{Decimal, Interval, TimeTz, Value};
pub use wire::WireType;
