//! Typed bindings: Rust structs and enums on top of the dynamic codecs.

pub mod adapt;
mod scalar;

use std::fmt;
use std::marker::PhantomData;

pub use adapt::{FieldReader, FieldWriter};
pub use scalar::Scalar;

use crate::error::{BuildError, DecodeError, EncodeError};
use crate::record::RecordCodec;
use crate::registry::CodecRegistry;
use crate::row::{ParamWriter, Params, RawRow, RowReader};
use crate::shape::RecordShape;

/// Rust type stored as a flat run of columns. Usually `#[derive(Record)]`.
///
/// `read_fields` and `write_fields` visit fields in `shape()` order.
/// Pairs and triples of records are records too; they decode one row of
/// a join, each part from its own columns.
pub trait Record: Sized {
    fn shape() -> RecordShape;

    fn read_fields(fields: &mut FieldReader) -> Result<Self, DecodeError>;

    fn write_fields(&self, fields: &mut FieldWriter) -> Result<(), EncodeError>;

    /// Dynamic codec for this record.
    fn codec(registry: &CodecRegistry) -> Result<RecordCodec, BuildError> {
        RecordCodec::derive(registry, &Self::shape())
    }
}

macro_rules! tuple_record {
    ($($part:ident),+) => {
        impl<$($part: Record),+> Record for ($($part,)+) {
            fn shape() -> RecordShape {
                RecordShape::concat([$(&$part::shape()),+])
            }

            fn read_fields(fields: &mut FieldReader) -> Result<Self, DecodeError> {
                Ok(($($part::read_fields(fields)?,)+))
            }

            #[allow(non_snake_case)]
            fn write_fields(&self, fields: &mut FieldWriter) -> Result<(), EncodeError> {
                let ($($part,)+) = self;
                $($part.write_fields(fields)?;)+
                Ok(())
            }

            fn codec(registry: &CodecRegistry) -> Result<RecordCodec, BuildError> {
                Ok(RecordCodec::concat([$($part::codec(registry)?),+]))
            }
        }
    };
}

tuple_record!(A, B);
tuple_record!(A, B, C);

// ════════════════════════════════════════════════════════════════
//  TypedCodec
// ════════════════════════════════════════════════════════════════

/// [`RecordCodec`] bound to a Rust type.
pub struct TypedCodec<R> {
    codec: RecordCodec,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> TypedCodec<R> {
    /// Fails if any field's scalar type is not in `registry`.
    pub fn derive(registry: &CodecRegistry) -> Result<Self, BuildError> {
        Ok(Self {
            codec: R::codec(registry)?,
            _record: PhantomData,
        })
    }

    pub fn record_codec(&self) -> &RecordCodec {
        &self.codec
    }

    pub fn shape(&self) -> &RecordShape {
        self.codec.shape()
    }

    pub fn width(&self) -> usize {
        self.codec.width()
    }

    /// Decode the next `width()` columns of `reader`.
    pub fn decode(&self, reader: &mut dyn RowReader) -> Result<R, DecodeError> {
        let values = self.codec.decode(reader)?;
        R::read_fields(&mut FieldReader::new(values))
    }

    pub fn decode_row(&self, row: &RawRow) -> Result<R, DecodeError> {
        let values = self.codec.decode_row(row)?;
        R::read_fields(&mut FieldReader::new(values))
    }

    pub fn encode_into(&self, record: &R, writer: &mut dyn ParamWriter) -> Result<(), EncodeError> {
        let mut fields = FieldWriter::new();
        record.write_fields(&mut fields)?;
        self.codec.encode_into(&fields.into_values(), writer)
    }

    pub fn encode(&self, record: &R) -> Result<Params, EncodeError> {
        let mut params = Params::with_capacity(self.width());
        self.encode_into(record, &mut params)?;
        Ok(params)
    }

    /// Parameters of every record, concatenated in order.
    pub fn encode_batch<'a, I>(&self, records: I) -> Result<Params, EncodeError>
    where
        I: IntoIterator<Item = &'a R>,
        R: 'a,
    {
        let mut params = Params::new();
        for record in records {
            self.encode_into(record, &mut params)?;
        }
        Ok(params)
    }
}

impl<R> Clone for TypedCodec<R> {
    fn clone(&self) -> Self {
        Self {
            codec: self.codec.clone(),
            _record: PhantomData,
        }
    }
}

impl<R> fmt::Debug for TypedCodec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedCodec")
            .field("record", &std::any::type_name::<R>())
            .field("codec", &self.codec)
            .finish()
    }
}
