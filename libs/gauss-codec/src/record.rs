use std::ops::Range;

use crate::error::{BuildError, DecodeError, EncodeError};
use crate::field::FieldCodec;
use crate::registry::CodecRegistry;
use crate::row::{ParamWriter, Params, RawRow, RowReader};
use crate::shape::RecordShape;
use crate::value::Value;

/// Codec for a whole record: one field codec per field, in field order.
///
/// Decoding consumes exactly `width()` columns; encoding appends exactly
/// `width()` parameters. Field codecs do not see each other's values.
///
/// A composite codec built with [`RecordCodec::concat`] decodes several
/// records from one row; `spans()` tells which columns belong to which.
#[derive(Debug, Clone)]
pub struct RecordCodec {
    shape: RecordShape,
    fields: Vec<FieldCodec>,
    spans: Vec<Range<usize>>,
}

impl RecordCodec {
    /// Resolve every field of `shape`.
    ///
    /// Fails with the first unregistered scalar type.
    pub fn derive(registry: &CodecRegistry, shape: &RecordShape) -> Result<Self, BuildError> {
        let fields = shape
            .fields()
            .iter()
            .map(|field| FieldCodec::resolve(registry, &field.ty))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(record = %shape.name(), fields = fields.len(), "record codec derived");

        Ok(Self {
            shape: shape.clone(),
            spans: vec![0..fields.len()],
            fields,
        })
    }

    /// Side-by-side composition, e.g. for one row of a join.
    ///
    /// Each part keeps its own contiguous span of columns. Parts that are
    /// themselves composite contribute all of their spans.
    pub fn concat(parts: impl IntoIterator<Item = RecordCodec>) -> Self {
        let parts: Vec<RecordCodec> = parts.into_iter().collect();
        let shape = RecordShape::concat(parts.iter().map(|p| &p.shape));

        let mut fields = Vec::with_capacity(shape.len());
        let mut spans = Vec::new();
        for part in parts {
            let offset = fields.len();
            spans.extend(
                part.spans
                    .iter()
                    .map(|span| span.start + offset..span.end + offset),
            );
            fields.extend(part.fields);
        }

        Self {
            shape,
            fields,
            spans,
        }
    }

    pub fn shape(&self) -> &RecordShape {
        &self.shape
    }

    pub fn fields(&self) -> &[FieldCodec] {
        &self.fields
    }

    /// Column count == parameter count == field count.
    pub fn width(&self) -> usize {
        self.fields.len()
    }

    pub fn spans(&self) -> &[Range<usize>] {
        &self.spans
    }

    // ═══════════════════════════════════════════════════════════════
    //  Decode
    // ═══════════════════════════════════════════════════════════════

    /// Decode the next `width()` columns of `reader`, all or nothing.
    pub fn decode(&self, reader: &mut dyn RowReader) -> Result<Vec<Value>, DecodeError> {
        let mut values = Vec::with_capacity(self.fields.len());
        for (codec, field) in self.fields.iter().zip(self.shape.fields()) {
            let value = codec
                .decode(reader)
                .map_err(|e| e.in_field(field.position, &field.name))?;
            values.push(value);
        }
        tracing::trace!(record = %self.shape.name(), "row decoded");
        Ok(values)
    }

    /// Decode a whole row; its width must match the field count.
    pub fn decode_row(&self, row: &RawRow) -> Result<Vec<Value>, DecodeError> {
        if row.len() != self.width() {
            return Err(DecodeError::ColumnCount {
                expected: self.width(),
                found: row.len(),
            });
        }
        self.decode(&mut row.cursor())
    }

    /// Decode and split the values by span: one `Vec` per part.
    pub fn decode_parts(&self, reader: &mut dyn RowReader) -> Result<Vec<Vec<Value>>, DecodeError> {
        let values = self.decode(reader)?;
        Ok(self.split(values))
    }

    fn split(&self, values: Vec<Value>) -> Vec<Vec<Value>> {
        let mut values = values.into_iter();
        self.spans
            .iter()
            .map(|span| values.by_ref().take(span.len()).collect())
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════
    //  Encode
    // ═══════════════════════════════════════════════════════════════

    /// Append one parameter per field, in field order.
    ///
    /// All or nothing: on error `writer` is left as it was.
    pub fn encode_into(
        &self,
        values: &[Value],
        writer: &mut dyn ParamWriter,
    ) -> Result<(), EncodeError> {
        for param in self.encode(values)?.into_inner() {
            writer.push(param.oid, param.value);
        }
        Ok(())
    }

    pub fn encode(&self, values: &[Value]) -> Result<Params, EncodeError> {
        if values.len() != self.width() {
            return Err(EncodeError::ValueCount {
                expected: self.width(),
                found: values.len(),
            });
        }
        let mut params = Params::with_capacity(self.width());
        for ((codec, field), value) in self.fields.iter().zip(self.shape.fields()).zip(values) {
            codec
                .encode(value, &mut params)
                .map_err(|e| e.in_field(field.position, &field.name))?;
        }
        Ok(params)
    }

    /// Flat parameter list for several rows, e.g. a multi-row `VALUES`.
    pub fn encode_batch<I, R>(&self, rows: I) -> Result<Params, EncodeError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[Value]>,
    {
        let mut params = Params::new();
        let mut count = 0usize;
        for row in rows {
            self.encode_into(row.as_ref(), &mut params)?;
            count += 1;
        }
        tracing::trace!(record = %self.shape.name(), rows = count, "batch encoded");
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::RowCursor;
    use crate::shape::SemanticType;

    fn registry() -> CodecRegistry {
        CodecRegistry::with_builtins()
    }

    fn user_shape() -> RecordShape {
        RecordShape::new("user")
            .field("id", SemanticType::scalar("int8"))
            .field("name", SemanticType::scalar("text"))
            .field("email", SemanticType::optional("text"))
    }

    fn user(id: i64, name: &str, email: Option<&str>) -> Vec<Value> {
        vec![
            Value::Int8(id),
            Value::Text(name.into()),
            email.map_or(Value::Null, |e| Value::Text(e.into())),
        ]
    }

    #[test]
    fn unregistered_field_type_fails_derivation() {
        let shape = user_shape().field("balance", SemanticType::scalar("money"));
        assert_eq!(
            RecordCodec::derive(&registry(), &shape).unwrap_err(),
            BuildError::Unregistered("money".into())
        );
    }

    #[test]
    fn encode_is_one_param_per_field_in_order() {
        let codec = RecordCodec::derive(&registry(), &user_shape()).unwrap();
        let params = codec.encode(&user(7, "ann", None)).unwrap();

        assert_eq!(params.len(), codec.width());
        assert_eq!(params.oids(), vec![20, 25, 25]);
        let values: Vec<_> = params.iter().map(|p| p.value.clone()).collect();
        assert_eq!(
            values,
            vec![Some(7i64.to_be_bytes().to_vec()), Some(b"ann".to_vec()), None]
        );
    }

    #[test]
    fn round_trip() {
        let codec = RecordCodec::derive(&registry(), &user_shape()).unwrap();
        for values in [user(1, "ann", Some("a@x.io")), user(-5, "", None)] {
            let row = RawRow::from(codec.encode(&values).unwrap());
            assert_eq!(codec.decode_row(&row), Ok(values));
        }
    }

    #[test]
    fn decode_consumes_exactly_width_columns() {
        let codec = RecordCodec::derive(&registry(), &user_shape()).unwrap();
        let mut columns = RawRow::from(codec.encode(&user(1, "a", None)).unwrap())
            .columns()
            .to_vec();
        columns.push(Some(b"extra".to_vec()));

        let mut cursor = RowCursor::new(&columns);
        codec.decode(&mut cursor).unwrap();
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.remaining(), 1);

        let err = codec.decode_row(&RawRow::new(columns.clone())).unwrap_err();
        assert_eq!(err, DecodeError::ColumnCount { expected: 3, found: 4 });
    }

    #[test]
    fn short_row_reports_end_of_row_with_field() {
        let codec = RecordCodec::derive(&registry(), &user_shape()).unwrap();
        let columns = vec![Some(1i64.to_be_bytes().to_vec())];
        let err = codec.decode(&mut RowCursor::new(&columns)).unwrap_err();
        assert_eq!(err.field_position(), Some(1));
        assert_eq!(err.root(), &DecodeError::EndOfRow { position: 1 });
    }

    #[test]
    fn null_in_required_field_names_the_field() {
        let codec = RecordCodec::derive(&registry(), &user_shape()).unwrap();
        let row = RawRow::new(vec![Some(1i64.to_be_bytes().to_vec()), None, None]);
        let err = codec.decode_row(&row).unwrap_err();
        assert_eq!(err, DecodeError::UnexpectedNull.in_field(1, "name"));
    }

    #[test]
    fn wrong_value_count_is_rejected() {
        let codec = RecordCodec::derive(&registry(), &user_shape()).unwrap();
        assert_eq!(
            codec.encode(&[Value::Int8(1)]),
            Err(EncodeError::ValueCount { expected: 3, found: 1 })
        );
    }

    #[test]
    fn failed_encode_leaves_writer_untouched() {
        let codec = RecordCodec::derive(&registry(), &user_shape()).unwrap();
        let mut params = codec.encode(&user(1, "ann", None)).unwrap();

        let bad = vec![Value::Int8(2), Value::Null, Value::Null];
        let err = codec.encode_into(&bad, &mut params).unwrap_err();
        assert_eq!(err, EncodeError::UnexpectedNull.in_field(1, "name"));
        assert_eq!(params.len(), 3);

        codec.encode_into(&user(3, "bo", None), &mut params).unwrap();
        let rows = RawRow::from(params).chunks(codec.width());
        assert_eq!(rows.len(), 2);
        assert_eq!(codec.decode_row(&rows[1]), Ok(user(3, "bo", None)));
    }

    #[test]
    fn composite_decodes_each_part_from_its_span() {
        let order_shape = RecordShape::new("order")
            .field("id", SemanticType::scalar("int8"))
            .field("items", SemanticType::sequence("text"));
        let users = RecordCodec::derive(&registry(), &user_shape()).unwrap();
        let orders = RecordCodec::derive(&registry(), &order_shape).unwrap();

        let u = user(1, "ann", None);
        let o = vec![
            Value::Int8(10),
            Value::Array(vec![Value::Text("pen".into()), Value::Text("ink".into())]),
        ];
        let mut columns = RawRow::from(users.encode(&u).unwrap()).columns().to_vec();
        columns.extend(RawRow::from(orders.encode(&o).unwrap()).columns().to_vec());

        let joined = RecordCodec::concat([users, orders]);
        assert_eq!(joined.width(), 5);
        assert_eq!(joined.spans(), &[0..3, 3..5]);

        let parts = joined.decode_parts(&mut RowCursor::new(&columns)).unwrap();
        assert_eq!(parts, vec![u, o]);
    }

    #[test]
    fn nested_concat_flattens_spans() {
        let one = RecordShape::new("one").field("v", SemanticType::scalar("int4"));
        let a = RecordCodec::derive(&registry(), &one).unwrap();
        let ab = RecordCodec::concat([a.clone(), a.clone()]);
        let abc = RecordCodec::concat([ab, a]);
        assert_eq!(abc.spans(), &[0..1, 1..2, 2..3]);
        assert_eq!(abc.shape().fields()[2].position, 2);
    }

    #[test]
    fn batch_appends_rows_in_order() {
        let codec = RecordCodec::derive(&registry(), &user_shape()).unwrap();
        let rows = [user(1, "a", None), user(2, "b", Some("b@x"))];
        let params = codec.encode_batch(&rows).unwrap();
        assert_eq!(params.len(), 6);

        let decoded: Vec<_> = RawRow::from(params)
            .chunks(codec.width())
            .iter()
            .map(|row| codec.decode_row(row).unwrap())
            .collect();
        assert_eq!(decoded, rows);
    }

    #[test]
    fn codec_is_shared_across_threads() {
        let codec = RecordCodec::derive(&registry(), &user_shape()).unwrap();
        std::thread::scope(|s| {
            for id in 0..4 {
                let codec = &codec;
                s.spawn(move || {
                    let values = user(id, "t", None);
                    let row = RawRow::from(codec.encode(&values).unwrap());
                    assert_eq!(codec.decode_row(&row).unwrap(), values);
                });
            }
        });
    }
}
