use chrono::NaiveDate;
use gauss_codec::{
    BuildError, CodecRegistry, DecodeError, EncodeError, Enum, Params, RawRow, Record, RowCursor,
    Scalar, SemanticType, Shape, TypedCodec, Value,
};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Enum)]
#[codec(name = "level", labels = ["a", "b", "c"])]
enum Level {
    Low,
    Mid,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Enum)]
enum AccountState {
    Active,
    #[codec(label = "on-hold")]
    OnHold,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Record)]
#[codec(name = "users")]
struct User {
    id: i64,
    name: String,
    email: Option<String>,
    tags: Vec<String>,
    scores: Vec<Option<i32>>,
    avatar: Vec<u8>,
    level: Level,
    state: Option<AccountState>,
}

#[derive(Debug, Clone, PartialEq, Record)]
struct OrderLine {
    #[codec(name = "order_id")]
    id: Uuid,
    quantity: u32,
    shipped: Option<NaiveDate>,
    #[codec(scalar = "json")]
    meta: serde_json::Value,
}

fn registry() -> CodecRegistry {
    let mut registry = CodecRegistry::with_builtins();
    registry.register_enum::<Level>().unwrap();
    registry.register_enum::<AccountState>().unwrap();
    registry
}

fn sample_user() -> User {
    User {
        id: 42,
        name: "ann".into(),
        email: Some("ann@example.com".into()),
        tags: vec!["admin".into(), "ops".into()],
        scores: vec![Some(3), None, Some(9)],
        avatar: vec![0xde, 0xad],
        level: Level::Mid,
        state: None,
    }
}

fn sample_line() -> OrderLine {
    OrderLine {
        id: Uuid::from_u128(7),
        quantity: 3,
        shipped: NaiveDate::from_ymd_opt(2024, 2, 29),
        meta: serde_json::json!({ "gift": true }),
    }
}

#[test]
fn shape_follows_declaration_order_and_field_types() {
    let shape = User::shape();
    assert_eq!(shape.name(), "users");

    let fields: Vec<(usize, &str, String)> = shape
        .fields()
        .iter()
        .map(|f| (f.position, f.name.as_str(), f.ty.to_string()))
        .collect();
    assert_eq!(
        fields,
        vec![
            (0, "id", "int8".to_string()),
            (1, "name", "text".to_string()),
            (2, "email", "text?".to_string()),
            (3, "tags", "text[]".to_string()),
            (4, "scores", "int4?[]".to_string()),
            (5, "avatar", "bytea".to_string()),
            (6, "level", "level".to_string()),
            (7, "state", "account_state?".to_string()),
        ]
    );
}

#[test]
fn field_attributes_rename_and_override_scalar() {
    let shape = OrderLine::shape();
    assert_eq!(shape.name(), "order_line");
    assert_eq!(shape.fields()[0].name, "order_id");
    assert_eq!(shape.fields()[1].ty, SemanticType::scalar("int8"));
    assert_eq!(shape.fields()[2].ty.shape, Shape::Optional);
    assert_eq!(shape.fields()[3].ty, SemanticType::scalar("json"));
}

#[test]
fn record_round_trips_through_params() {
    let codec = TypedCodec::<User>::derive(&registry()).unwrap();
    let user = sample_user();

    let params = codec.encode(&user).unwrap();
    assert_eq!(params.len(), 8);
    assert_eq!(codec.decode_row(&RawRow::from(params)).unwrap(), user);

    let line_codec = TypedCodec::<OrderLine>::derive(&registry()).unwrap();
    let line = sample_line();
    let row = RawRow::from(line_codec.encode(&line).unwrap());
    assert_eq!(line_codec.decode_row(&row).unwrap(), line);
}

#[test]
fn absent_optional_encodes_as_null_marker() {
    let codec = TypedCodec::<User>::derive(&registry()).unwrap();
    let params = codec.encode(&sample_user()).unwrap();
    let state = params.iter().nth(7).unwrap();
    assert!(state.is_null());
}

#[test]
fn enum_uses_declared_labels() {
    assert_eq!(Level::LABELS, &["a", "b", "c"]);
    assert_eq!(<AccountState as Enum>::TYPE_NAME, "account_state");
    assert_eq!(AccountState::LABELS, &["active", "on-hold", "closed"]);
    assert_eq!(<Level as Scalar>::TYPE_NAME, "level");

    let codec = TypedCodec::<User>::derive(&registry()).unwrap();
    let params = codec.encode(&sample_user()).unwrap();
    let level = params.iter().nth(6).unwrap();
    assert_eq!(level.value.as_deref(), Some(&b"b"[..]));
}

#[test]
fn unknown_label_fails_decode_with_field() {
    let codec = TypedCodec::<User>::derive(&registry()).unwrap();
    let mut columns = RawRow::from(codec.encode(&sample_user()).unwrap())
        .columns()
        .to_vec();
    columns[6] = Some(b"d".to_vec());

    let err = codec.decode_row(&RawRow::new(columns)).unwrap_err();
    assert_eq!(err.field_position(), Some(6));
    assert_eq!(
        err.root(),
        &DecodeError::UnknownLabel {
            name: "level".into(),
            label: "d".into(),
        }
    );
}

#[test]
fn null_in_required_column_fails_decode() {
    let codec = TypedCodec::<User>::derive(&registry()).unwrap();
    let mut columns = RawRow::from(codec.encode(&sample_user()).unwrap())
        .columns()
        .to_vec();
    columns[1] = None;

    let err = codec.decode_row(&RawRow::new(columns)).unwrap_err();
    assert_eq!(err, DecodeError::UnexpectedNull.in_field(1, "name"));
}

#[test]
fn missing_enum_registration_fails_derivation() {
    let err = TypedCodec::<User>::derive(&CodecRegistry::with_builtins()).unwrap_err();
    assert_eq!(err, BuildError::Unregistered("level".into()));
}

#[test]
fn unsigned_overflow_fails_encode() {
    #[derive(Debug, Record)]
    struct Counter {
        hits: u64,
    }

    let codec = TypedCodec::<Counter>::derive(&registry()).unwrap();
    assert!(codec.encode(&Counter { hits: 5 }).is_ok());
    let err = codec.encode(&Counter { hits: u64::MAX }).unwrap_err();
    assert!(matches!(err.root(), EncodeError::OutOfRange { .. }));
}

#[test]
fn composite_decodes_both_records_from_one_row() {
    let registry = registry();
    let codec = TypedCodec::<(User, OrderLine)>::derive(&registry).unwrap();
    assert_eq!(codec.width(), 12);
    assert_eq!(codec.record_codec().spans(), &[0..8, 8..12]);
    assert_eq!(codec.shape().fields()[8].name, "order_id");
    assert_eq!(codec.shape().fields()[8].position, 8);

    let pair = (sample_user(), sample_line());
    let row = RawRow::from(codec.encode(&pair).unwrap());
    assert_eq!(codec.decode_row(&row).unwrap(), pair);

    // Same columns decoded part by part.
    let users = TypedCodec::<User>::derive(&registry).unwrap();
    let lines = TypedCodec::<OrderLine>::derive(&registry).unwrap();
    let mut cursor = RowCursor::new(row.columns());
    assert_eq!(users.decode(&mut cursor).unwrap(), pair.0);
    assert_eq!(lines.decode(&mut cursor).unwrap(), pair.1);
    assert_eq!(cursor.remaining(), 0);
}

#[test]
fn batch_encoding_concatenates_rows() {
    let codec = TypedCodec::<OrderLine>::derive(&registry()).unwrap();
    let mut second = sample_line();
    second.quantity = 9;
    second.shipped = None;
    let lines = vec![sample_line(), second];

    let params: Params = codec.encode_batch(&lines).unwrap();
    assert_eq!(params.len(), 8);

    let decoded: Vec<OrderLine> = RawRow::from(params)
        .chunks(codec.width())
        .iter()
        .map(|row| codec.decode_row(row).unwrap())
        .collect();
    assert_eq!(decoded, lines);
}

#[test]
fn dynamic_values_match_typed_encoding() {
    let registry = registry();
    let typed = TypedCodec::<OrderLine>::derive(&registry).unwrap();
    let line = sample_line();

    let values = typed
        .record_codec()
        .decode_row(&RawRow::from(typed.encode(&line).unwrap()))
        .unwrap();
    assert_eq!(values[1], Value::Int8(3));
    assert_eq!(values[0], Value::Uuid(Uuid::from_u128(7)));
}

#[test]
fn codec_is_shared_between_threads() {
    let codec = TypedCodec::<User>::derive(&registry()).unwrap();
    std::thread::scope(|s| {
        for id in 0..8 {
            let codec = &codec;
            s.spawn(move || {
                let mut user = sample_user();
                user.id = id;
                let row = RawRow::from(codec.encode(&user).unwrap());
                assert_eq!(codec.decode_row(&row).unwrap(), user);
            });
        }
    });
}

#[test]
fn failed_record_leaves_batch_params_intact() {
    #[derive(Debug, Record)]
    struct Reading {
        id: i64,
        #[codec(scalar = "int2")]
        level: Option<i64>,
    }

    let codec = TypedCodec::<Reading>::derive(&registry()).unwrap();
    let mut params = codec.encode(&Reading { id: 1, level: None }).unwrap();

    // int8 value for an int2 column fails in the second field.
    let err = codec
        .encode_into(&Reading { id: 2, level: Some(3) }, &mut params)
        .unwrap_err();
    assert!(matches!(err, EncodeError::Field { position: 1, .. }));
    assert_eq!(params.len(), 2);
}
