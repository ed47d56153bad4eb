use std::collections::HashMap;

use crate::error::{BuildError, DecodeError, EncodeError};
use crate::registry::ScalarCodec;
use crate::shape::EnumShape;
use crate::value::Value;

/// Sum type with only nullary constructors, stored as a text label.
///
/// Usually implemented with `#[derive(Enum)]`. `LABELS[i]` is the label
/// of the constructor with tag `i`.
pub trait Enum: Sized + 'static {
    /// Registry name of the enum type.
    const TYPE_NAME: &'static str;
    const LABELS: &'static [&'static str];
    const CONSTRUCTORS: &'static [&'static str];

    fn from_tag(tag: usize) -> Option<Self>;

    fn tag(&self) -> usize;

    fn shape() -> EnumShape {
        EnumShape::new(Self::TYPE_NAME, Self::CONSTRUCTORS.iter().copied())
    }
}

/// Convert a decoded enum value back into `E`.
///
/// Accepts the tag produced by an [`EnumCodec`] or a raw label.
pub fn enum_from_value<E: Enum>(value: Value) -> Result<E, DecodeError> {
    match value {
        Value::Enum(tag) => {
            E::from_tag(tag).ok_or_else(|| DecodeError::out_of_range(tag, E::TYPE_NAME))
        }
        Value::Text(label) => E::LABELS
            .iter()
            .position(|l| *l == label)
            .and_then(E::from_tag)
            .ok_or(DecodeError::UnknownLabel {
                name: E::TYPE_NAME.to_string(),
                label,
            }),
        Value::Null => Err(DecodeError::UnexpectedNull),
        other => Err(DecodeError::mismatch(E::TYPE_NAME, other.kind())),
    }
}

// ════════════════════════════════════════════════════════════════
//  Label Table
// ════════════════════════════════════════════════════════════════

/// Bijection between constructor tags and labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    name: String,
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelTable {
    /// Pair `labels` with the constructors of `shape`, in order.
    ///
    /// The counts must match and labels must be distinct.
    pub fn new<I, S>(labels: I, shape: &EnumShape) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.len() != shape.constructors.len() {
            return Err(BuildError::LabelCount {
                name: shape.name.clone(),
                labels: labels.len(),
                constructors: shape.constructors.len(),
            });
        }

        let mut index = HashMap::with_capacity(labels.len());
        for (tag, label) in labels.iter().enumerate() {
            if index.insert(label.clone(), tag).is_some() {
                return Err(BuildError::DuplicateLabel {
                    name: shape.name.clone(),
                    label: label.clone(),
                });
            }
        }

        Ok(Self {
            name: shape.name.clone(),
            labels,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Tag of `label`. Exact, case-sensitive match.
    pub fn tag(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Like [`LabelTable::tag`], but an unknown label is a decode failure.
    pub fn decode_label(&self, label: &str) -> Result<usize, DecodeError> {
        self.tag(label).ok_or_else(|| DecodeError::UnknownLabel {
            name: self.name.clone(),
            label: label.to_string(),
        })
    }

    pub fn label(&self, tag: usize) -> Option<&str> {
        self.labels.get(tag).map(String::as_str)
    }
}

// ════════════════════════════════════════════════════════════════
//  Enum Codec
// ════════════════════════════════════════════════════════════════

/// Scalar codec of one enum type: a text column holding a label,
/// decoded to `Value::Enum(tag)`.
///
/// Enum type OIDs are assigned per database, so they default to 0 until
/// the caller supplies them with [`EnumCodec::with_oids`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumCodec {
    table: LabelTable,
    oid: u32,
    array_oid: u32,
}

impl EnumCodec {
    pub fn derive<I, S>(labels: I, shape: &EnumShape) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table = LabelTable::new(labels, shape)?;
        tracing::debug!(
            enum_name = %table.name(),
            labels = table.len(),
            "enum codec derived"
        );
        Ok(Self::from_table(table))
    }

    /// Codec for a Rust enum implementing [`Enum`].
    pub fn of<E: Enum>() -> Result<Self, BuildError> {
        Self::derive(E::LABELS.iter().copied(), &E::shape())
    }

    pub fn from_table(table: LabelTable) -> Self {
        Self {
            table,
            oid: 0,
            array_oid: 0,
        }
    }

    /// Use the OIDs the server assigned to the enum type and its array type.
    pub fn with_oids(mut self, oid: u32, array_oid: u32) -> Self {
        self.oid = oid;
        self.array_oid = array_oid;
        self
    }

    pub fn table(&self) -> &LabelTable {
        &self.table
    }
}

impl ScalarCodec for EnumCodec {
    fn type_name(&self) -> &str {
        self.table.name()
    }

    fn oid(&self) -> u32 {
        self.oid
    }

    fn array_oid(&self) -> u32 {
        self.array_oid
    }

    fn decode(&self, raw: &[u8]) -> Result<Value, DecodeError> {
        let label = std::str::from_utf8(raw)
            .map_err(|e| DecodeError::malformed(self.table.name(), e))?;
        self.table.decode_label(label).map(Value::Enum)
    }

    fn encode(&self, value: &Value, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        let label = match value {
            Value::Enum(tag) => self
                .table
                .label(*tag)
                .ok_or_else(|| EncodeError::out_of_range(tag, self.table.name()))?,
            Value::Text(label) if self.table.tag(label).is_some() => label.as_str(),
            Value::Text(label) => {
                return Err(EncodeError::unrepresentable(
                    self.table.name(),
                    format!("label '{label}'"),
                ));
            }
            Value::Null => return Err(EncodeError::UnexpectedNull),
            other => return Err(EncodeError::mismatch(self.table.name(), other.kind())),
        };
        out.extend_from_slice(label.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Level {
        Low,
        Mid,
        High,
    }

    impl Enum for Level {
        const TYPE_NAME: &'static str = "level";
        const LABELS: &'static [&'static str] = &["a", "b", "c"];
        const CONSTRUCTORS: &'static [&'static str] = &["Low", "Mid", "High"];

        fn from_tag(tag: usize) -> Option<Self> {
            match tag {
                0 => Some(Level::Low),
                1 => Some(Level::Mid),
                2 => Some(Level::High),
                _ => None,
            }
        }

        fn tag(&self) -> usize {
            match self {
                Level::Low => 0,
                Level::Mid => 1,
                Level::High => 2,
            }
        }
    }

    #[test]
    fn labels_map_to_constructors_in_order() {
        let codec = EnumCodec::of::<Level>().unwrap();
        assert_eq!(codec.decode(b"b"), Ok(Value::Enum(1)));
        assert_eq!(enum_from_value::<Level>(Value::Enum(1)), Ok(Level::Mid));

        let mut out = Vec::new();
        codec.encode(&Value::Enum(Level::High.tag()), &mut out).unwrap();
        assert_eq!(out, b"c");
    }

    #[test]
    fn label_count_must_match() {
        let shape = Level::shape();
        assert_eq!(
            LabelTable::new(["a", "b"], &shape),
            Err(BuildError::LabelCount {
                name: "level".into(),
                labels: 2,
                constructors: 3,
            })
        );
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        assert_eq!(
            LabelTable::new(["a", "b", "a"], &Level::shape()),
            Err(BuildError::DuplicateLabel {
                name: "level".into(),
                label: "a".into(),
            })
        );
    }

    #[test]
    fn unknown_label_is_reported_verbatim() {
        let codec = EnumCodec::of::<Level>().unwrap();
        assert_eq!(
            codec.decode(b"d"),
            Err(DecodeError::UnknownLabel {
                name: "level".into(),
                label: "d".into(),
            })
        );
        // Case-sensitive.
        assert!(codec.decode(b"A").is_err());
        assert_eq!(codec.table().tag("A"), None);
        assert_eq!(codec.table().tag("c"), Some(2));
    }

    #[test]
    fn text_value_encodes_when_label_is_known() {
        let codec = EnumCodec::of::<Level>().unwrap();
        let mut out = Vec::new();
        codec.encode(&Value::Text("a".into()), &mut out).unwrap();
        assert_eq!(out, b"a");

        let err = codec.encode(&Value::Text("z".into()), &mut Vec::new()).unwrap_err();
        assert!(matches!(err, EncodeError::Unrepresentable { .. }));
    }

    #[test]
    fn out_of_range_tag_fails() {
        let codec = EnumCodec::of::<Level>().unwrap();
        assert!(matches!(
            codec.encode(&Value::Enum(7), &mut Vec::new()),
            Err(EncodeError::OutOfRange { .. })
        ));
        assert!(enum_from_value::<Level>(Value::Enum(7)).is_err());
    }

    #[test]
    fn supplied_oids_reach_params_and_array_header() {
        use crate::field::FieldCodec;
        use crate::registry::CodecRegistry;
        use crate::row::Params;
        use crate::shape::SemanticType;

        let unset = EnumCodec::of::<Level>().unwrap();
        assert_eq!((unset.oid(), unset.array_oid()), (0, 0));

        let mut registry = CodecRegistry::with_builtins();
        registry.register(std::sync::Arc::new(
            EnumCodec::of::<Level>().unwrap().with_oids(16_390, 16_389),
        ));
        let field = FieldCodec::resolve(&registry, &SemanticType::sequence("level")).unwrap();

        let mut params = Params::new();
        field
            .encode(&Value::Array(vec![Value::Enum(0), Value::Enum(2)]), &mut params)
            .unwrap();
        let param = params.iter().next().unwrap();
        assert_eq!(param.oid, 16_389);
        let header = param.value.as_deref().unwrap();
        assert_eq!(&header[8..12], &16_390u32.to_be_bytes());
    }

    #[test]
    fn empty_enum_has_empty_table() {
        let shape = EnumShape::new("never", Vec::<String>::new());
        let table = LabelTable::new(Vec::<String>::new(), &shape).unwrap();
        assert!(table.is_empty());
        assert!(table.decode_label("").is_err());
    }
}
