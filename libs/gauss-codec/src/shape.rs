use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BuildError;

// ════════════════════════════════════════════════════════════════
//  Shape
// ════════════════════════════════════════════════════════════════

/// Structural classification of a field.
///
/// At most one level of optionality: either the field is nullable
/// (`Optional`) or the elements of its sequence are (`OptionalSequence`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Scalar,
    Optional,
    Sequence,
    /// Sequence whose elements may be null.
    OptionalSequence,
}

impl Shape {
    pub fn is_sequence(self) -> bool {
        matches!(self, Shape::Sequence | Shape::OptionalSequence)
    }
}

// ════════════════════════════════════════════════════════════════
//  Semantic Type
// ════════════════════════════════════════════════════════════════

/// Shape plus the registry name of the scalar component.
///
/// Text form: `int8`, `int8?`, `int8[]`, `int8?[]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SemanticType {
    pub shape: Shape,
    pub scalar: String,
}

impl SemanticType {
    pub fn new(shape: Shape, scalar: impl Into<String>) -> Self {
        Self {
            shape,
            scalar: scalar.into(),
        }
    }

    pub fn scalar(scalar: impl Into<String>) -> Self {
        Self::new(Shape::Scalar, scalar)
    }

    pub fn optional(scalar: impl Into<String>) -> Self {
        Self::new(Shape::Optional, scalar)
    }

    pub fn sequence(scalar: impl Into<String>) -> Self {
        Self::new(Shape::Sequence, scalar)
    }

    pub fn optional_sequence(scalar: impl Into<String>) -> Self {
        Self::new(Shape::OptionalSequence, scalar)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shape {
            Shape::Scalar => write!(f, "{}", self.scalar),
            Shape::Optional => write!(f, "{}?", self.scalar),
            Shape::Sequence => write!(f, "{}[]", self.scalar),
            Shape::OptionalSequence => write!(f, "{}?[]", self.scalar),
        }
    }
}

impl FromStr for SemanticType {
    type Err = BuildError;

    /// Most specific suffix wins: `?[]`, then `[]`, then `?`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (shape, scalar) = if let Some(base) = s.strip_suffix("?[]") {
            (Shape::OptionalSequence, base)
        } else if let Some(base) = s.strip_suffix("[]") {
            (Shape::Sequence, base)
        } else if let Some(base) = s.strip_suffix('?') {
            (Shape::Optional, base)
        } else {
            (Shape::Scalar, s)
        };

        let valid = !scalar.is_empty()
            && scalar
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.'));
        if !valid {
            return Err(BuildError::InvalidType(s.to_string()));
        }
        Ok(Self::new(shape, scalar))
    }
}

impl TryFrom<String> for SemanticType {
    type Error = BuildError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SemanticType> for String {
    fn from(ty: SemanticType) -> Self {
        ty.to_string()
    }
}

// ════════════════════════════════════════════════════════════════
//  Field & RecordShape
// ════════════════════════════════════════════════════════════════

/// One field of a record. `position` is the declaration ordinal and the
/// column / parameter index in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub position: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SemanticType,
}

/// Ordered field layout of one record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordShape {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl RecordShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field; its position is the current field count.
    pub fn field(mut self, name: impl Into<String>, ty: SemanticType) -> Self {
        self.push(name, ty);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, ty: SemanticType) {
        self.fields.push(FieldDescriptor {
            position: self.fields.len(),
            name: name.into(),
            ty,
        });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Flat layout of several records side by side, e.g. one row of a join.
    ///
    /// Field names are kept; positions are renumbered across the parts.
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a RecordShape>) -> RecordShape {
        let mut names = Vec::new();
        let mut fields = Vec::new();
        for part in parts {
            names.push(part.name.as_str());
            for field in &part.fields {
                fields.push(FieldDescriptor {
                    position: fields.len(),
                    name: field.name.clone(),
                    ty: field.ty.clone(),
                });
            }
        }
        RecordShape {
            name: format!("({})", names.join(", ")),
            fields,
        }
    }

    /// Reject two fields with the same name.
    pub fn check_unique(&self) -> Result<(), BuildError> {
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(BuildError::DuplicateField {
                    record: self.name.clone(),
                    field: field.name.clone(),
                });
            }
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════
//  EnumShape
// ════════════════════════════════════════════════════════════════

/// Nullary constructors of one sum type, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumShape {
    pub name: String,
    pub constructors: Vec<String>,
}

impl EnumShape {
    pub fn new<I, S>(name: impl Into<String>, constructors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            constructors: constructors.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_picks_most_specific_shape() {
        assert_eq!(
            "int8?[]".parse::<SemanticType>(),
            Ok(SemanticType::optional_sequence("int8"))
        );
        assert_eq!(
            "int8[]".parse::<SemanticType>(),
            Ok(SemanticType::sequence("int8"))
        );
        assert_eq!(
            "int8?".parse::<SemanticType>(),
            Ok(SemanticType::optional("int8"))
        );
        assert_eq!(
            " text ".parse::<SemanticType>(),
            Ok(SemanticType::scalar("text"))
        );
    }

    #[test]
    fn parse_rejects_stacked_optionality() {
        for bad in ["int8??", "int8[]?", "int8[][]", "?", "[]", "int 8"] {
            assert!(bad.parse::<SemanticType>().is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn display_round_trips() {
        for text in ["uuid", "text?", "float8[]", "mood?[]"] {
            let ty: SemanticType = text.parse().unwrap();
            assert_eq!(ty.to_string(), text);
        }
    }

    #[test]
    fn concat_renumbers_positions() {
        let user = RecordShape::new("user")
            .field("id", SemanticType::scalar("int8"))
            .field("name", SemanticType::scalar("text"));
        let order = RecordShape::new("order").field("id", SemanticType::scalar("int8"));

        let joined = RecordShape::concat([&user, &order]);
        assert_eq!(joined.name(), "(user, order)");
        let positions: Vec<_> = joined.fields().iter().map(|f| f.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(joined.fields()[2].name, "id");
    }

    #[test]
    fn duplicate_fields_are_reported() {
        let shape = RecordShape::new("t")
            .field("a", SemanticType::scalar("int4"))
            .field("a", SemanticType::scalar("text"));
        assert_eq!(
            shape.check_unique(),
            Err(BuildError::DuplicateField {
                record: "t".into(),
                field: "a".into()
            })
        );
    }

    #[test]
    fn shape_is_deterministic() {
        let build = || RecordShape::new("p").field("x", SemanticType::optional("int4"));
        assert_eq!(build(), build());
    }
}
