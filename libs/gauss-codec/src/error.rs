use std::fmt;

/// Failure while building a codec. Raised once, never per row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("no codec registered for scalar type '{0}'")]
    Unregistered(String),

    #[error("enum '{name}': {labels} labels for {constructors} constructors")]
    LabelCount {
        name: String,
        labels: usize,
        constructors: usize,
    },

    #[error("enum '{name}': duplicate label '{label}'")]
    DuplicateLabel { name: String, label: String },

    #[error("record '{record}': duplicate field '{field}'")]
    DuplicateField { record: String, field: String },

    #[error("invalid semantic type '{0}'")]
    InvalidType(String),

    #[error("config error: {0}")]
    Config(String),
}

impl BuildError {
    /// Add context to the error.
    ///
    /// Only `Config` carries free text; other variants are returned as-is.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        match self {
            BuildError::Config(msg) => BuildError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}

/// Failure while decoding one row.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("unexpected null")]
    UnexpectedNull,

    #[error("expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("unknown label '{label}' for enum '{name}'")]
    UnknownLabel { name: String, label: String },

    #[error("row ended before column {position}")]
    EndOfRow { position: usize },

    #[error("row has {found} columns, expected {expected}")]
    ColumnCount { expected: usize, found: usize },

    #[error("malformed {type_name} value: {reason}")]
    Malformed { type_name: String, reason: String },

    #[error("value {value} out of range for {target}")]
    OutOfRange { value: String, target: String },

    #[error("element {index}: {source}")]
    Element {
        index: usize,
        source: Box<DecodeError>,
    },

    #[error("field {position} '{name}': {source}")]
    Field {
        position: usize,
        name: String,
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    pub fn malformed(type_name: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Malformed {
            type_name: type_name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn out_of_range(value: impl fmt::Display, target: impl Into<String>) -> Self {
        Self::OutOfRange {
            value: value.to_string(),
            target: target.into(),
        }
    }

    /// Attach the position and name of the field being decoded.
    pub fn in_field(self, position: usize, name: impl Into<String>) -> Self {
        Self::Field {
            position,
            name: name.into(),
            source: Box::new(self),
        }
    }

    /// Attach the index of the sequence element being decoded.
    pub fn in_element(self, index: usize) -> Self {
        Self::Element {
            index,
            source: Box::new(self),
        }
    }

    /// Position of the outermost field this error was raised in.
    pub fn field_position(&self) -> Option<usize> {
        match self {
            DecodeError::Field { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// Innermost cause, with field and element context stripped.
    pub fn root(&self) -> &DecodeError {
        match self {
            DecodeError::Field { source, .. } | DecodeError::Element { source, .. } => {
                source.root()
            }
            other => other,
        }
    }
}

/// Failure while encoding a value into parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodeError {
    #[error("unexpected null")]
    UnexpectedNull,

    #[error("expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("value {value} out of range for {target}")]
    OutOfRange { value: String, target: String },

    #[error("{type_name} cannot represent value: {reason}")]
    Unrepresentable { type_name: String, reason: String },

    #[error("got {found} values for {expected} fields")]
    ValueCount { expected: usize, found: usize },

    #[error("element {index}: {source}")]
    Element {
        index: usize,
        source: Box<EncodeError>,
    },

    #[error("field {position} '{name}': {source}")]
    Field {
        position: usize,
        name: String,
        source: Box<EncodeError>,
    },
}

impl EncodeError {
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn out_of_range(value: impl fmt::Display, target: impl Into<String>) -> Self {
        Self::OutOfRange {
            value: value.to_string(),
            target: target.into(),
        }
    }

    pub fn unrepresentable(type_name: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Unrepresentable {
            type_name: type_name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn in_field(self, position: usize, name: impl Into<String>) -> Self {
        Self::Field {
            position,
            name: name.into(),
            source: Box::new(self),
        }
    }

    pub fn in_element(self, index: usize) -> Self {
        Self::Element {
            index,
            source: Box::new(self),
        }
    }

    pub fn root(&self) -> &EncodeError {
        match self {
            EncodeError::Field { source, .. } | EncodeError::Element { source, .. } => {
                source.root()
            }
            other => other,
        }
    }
}
