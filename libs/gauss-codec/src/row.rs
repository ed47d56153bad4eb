use crate::error::DecodeError;

// ════════════════════════════════════════════════════════════════
//  Reader / Writer seams
// ════════════════════════════════════════════════════════════════

/// Sequential access to the columns of one result row.
///
/// Implemented by whatever owns the row bytes (a driver's data row, an
/// in-memory `RawRow`, a spill file). Codecs only pull columns in order.
pub trait RowReader {
    /// Next column in the row. `None` is the null marker.
    ///
    /// Fails with `EndOfRow` once all columns are consumed.
    fn next_column(&mut self) -> Result<Option<&[u8]>, DecodeError>;

    /// Index of the column `next_column` will return.
    fn position(&self) -> usize;
}

/// Sequential sink for query parameters.
pub trait ParamWriter {
    /// Append one parameter. `oid` is the wire type OID, `0` if unknown;
    /// `None` is the null marker.
    fn push(&mut self, oid: u32, value: Option<Vec<u8>>);
}

// ════════════════════════════════════════════════════════════════
//  RawRow
// ════════════════════════════════════════════════════════════════

/// One row of raw column values, owned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    columns: Vec<Option<Vec<u8>>>,
}

impl RawRow {
    pub fn new(columns: Vec<Option<Vec<u8>>>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Option<Vec<u8>>] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn cursor(&self) -> RowCursor<'_> {
        RowCursor::new(&self.columns)
    }

    /// Split a flat column list into rows of `width` columns.
    ///
    /// A trailing partial row is kept as-is so the caller's decode reports
    /// the column count mismatch.
    pub fn chunks(self, width: usize) -> Vec<RawRow> {
        if width == 0 {
            return Vec::new();
        }
        self.columns
            .chunks(width)
            .map(|chunk| RawRow::new(chunk.to_vec()))
            .collect()
    }
}

impl FromIterator<Option<Vec<u8>>> for RawRow {
    fn from_iter<I: IntoIterator<Item = Option<Vec<u8>>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Parameters read back as a row. Handy for round-trips and for stores
/// that echo parameters (e.g. `INSERT ... RETURNING` of the same shape).
impl From<Params> for RawRow {
    fn from(params: Params) -> Self {
        params.params.into_iter().map(|p| p.value).collect()
    }
}

/// Cursor over borrowed columns.
#[derive(Debug, Clone)]
pub struct RowCursor<'a> {
    columns: &'a [Option<Vec<u8>>],
    position: usize,
}

impl<'a> RowCursor<'a> {
    pub fn new(columns: &'a [Option<Vec<u8>>]) -> Self {
        Self {
            columns,
            position: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.columns.len().saturating_sub(self.position)
    }
}

impl RowReader for RowCursor<'_> {
    fn next_column(&mut self) -> Result<Option<&[u8]>, DecodeError> {
        let column = self
            .columns
            .get(self.position)
            .ok_or(DecodeError::EndOfRow {
                position: self.position,
            })?;
        self.position += 1;
        Ok(column.as_deref())
    }

    fn position(&self) -> usize {
        self.position
    }
}

// ════════════════════════════════════════════════════════════════
//  Params
// ════════════════════════════════════════════════════════════════

/// One encoded query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub oid: u32,
    pub value: Option<Vec<u8>>,
}

impl Param {
    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }
}

/// Ordered parameter list for one statement execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    params: Vec<Param>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            params: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Param> {
        self.params.iter()
    }

    /// Parameter type OIDs, in order. What a `Parse` message declares.
    pub fn oids(&self) -> Vec<u32> {
        self.params.iter().map(|p| p.oid).collect()
    }

    pub fn into_inner(self) -> Vec<Param> {
        self.params
    }
}

impl ParamWriter for Params {
    fn push(&mut self, oid: u32, value: Option<Vec<u8>>) {
        self.params.push(Param { oid, value });
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}
