use crate::value::{TypeInfo, Value};

/// Column metadata, independent of the backend's own catalog types.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
    pub type_info: TypeInfo,
}

/// An in-memory, fully-materialized result set. The real executor streams
/// rows off a live cursor rather than collecting them eagerly; this type is
/// what a [`crate::Serde`] impl actually serializes, whether it was
/// collected in one shot (tests, small results) or assembled batch-by-batch
/// from a streaming cursor.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<ColumnMeta>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }
}
