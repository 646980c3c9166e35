//! Persistence gateway.
//!
//! The ledger never talks to a concrete backend. Every engine reads and
//! writes through [`TableStore`], a narrow row/cell interface modelled on a
//! spreadsheet: named tables with a header row, rows addressed by position
//! and located by an id column, plus a small key/value area for admin
//! watermarks.
//!
//! The gateway offers no transactions. [`TableStore::update_cells`] makes no
//! atomicity promise across its updates, and callers that need one write per
//! row use [`TableStore::update_single_cell`] instead.

pub mod cache;
pub mod memory;
pub mod schema;

use serde_json::Value;
use thiserror::Error;

pub use cache::CachedStore;
pub use memory::InMemoryStore;

/// a row as a column-name to cell-value mapping
pub type Row = serde_json::Map<String, Value>;

/// errors raised by store adapters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("table not found: {table}")]
    TableNotFound { table: String },

    #[error("row not found: {id} in {table}")]
    RowNotFound { table: String, id: String },

    #[error("column not found: {column} in {table}")]
    ColumnNotFound { table: String, column: String },

    #[error("config key not found: {key}")]
    ConfigKeyNotFound { key: String },

    #[error("row {index} out of range in {table}")]
    RowOutOfRange { table: String, index: usize },

    #[error("row has {actual} values, {table} expects {expected}")]
    WidthMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("store unavailable: {message}")]
    Unavailable { message: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// position of a data row inside its table (zero-based, header excluded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowHandle {
    pub index: usize,
}

/// a located row together with its handle
#[derive(Debug, Clone, PartialEq)]
pub struct FoundRow {
    pub handle: RowHandle,
    pub row: Row,
}

/// one cell write inside a batch
#[derive(Debug, Clone, PartialEq)]
pub struct CellUpdate {
    pub row: RowHandle,
    pub column: String,
    pub value: Value,
}

impl CellUpdate {
    pub fn new(row: RowHandle, column: &str, value: Value) -> Self {
        Self {
            row,
            column: column.to_string(),
            value,
        }
    }
}

/// tabular persistence interface consumed by the ledger engines
pub trait TableStore {
    /// all rows of a table in insertion order
    fn get_table(&self, table: &str) -> StoreResult<Vec<Row>>;

    /// first row whose `id_column` cell equals `id_value`
    fn find_row(&self, table: &str, id_column: &str, id_value: &str) -> StoreResult<FoundRow> {
        self.get_table(table)?
            .into_iter()
            .enumerate()
            .find(|(_, row)| row.get(id_column).map(cell_text).as_deref() == Some(id_value))
            .map(|(index, row)| FoundRow {
                handle: RowHandle { index },
                row,
            })
            .ok_or_else(|| StoreError::RowNotFound {
                table: table.to_string(),
                id: id_value.to_string(),
            })
    }

    /// append a row; values follow the table's header order
    fn append_row(&mut self, table: &str, values: Vec<Value>) -> StoreResult<()>;

    /// write several cells, with no atomicity across the batch
    fn update_cells(&mut self, table: &str, updates: &[CellUpdate]) -> StoreResult<()>;

    /// write exactly one cell
    fn update_single_cell(
        &mut self,
        table: &str,
        row: RowHandle,
        column: &str,
        value: Value,
    ) -> StoreResult<()>;

    /// remove a row permanently
    fn delete_row(&mut self, table: &str, row: RowHandle) -> StoreResult<()>;

    fn get_config(&self, key: &str) -> StoreResult<Option<String>>;

    fn set_config(&mut self, key: &str, value: &str) -> StoreResult<()>;
}

/// render a cell as the text a spreadsheet would show
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&json!("M-1")), "M-1");
        assert_eq!(cell_text(&json!(4)), "4");
        assert_eq!(cell_text(&Value::Null), "");
    }

    #[test]
    fn test_default_find_row_matches_numeric_ids() {
        let mut store = InMemoryStore::new();
        store.create_table("Codes", &["Code", "Label"]);
        store.append_row("Codes", vec![json!(1), json!("one")]).unwrap();
        store.append_row("Codes", vec![json!(2), json!("two")]).unwrap();

        let found = store.find_row("Codes", "Code", "2").unwrap();
        assert_eq!(found.handle, RowHandle { index: 1 });
        assert_eq!(found.row.get("Label"), Some(&json!("two")));

        let missing = store.find_row("Codes", "Code", "3");
        assert!(matches!(missing, Err(StoreError::RowNotFound { .. })));
    }
}
