use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::store::schema;
use crate::store::{CellUpdate, Row, RowHandle, StoreError, StoreResult, TableStore};

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl MemoryTable {
    fn column_index(&self, table: &str, column: &str) -> StoreResult<usize> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| StoreError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
            })
    }

    fn check_row(&self, table: &str, row: RowHandle) -> StoreResult<()> {
        if row.index < self.rows.len() {
            Ok(())
        } else {
            Err(StoreError::RowOutOfRange {
                table: table.to_string(),
                index: row.index,
            })
        }
    }
}

/// in-process table store
///
/// Behaves like the spreadsheet backend the ledger was written against:
/// header rows, positional rows, cells as JSON values. It also carries
/// failure switches so engines can be exercised against a flaky gateway.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: HashMap<String, MemoryTable>,
    config: BTreeMap<String, String>,
    failing_appends: HashSet<String>,
    failing_rows: HashSet<(String, usize)>,
    failing_batches: HashSet<String>,
    reads: std::cell::Cell<usize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// store with every ledger table created and empty
    pub fn with_ledger_schema() -> Self {
        let mut store = Self::new();
        for (table, headers) in schema::TABLES {
            store.create_table(table, headers);
        }
        store
    }

    pub fn create_table(&mut self, table: &str, headers: &[&str]) {
        self.tables.insert(
            table.to_string(),
            MemoryTable {
                headers: headers.iter().map(|h| h.to_string()).collect(),
                rows: Vec::new(),
            },
        );
    }

    /// number of `get_table` calls served so far
    pub fn read_count(&self) -> usize {
        self.reads.get()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    /// make every append to `table` fail
    pub fn fail_appends_to(&mut self, table: &str) {
        self.failing_appends.insert(table.to_string());
    }

    /// make every multi-cell batch on `table` fail
    pub fn fail_batches_on(&mut self, table: &str) {
        self.failing_batches.insert(table.to_string());
    }

    /// make every write touching the row identified by `id_value` fail
    pub fn fail_writes_to_row(&mut self, table: &str, id_column: &str, id_value: &str) -> StoreResult<()> {
        let found = self.find_row(table, id_column, id_value)?;
        self.failing_rows.insert((table.to_string(), found.handle.index));
        Ok(())
    }

    pub fn clear_failures(&mut self) {
        self.failing_appends.clear();
        self.failing_rows.clear();
        self.failing_batches.clear();
    }

    fn table(&self, table: &str) -> StoreResult<&MemoryTable> {
        self.tables.get(table).ok_or_else(|| StoreError::TableNotFound {
            table: table.to_string(),
        })
    }

    fn table_mut(&mut self, table: &str) -> StoreResult<&mut MemoryTable> {
        self.tables.get_mut(table).ok_or_else(|| StoreError::TableNotFound {
            table: table.to_string(),
        })
    }

    fn check_row_writable(&self, table: &str, row: RowHandle) -> StoreResult<()> {
        if self.failing_rows.contains(&(table.to_string(), row.index)) {
            return Err(StoreError::Unavailable {
                message: format!("write rejected for row {} of {}", row.index, table),
            });
        }
        Ok(())
    }
}

impl TableStore for InMemoryStore {
    fn get_table(&self, table: &str) -> StoreResult<Vec<Row>> {
        self.reads.set(self.reads.get() + 1);
        let t = self.table(table)?;
        Ok(t.rows
            .iter()
            .map(|values| {
                t.headers
                    .iter()
                    .cloned()
                    .zip(values.iter().cloned())
                    .collect::<Row>()
            })
            .collect())
    }

    fn append_row(&mut self, table: &str, values: Vec<Value>) -> StoreResult<()> {
        if self.failing_appends.contains(table) {
            return Err(StoreError::Unavailable {
                message: format!("append rejected for {table}"),
            });
        }
        let t = self.table_mut(table)?;
        if values.len() != t.headers.len() {
            return Err(StoreError::WidthMismatch {
                table: table.to_string(),
                expected: t.headers.len(),
                actual: values.len(),
            });
        }
        t.rows.push(values);
        debug!(table, rows = t.rows.len(), "row appended");
        Ok(())
    }

    fn update_cells(&mut self, table: &str, updates: &[CellUpdate]) -> StoreResult<()> {
        if self.failing_batches.contains(table) {
            return Err(StoreError::Unavailable {
                message: format!("batch update rejected for {table}"),
            });
        }
        for update in updates {
            self.check_row_writable(table, update.row)?;
        }

        // resolve every target before writing so a bad column leaves the table untouched
        let t = self.table_mut(table)?;
        let mut resolved = Vec::with_capacity(updates.len());
        for update in updates {
            t.check_row(table, update.row)?;
            let col = t.column_index(table, &update.column)?;
            resolved.push((update.row.index, col, update.value.clone()));
        }
        for (row, col, value) in resolved {
            t.rows[row][col] = value;
        }
        debug!(table, cells = updates.len(), "cells updated");
        Ok(())
    }

    fn update_single_cell(
        &mut self,
        table: &str,
        row: RowHandle,
        column: &str,
        value: Value,
    ) -> StoreResult<()> {
        self.check_row_writable(table, row)?;
        let t = self.table_mut(table)?;
        t.check_row(table, row)?;
        let col = t.column_index(table, column)?;
        t.rows[row.index][col] = value;
        Ok(())
    }

    fn delete_row(&mut self, table: &str, row: RowHandle) -> StoreResult<()> {
        self.check_row_writable(table, row)?;
        let t = self.table_mut(table)?;
        t.check_row(table, row)?;
        t.rows.remove(row.index);
        Ok(())
    }

    fn get_config(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.config.get(key).cloned())
    }

    fn set_config(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.config.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with_rows() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        store.create_table("Items", &["ID", "Qty"]);
        store.append_row("Items", vec![json!("a"), json!(1)]).unwrap();
        store.append_row("Items", vec![json!("b"), json!(2)]).unwrap();
        store
    }

    #[test]
    fn test_rows_keep_insertion_order() {
        let store = store_with_rows();
        let rows = store.get_table("Items").unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("ID"), Some(&json!("a")));
        assert_eq!(rows[1].get("Qty"), Some(&json!(2)));
    }

    #[test]
    fn test_append_checks_width() {
        let mut store = store_with_rows();
        let result = store.append_row("Items", vec![json!("c")]);

        assert!(matches!(result, Err(StoreError::WidthMismatch { expected: 2, actual: 1, .. })));
        assert_eq!(store.row_count("Items"), 2);
    }

    #[test]
    fn test_batch_with_unknown_column_writes_nothing() {
        let mut store = store_with_rows();
        let updates = vec![
            CellUpdate::new(RowHandle { index: 0 }, "Qty", json!(10)),
            CellUpdate::new(RowHandle { index: 1 }, "Missing", json!(20)),
        ];

        assert!(store.update_cells("Items", &updates).is_err());
        let rows = store.get_table("Items").unwrap();
        assert_eq!(rows[0].get("Qty"), Some(&json!(1)));
    }

    #[test]
    fn test_failing_row_only_blocks_that_row() {
        let mut store = store_with_rows();
        store.fail_writes_to_row("Items", "ID", "b").unwrap();

        assert!(store
            .update_single_cell("Items", RowHandle { index: 0 }, "Qty", json!(5))
            .is_ok());
        assert!(store
            .update_single_cell("Items", RowHandle { index: 1 }, "Qty", json!(5))
            .is_err());
    }

    #[test]
    fn test_delete_and_config() {
        let mut store = store_with_rows();
        store.delete_row("Items", RowHandle { index: 0 }).unwrap();
        assert_eq!(store.row_count("Items"), 1);

        assert_eq!(store.get_config("LastCalc_Acc4").unwrap(), None);
        store.set_config("LastCalc_Acc4", "2024-07-05").unwrap();
        assert_eq!(store.get_config("LastCalc_Acc4").unwrap().as_deref(), Some("2024-07-05"));
    }
}
