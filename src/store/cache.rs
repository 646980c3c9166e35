use std::cell::RefCell;
use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use hourglass_rs::SafeTimeProvider;
use serde_json::Value;
use tracing::debug;

use crate::store::{CellUpdate, Row, RowHandle, StoreResult, TableStore};

#[derive(Debug, Clone)]
struct CachedTable {
    rows: Vec<Row>,
    fetched_at: DateTime<Utc>,
}

/// read-through table cache in front of another store
///
/// Table reads are served from memory until `ttl` has elapsed on the shared
/// clock. Every mutating call invalidates the affected table synchronously
/// after the inner store accepts (or rejects) the write, so a read issued
/// through this wrapper after a write always sees the store's current rows.
/// Writes made to the inner store by anyone else stay invisible until the
/// entry expires or [`CachedStore::invalidate`] is called.
pub struct CachedStore<'t, S: TableStore> {
    inner: S,
    clock: &'t SafeTimeProvider,
    ttl: Duration,
    entries: RefCell<HashMap<String, CachedTable>>,
}

impl<'t, S: TableStore> CachedStore<'t, S> {
    pub fn new(inner: S, clock: &'t SafeTimeProvider, ttl: Duration) -> Self {
        Self {
            inner,
            clock,
            ttl,
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// drop the cached copy of one table
    pub fn invalidate(&self, table: &str) {
        if self.entries.borrow_mut().remove(table).is_some() {
            debug!(table, "cache invalidated");
        }
    }

    pub fn is_cached(&self, table: &str) -> bool {
        self.fresh_entry(table).is_some()
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// direct access to the wrapped store, bypassing invalidation
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    fn fresh_entry(&self, table: &str) -> Option<Vec<Row>> {
        let entries = self.entries.borrow();
        let entry = entries.get(table)?;
        if self.clock.now() - entry.fetched_at < self.ttl {
            Some(entry.rows.clone())
        } else {
            None
        }
    }
}

impl<S: TableStore> TableStore for CachedStore<'_, S> {
    fn get_table(&self, table: &str) -> StoreResult<Vec<Row>> {
        if let Some(rows) = self.fresh_entry(table) {
            return Ok(rows);
        }
        let rows = self.inner.get_table(table)?;
        self.entries.borrow_mut().insert(
            table.to_string(),
            CachedTable {
                rows: rows.clone(),
                fetched_at: self.clock.now(),
            },
        );
        Ok(rows)
    }

    fn append_row(&mut self, table: &str, values: Vec<Value>) -> StoreResult<()> {
        let result = self.inner.append_row(table, values);
        self.invalidate(table);
        result
    }

    fn update_cells(&mut self, table: &str, updates: &[CellUpdate]) -> StoreResult<()> {
        let result = self.inner.update_cells(table, updates);
        self.invalidate(table);
        result
    }

    fn update_single_cell(
        &mut self,
        table: &str,
        row: RowHandle,
        column: &str,
        value: Value,
    ) -> StoreResult<()> {
        let result = self.inner.update_single_cell(table, row, column, value);
        self.invalidate(table);
        result
    }

    fn delete_row(&mut self, table: &str, row: RowHandle) -> StoreResult<()> {
        let result = self.inner.delete_row(table, row);
        self.invalidate(table);
        result
    }

    fn get_config(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner.get_config(key)
    }

    fn set_config(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.inner.set_config(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use chrono::TimeZone;
    use hourglass_rs::TimeSource;
    use serde_json::json;

    fn items_store() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        store.create_table("Items", &["ID", "Qty"]);
        store.append_row("Items", vec![json!("a"), json!(1)]).unwrap();
        store
    }

    #[test]
    fn test_reads_served_from_cache_within_ttl() {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        ));
        let control = time.test_control().unwrap();
        let cached = CachedStore::new(items_store(), &time, Duration::seconds(60));

        cached.get_table("Items").unwrap();
        cached.get_table("Items").unwrap();
        assert_eq!(cached.inner().read_count(), 1);

        control.advance(Duration::seconds(61));
        cached.get_table("Items").unwrap();
        assert_eq!(cached.inner().read_count(), 2);
    }

    #[test]
    fn test_writes_invalidate_table() {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        ));
        let mut cached = CachedStore::new(items_store(), &time, Duration::seconds(60));

        let before = cached.find_row("Items", "ID", "a").unwrap();
        cached
            .update_single_cell("Items", before.handle, "Qty", json!(7))
            .unwrap();
        assert!(!cached.is_cached("Items"));

        let after = cached.find_row("Items", "ID", "a").unwrap();
        assert_eq!(after.row.get("Qty"), Some(&json!(7)));
    }

    #[test]
    fn test_out_of_band_writes_are_stale_until_invalidated() {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        ));
        let mut cached = CachedStore::new(items_store(), &time, Duration::seconds(60));

        cached.get_table("Items").unwrap();
        cached
            .inner_mut()
            .append_row("Items", vec![json!("b"), json!(2)])
            .unwrap();

        assert_eq!(cached.get_table("Items").unwrap().len(), 1);
        cached.invalidate("Items");
        assert_eq!(cached.get_table("Items").unwrap().len(), 2);
    }
}
