//! The remote tabular store seam.
//!
//! A store holds named tables (worksheets) of text rows. It is append-only
//! from this application's point of view and offers a read-all operation.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::StoreError;

/// Reference to an existing table inside a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHandle {
    /// Store-assigned numeric id
    pub id: i64,
    /// Table title, unique inside the store
    pub name: String,
}

/// Operations the record adapter needs from a spreadsheet-like service
pub trait TabularStore: Send + Sync + 'static {
    /// Look up a table by title
    fn find_table(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<TableHandle>, StoreError>> + Send;

    /// Create an empty table sized `rows` x `cols`
    fn create_table(
        &self,
        name: &str,
        rows: u32,
        cols: u32,
    ) -> impl Future<Output = Result<TableHandle, StoreError>> + Send;

    /// Append one row after the last non-empty row
    fn append_row(
        &self,
        table: &TableHandle,
        row: Vec<String>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Every row of the table, header included
    fn read_rows(
        &self,
        table: &TableHandle,
    ) -> impl Future<Output = Result<Vec<Vec<String>>, StoreError>> + Send;
}

#[derive(Debug)]
struct MemoryTable {
    handle: TableHandle,
    rows: Vec<Vec<String>>,
}

/// In-process store
///
/// Clones share the same tables, so a caller can keep a handle on the data
/// after moving a clone into the application state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Vec<MemoryTable>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with `StoreError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut Vec<MemoryTable>) -> T) -> T {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut tables)
    }
}

impl TabularStore for MemoryStore {
    async fn find_table(&self, name: &str) -> Result<Option<TableHandle>, StoreError> {
        self.check_available()?;
        Ok(self.with_tables(|tables| {
            tables
                .iter()
                .find(|t| t.handle.name == name)
                .map(|t| t.handle.clone())
        }))
    }

    async fn create_table(&self, name: &str, _rows: u32, _cols: u32) -> Result<TableHandle, StoreError> {
        self.check_available()?;
        self.with_tables(|tables| {
            if tables.iter().any(|t| t.handle.name == name) {
                return Err(StoreError::Unavailable(format!(
                    "a sheet named \"{name}\" already exists"
                )));
            }
            let handle = TableHandle {
                id: tables.len() as i64,
                name: name.to_string(),
            };
            tables.push(MemoryTable {
                handle: handle.clone(),
                rows: Vec::new(),
            });
            Ok(handle)
        })
    }

    async fn append_row(&self, table: &TableHandle, row: Vec<String>) -> Result<(), StoreError> {
        self.check_available()?;
        self.with_tables(|tables| {
            let target = tables
                .iter_mut()
                .find(|t| t.handle.id == table.id)
                .ok_or_else(|| StoreError::Unavailable(format!("no sheet \"{}\"", table.name)))?;
            target.rows.push(row);
            Ok(())
        })
    }

    async fn read_rows(&self, table: &TableHandle) -> Result<Vec<Vec<String>>, StoreError> {
        self.check_available()?;
        self.with_tables(|tables| {
            tables
                .iter()
                .find(|t| t.handle.id == table.id)
                .map(|t| t.rows.clone())
                .ok_or_else(|| StoreError::Unavailable(format!("no sheet \"{}\"", table.name)))
        })
    }
}
