use log::{debug, info, warn};

use crate::error::StoreError;
use crate::record::{Record, header_row};
use crate::store::{TableHandle, TabularStore};

/// Initial grid size of a freshly created records sheet
pub const NEW_TABLE_ROWS: u32 = 1000;
pub const NEW_TABLE_COLS: u32 = 20;

/// Typed access to the records sheet of a tabular store
///
/// The adapter keeps no local copy of the data; every call goes to the
/// store. Store failures are passed through untouched.
#[derive(Debug, Clone)]
pub struct RecordAdapter<S> {
    store: S,
}

impl<S: TabularStore> RecordAdapter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Return the named table, creating it with the header row when absent.
    pub async fn ensure_table(&self, name: &str) -> Result<TableHandle, StoreError> {
        if let Some(table) = self.store.find_table(name).await? {
            return Ok(table);
        }

        info!("creating worksheet \"{name}\"");
        let table = self
            .store
            .create_table(name, NEW_TABLE_ROWS, NEW_TABLE_COLS)
            .await?;
        self.store.append_row(&table, header_row()).await?;
        Ok(table)
    }

    /// Append `record` as one row in header order
    pub async fn append(&self, table: &TableHandle, record: &Record) -> Result<(), StoreError> {
        self.store.append_row(table, record.to_row()).await?;
        debug!(
            "appended record for station \"{}\" by {}",
            record.station, record.submitted_by
        );
        Ok(())
    }

    /// Every data row of `table` as a `Record`, in append order
    pub async fn fetch_all(&self, table: &TableHandle) -> Result<Vec<Record>, StoreError> {
        let rows = self.store.read_rows(table).await?;
        Ok(records_from_rows(&rows))
    }
}

/// Convert raw rows (header first) into records.
///
/// Blank rows are dropped. Rows missing a required field are kept, since
/// they exist in the sheet, but are reported.
pub fn records_from_rows(rows: &[Vec<String>]) -> Vec<Record> {
    let Some((header, data)) = rows.split_first() else {
        return Vec::new();
    };

    data.iter()
        .enumerate()
        .filter(|(_, row)| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|(idx, row)| {
            let record = Record::from_row(header, row);
            if !record.is_complete() {
                // +2: one for the header, one for 1-based sheet rows
                warn!("sheet row {} is missing product name or dosage", idx + 2);
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::HEADER;
    use crate::store::MemoryStore;

    fn record(station: &str, product: &str) -> Record {
        Record {
            timestamp: "2025-05-01 08:00:00".into(),
            date: "01/05/2025".into(),
            station: station.into(),
            product_name: product.into(),
            dosage: "100".into(),
            submitted_by: "ayse".into(),
            ..Record::default()
        }
    }

    #[tokio::test]
    async fn ensure_table_is_idempotent() {
        let store = MemoryStore::new();
        let adapter = RecordAdapter::new(store.clone());

        let first = adapter.ensure_table("records").await.unwrap();
        let second = adapter.ensure_table("records").await.unwrap();
        assert_eq!(first, second);

        let rows = store.read_rows(&first).await.unwrap();
        assert_eq!(rows.len(), 1, "header must be written exactly once");
        assert_eq!(rows[0], HEADER.iter().map(|h| h.to_string()).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn fetch_all_on_new_table_is_empty() {
        let adapter = RecordAdapter::new(MemoryStore::new());
        let table = adapter.ensure_table("records").await.unwrap();
        assert!(adapter.fetch_all(&table).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_then_fetch_preserves_order() {
        let adapter = RecordAdapter::new(MemoryStore::new());
        let table = adapter.ensure_table("records").await.unwrap();

        let records = vec![record("B", "Copper"), record("A", "Sulphur"), record("B", "Neem")];
        for r in &records {
            adapter.append(&table, r).await.unwrap();
        }

        assert_eq!(adapter.fetch_all(&table).await.unwrap(), records);
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let store = MemoryStore::new();
        let adapter = RecordAdapter::new(store.clone());
        let table = adapter.ensure_table("records").await.unwrap();

        store.set_unavailable(true);
        assert!(matches!(
            adapter.append(&table, &record("A", "Copper")).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(adapter.ensure_table("other").await.is_err());
    }

    #[test]
    fn blank_rows_are_skipped_and_incomplete_rows_kept() {
        let rows = vec![
            header_row(),
            vec![String::new(); 9],
            vec!["t".into(), "d".into(), "A".into()],
        ];
        let records = records_from_rows(&rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].station, "A");
        assert_eq!(records[0].product_name, "");
    }

    #[test]
    fn no_rows_at_all() {
        assert!(records_from_rows(&[]).is_empty());
    }
}
