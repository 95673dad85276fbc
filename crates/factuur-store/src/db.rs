//! SQLite schema and row mapping for the invoice table.

use std::time::Duration;

use rusqlite::{Connection, Row};

use crate::{StoreError, StoredInvoice};

/// Columns selected for a [`StoredInvoice`], in `from_row` order.
pub(crate) const SELECT_COLUMNS: &str = "id, created_at, file_name, invoice_date, invoice_amount, \
     btw_amount, btw_number, kvk, supplier, notes";

/// Initialize the database with the required schema.
pub(crate) fn init_database(conn: &Connection) -> Result<(), StoreError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(Duration::from_secs(5))?;

    // AUTOINCREMENT: ids are never reused.
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS invoices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL,
            file_name TEXT,
            invoice_date TEXT,
            invoice_amount TEXT,
            btw_amount TEXT,
            btw_number TEXT,
            kvk TEXT,
            supplier TEXT,
            notes TEXT
        );
        "#,
    )?;

    Ok(())
}

pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<StoredInvoice> {
    Ok(StoredInvoice {
        id: row.get(0)?,
        created_at: row.get(1)?,
        file_name: row.get(2)?,
        invoice_date: row.get(3)?,
        invoice_amount: row.get(4)?,
        btw_amount: row.get(5)?,
        btw_number: row.get(6)?,
        kvk: row.get(7)?,
        supplier: row.get(8)?,
        notes: row.get(9)?,
    })
}
