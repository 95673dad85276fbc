//! Append-only SQLite store for reviewed invoices.
//!
//! Rows are written once with a server-assigned id and creation timestamp and
//! are never updated or deleted. Every field other than the id and timestamp
//! is nullable text: whatever the client sent is stored as-is.

mod db;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use factuur_core::InvoiceRecord;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A record submitted for persistence. Absent fields are stored as NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoice {
    #[serde(default, deserialize_with = "lenient_text")]
    pub file_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub invoice_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub invoice_amount: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub btw_amount: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub btw_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub kvk: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub supplier: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub notes: Option<String>,
}

impl NewInvoice {
    /// A row for an extracted record, all fields set.
    pub fn from_record(file_name: Option<String>, record: &InvoiceRecord) -> Self {
        Self {
            file_name,
            invoice_date: Some(record.invoice_date.clone()),
            invoice_amount: Some(record.invoice_amount.clone()),
            btw_amount: Some(record.btw_amount.clone()),
            btw_number: Some(record.btw_number.clone()),
            kvk: Some(record.kvk.clone()),
            supplier: Some(record.supplier.clone()),
            notes: Some(record.notes.clone()),
        }
    }
}

/// Accept any JSON scalar as text; `null` stays `None`.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// A persisted invoice row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredInvoice {
    pub id: i64,
    /// RFC 3339 UTC, second precision.
    pub created_at: String,
    pub file_name: Option<String>,
    pub invoice_date: Option<String>,
    pub invoice_amount: Option<String>,
    pub btw_amount: Option<String>,
    pub btw_number: Option<String>,
    pub kvk: Option<String>,
    pub supplier: Option<String>,
    pub notes: Option<String>,
}

/// One connection to the invoice database.
pub struct InvoiceStore {
    conn: Connection,
}

impl InvoiceStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        db::init_database(&conn)?;
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        db::init_database(&conn)?;
        Ok(Self { conn })
    }

    /// Append a row stamped with the current time. Returns the new id.
    pub fn insert(&self, invoice: &NewInvoice) -> Result<i64, StoreError> {
        self.insert_at(invoice, Utc::now())
    }

    /// Append a row stamped with `created_at`. Returns the new id.
    pub fn insert_at(
        &self,
        invoice: &NewInvoice,
        created_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let created_at = created_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        self.conn.execute(
            "INSERT INTO invoices
                 (created_at, file_name, invoice_date, invoice_amount, btw_amount,
                  btw_number, kvk, supplier, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                created_at,
                invoice.file_name,
                invoice.invoice_date,
                invoice.invoice_amount,
                invoice.btw_amount,
                invoice.btw_number,
                invoice.kvk,
                invoice.supplier,
                invoice.notes
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(id, file_name = ?invoice.file_name, "invoice stored");
        Ok(id)
    }

    /// Fetch a single row by id.
    pub fn get(&self, id: i64) -> Result<Option<StoredInvoice>, StoreError> {
        let sql = format!("SELECT {} FROM invoices WHERE id = ?1", db::SELECT_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![id], db::from_row)
            .optional()?;
        Ok(row)
    }

    /// Rows newest first, optionally capped at `limit`.
    pub fn list(&self, limit: Option<usize>) -> Result<Vec<StoredInvoice>, StoreError> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let sql = format!(
            "SELECT {} FROM invoices ORDER BY id DESC LIMIT ?1",
            db::SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![limit], db::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Number of stored rows.
    pub fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM invoices", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}
