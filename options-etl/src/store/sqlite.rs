//! SQLite storage for priced options.
//!
//! Table `options_data` is append-only: every ingestion pass inserts new rows
//! and never updates existing ones. Exactly one of `call_price` / `put_price`
//! is set per row, enforced by a CHECK constraint.

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use thiserror::Error;

use crate::data::PricedOption;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for priced options.
pub trait OptionSink {
    /// Append one row and return its id.
    fn insert(&mut self, option: &PricedOption) -> Result<i64, StoreError>;
}

/// A row read back from `options_data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredOption {
    pub id: i64,
    pub stock_symbol: String,
    pub strike_price: f64,
    pub current_price: f64,
    pub time_to_maturity: f64,
    pub risk_free_rate: f64,
    pub volatility: f64,
    pub call_price: Option<f64>,
    pub put_price: Option<f64>,
    pub expiration_date: NaiveDate,
}

impl StoredOption {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            stock_symbol: row.get(1)?,
            strike_price: row.get(2)?,
            current_price: row.get(3)?,
            time_to_maturity: row.get(4)?,
            risk_free_rate: row.get(5)?,
            volatility: row.get(6)?,
            call_price: row.get(7)?,
            put_price: row.get(8)?,
            expiration_date: row.get(9)?,
        })
    }
}

/// SQLite-backed store. The connection is closed when the store is dropped.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure the table exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::with_connection(conn)
    }

    /// In-memory database, mostly for tests and dry runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        migrate(&conn)?;
        Ok(Self { conn })
    }

    /// Number of stored rows.
    pub fn count(&self) -> Result<i64, StoreError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM options_data", [], |row| row.get(0))?;
        Ok(count)
    }

    /// All rows for `symbol`, in insertion order.
    pub fn rows_for_symbol(&self, symbol: &str) -> Result<Vec<StoredOption>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, stock_symbol, strike_price, current_price, time_to_maturity,
                    risk_free_rate, volatility, call_price, put_price, expiration_date
             FROM options_data WHERE stock_symbol = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![symbol], StoredOption::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl OptionSink for SqliteStore {
    fn insert(&mut self, option: &PricedOption) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO options_data (stock_symbol, strike_price, current_price,
                 time_to_maturity, risk_free_rate, volatility, call_price, put_price,
                 expiration_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                option.symbol,
                option.strike,
                option.spot,
                option.time_to_maturity,
                option.risk_free_rate,
                option.volatility,
                option.call_price(),
                option.put_price(),
                option.expiration_date,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }
}

fn migrate(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS options_data (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            stock_symbol      TEXT NOT NULL,
            strike_price      REAL NOT NULL,
            current_price     REAL NOT NULL,
            time_to_maturity  REAL NOT NULL,
            risk_free_rate    REAL NOT NULL,
            volatility        REAL NOT NULL,
            call_price        REAL,
            put_price         REAL,
            expiration_date   TEXT NOT NULL,
            CHECK ((call_price IS NULL) <> (put_price IS NULL))
        );

        CREATE INDEX IF NOT EXISTS idx_options_data_symbol ON options_data(stock_symbol);
        ",
    )?;
    Ok(())
}
