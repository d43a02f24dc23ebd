//! Warehouse trait, scoped sessions and structured error types.
//!
//! A [`Warehouse`] knows how to open a connection. The connection is wrapped
//! in a [`WarehouseSession`] that closes it when dropped, so every exit path of
//! a pipeline run releases the handle.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::Ticker;

/// The one table the dashboard reads.
pub const PRICE_TABLE: &str = "avg_last_price";

/// Structured error types for warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("warehouse unreachable: {0}")]
    Unreachable(String),

    #[error("warehouse rate limited the request (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("warehouse server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("warehouse authentication failed: {0}")]
    Authentication(String),

    #[error("query failed: {0}")]
    Query(String),

    /// The warehouse accepted the statement but it outlived its timeout.
    #[error("statement still running after {secs}s")]
    StatementTimeout { secs: u64 },

    #[error("unexpected result shape: {0}")]
    Schema(String),

    #[error("source file error: {0}")]
    Source(String),

    #[error("session already closed")]
    Closed,
}

impl WarehouseError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WarehouseError::Unreachable(_)
                | WarehouseError::RateLimited { .. }
                | WarehouseError::Server { .. }
        )
    }
}

impl From<polars::prelude::PolarsError> for WarehouseError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        WarehouseError::Source(err.to_string())
    }
}

/// One row as returned by the warehouse, before date decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPriceRow {
    pub ticker: String,
    pub date_key: i64,
    pub average_last_price: f64,
}

/// The parameterized price query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuery {
    tickers: Vec<Ticker>,
}

impl PriceQuery {
    pub fn new(tickers: &[Ticker]) -> Self {
        Self {
            tickers: tickers.to_vec(),
        }
    }

    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    /// SQL text with one positional `?` placeholder per ticker.
    pub fn sql(&self) -> String {
        let placeholders = vec!["?"; self.tickers.len().max(1)].join(", ");
        format!(
            "SELECT ticker, date, average_last_price FROM {PRICE_TABLE} \
             WHERE ticker IN ({placeholders}) ORDER BY date"
        )
    }

    pub fn matches(&self, ticker: &str) -> bool {
        self.tickers.iter().any(|t| t.as_str() == ticker)
    }
}

/// A live connection to a warehouse backend.
pub trait Connection: Send {
    /// Execute the price query and return rows ordered by date ascending.
    fn query_prices(&mut self, query: &PriceQuery) -> Result<Vec<RawPriceRow>, WarehouseError>;

    /// Release backend resources. Called exactly once, by the owning session.
    fn close(&mut self) {}
}

/// Trait for warehouse backends (Snowflake, file export, synthetic, in-memory).
pub trait Warehouse: Send + Sync {
    /// Human-readable name of this backend.
    fn name(&self) -> &str;

    /// Open a scoped session.
    fn open(&self) -> Result<WarehouseSession, WarehouseError>;
}

/// Scoped connection handle. Dropping it closes the underlying connection.
pub struct WarehouseSession {
    backend: String,
    connection: Option<Box<dyn Connection>>,
}

impl WarehouseSession {
    pub fn new(backend: impl Into<String>, connection: Box<dyn Connection>) -> Self {
        let backend = backend.into();
        debug!(backend = %backend, "warehouse session opened");
        Self {
            backend,
            connection: Some(connection),
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn query_prices(&mut self, tickers: &[Ticker]) -> Result<Vec<RawPriceRow>, WarehouseError> {
        let query = PriceQuery::new(tickers);
        let conn = self.connection.as_mut().ok_or(WarehouseError::Closed)?;
        debug!(backend = %self.backend, sql = %query.sql(), "executing price query");
        conn.query_prices(&query)
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Close explicitly. Dropping the session has the same effect.
    pub fn close(&mut self) {
        if let Some(mut conn) = self.connection.take() {
            conn.close();
            debug!(backend = %self.backend, "warehouse session released");
        }
    }
}

impl Drop for WarehouseSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for WarehouseSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseSession")
            .field("backend", &self.backend)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Sort rows by date key, keeping the original order of equal keys.
pub(crate) fn order_by_date(rows: &mut [RawPriceRow]) {
    rows.sort_by_key(|r| r.date_key);
}
