//! Price loading for the runner.
//!
//! Opens a warehouse session, queries `avg_last_price` for the configured
//! tickers with bounded retries on transient failures, and hands back the
//! rows as a [`PriceTable`] together with a dataset hash for the report.

use std::time::Duration;
use tracing::{debug, info, warn};

use pricecast_core::data::{DateEncoding, PriceTable, Warehouse, WarehouseError, WarehouseSession};
use pricecast_core::domain::{HistoricalSeries, PriceRecord, Ticker};
use pricecast_core::PipelineError;

// ─── Retry policy ────────────────────────────────────────────────────

/// Exponential backoff for transient warehouse failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32, err: &WarehouseError) -> Duration {
        let backoff = self.base_delay * 2u32.pow(attempt.saturating_sub(1).min(16));
        match err {
            WarehouseError::RateLimited { retry_after_secs } => {
                backoff.max(Duration::from_secs(*retry_after_secs))
            }
            _ => backoff,
        }
    }

    /// Run `op`, retrying while it fails with a transient error.
    pub fn run<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Result<T, WarehouseError>,
    ) -> Result<T, WarehouseError> {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.delay_for(attempt, &e);
                    warn!(
                        what,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient warehouse failure, retrying"
                    );
                    std::thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ─── Loading ─────────────────────────────────────────────────────────

/// Rows returned by one query, with provenance.
#[derive(Debug, Clone)]
pub struct LoadedPrices {
    pub table: PriceTable,
    /// BLAKE3 over the loaded rows.
    pub dataset_hash: String,
    pub backend: String,
}

impl LoadedPrices {
    pub fn row_count(&self) -> usize {
        self.table.height()
    }

    /// All rows as records, in date order.
    pub fn records(&self, encoding: DateEncoding) -> Result<Vec<PriceRecord>, PipelineError> {
        Ok(self.table.to_records(encoding)?)
    }

    /// Rows for one ticker, in date order. Empty if the ticker has no rows.
    pub fn series(
        &self,
        ticker: &Ticker,
        encoding: DateEncoding,
    ) -> Result<HistoricalSeries, PipelineError> {
        let series = self.table.series_for(ticker, encoding)?;
        debug!(ticker = %ticker, rows = series.len(), "filtered series");
        Ok(series)
    }
}

/// Open a session, retrying transient failures.
pub fn open_session(
    warehouse: &dyn Warehouse,
    retry: &RetryPolicy,
) -> Result<WarehouseSession, PipelineError> {
    let session = retry.run("open", || warehouse.open())?;
    info!(backend = warehouse.name(), "warehouse session opened");
    Ok(session)
}

/// Query prices for `tickers` on an open session.
pub fn load_prices(
    session: &mut WarehouseSession,
    tickers: &[Ticker],
    retry: &RetryPolicy,
) -> Result<LoadedPrices, PipelineError> {
    let rows = retry.run("query", || session.query_prices(tickers))?;
    let table = PriceTable::from_rows(&rows)?;
    let dataset_hash = table.dataset_hash()?;
    info!(
        backend = session.backend(),
        tickers = tickers.len(),
        rows = table.height(),
        "loaded prices"
    );
    Ok(LoadedPrices {
        table,
        dataset_hash,
        backend: session.backend().to_string(),
    })
}
