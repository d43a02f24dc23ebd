//! In-memory warehouse for tests and embedding.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::warehouse::{
    order_by_date, Connection, PriceQuery, RawPriceRow, Warehouse, WarehouseError,
    WarehouseSession,
};

/// Serves caller-supplied rows with the same filter and ordering as the SQL query.
///
/// Can be told to fail the next `n` queries with a transient error, and tracks
/// how many sessions are currently open.
#[derive(Debug, Clone, Default)]
pub struct MemoryWarehouse {
    rows: Arc<Vec<RawPriceRow>>,
    pending_failures: Arc<AtomicUsize>,
    open_sessions: Arc<AtomicUsize>,
    queries: Arc<AtomicUsize>,
}

impl MemoryWarehouse {
    pub fn new(rows: Vec<RawPriceRow>) -> Self {
        Self {
            rows: Arc::new(rows),
            ..Self::default()
        }
    }

    /// Fail the next `n` queries with `WarehouseError::Unreachable`.
    pub fn with_transient_failures(self, n: usize) -> Self {
        self.pending_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl Warehouse for MemoryWarehouse {
    fn name(&self) -> &str {
        "memory"
    }

    fn open(&self) -> Result<WarehouseSession, WarehouseError> {
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(WarehouseSession::new(
            self.name(),
            Box::new(MemoryConnection {
                warehouse: self.clone(),
            }),
        ))
    }
}

struct MemoryConnection {
    warehouse: MemoryWarehouse,
}

impl Connection for MemoryConnection {
    fn query_prices(&mut self, query: &PriceQuery) -> Result<Vec<RawPriceRow>, WarehouseError> {
        let wh = &self.warehouse;
        wh.queries.fetch_add(1, Ordering::SeqCst);

        let failed = wh
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(WarehouseError::Unreachable("injected failure".into()));
        }

        let mut rows: Vec<RawPriceRow> = wh
            .rows
            .iter()
            .filter(|r| query.matches(&r.ticker))
            .cloned()
            .collect();
        order_by_date(&mut rows);
        Ok(rows)
    }

    fn close(&mut self) {
        self.warehouse.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}
