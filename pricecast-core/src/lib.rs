//! PriceCast Core — domain types, warehouse access, price table and forecasting models.
//!
//! This crate contains everything below the pipeline:
//! - Domain types (tickers, calendar dates, price records, forecast points, CV folds)
//! - The four-kind pipeline error taxonomy
//! - Warehouse trait with Snowflake, file-export, synthetic and in-memory backends
//! - Integer date-key decomposition
//! - A polars-backed price table with ticker filtering
//! - ARIMA and additive trend/seasonality models

pub mod data;
pub mod domain;
pub mod error;
pub mod models;
pub mod rng;

pub use error::{ErrorKind, PipelineError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the TUI worker hands across threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Ticker>();
        require_sync::<domain::Ticker>();
        require_send::<domain::HistoricalSeries>();
        require_sync::<domain::HistoricalSeries>();
        require_send::<domain::ForecastPoint>();
        require_sync::<domain::ForecastPoint>();
        require_send::<domain::ErrorMetric>();
        require_sync::<domain::ErrorMetric>();
        require_send::<domain::HyperparamResult>();
        require_sync::<domain::HyperparamResult>();
        require_send::<PipelineError>();
        require_sync::<PipelineError>();

        require_send::<data::PriceTable>();
        require_sync::<data::PriceTable>();
        require_send::<data::WarehouseSession>();
        require_send::<data::SnowflakeWarehouse>();
        require_sync::<data::SnowflakeWarehouse>();
        require_send::<data::FileWarehouse>();
        require_sync::<data::FileWarehouse>();
        require_send::<data::SyntheticWarehouse>();
        require_sync::<data::SyntheticWarehouse>();
        require_send::<data::MemoryWarehouse>();
        require_sync::<data::MemoryWarehouse>();

        require_send::<models::FittedArima>();
        require_sync::<models::FittedArima>();
        require_send::<models::FittedAdditive>();
        require_sync::<models::FittedAdditive>();
    }

    /// Warehouses are usable as trait objects.
    #[test]
    fn warehouse_is_object_safe() {
        let backends: Vec<Box<dyn data::Warehouse>> = vec![
            Box::new(data::MemoryWarehouse::new(vec![])),
            Box::new(data::SyntheticWarehouse::new(1, 3)),
        ];
        let names: Vec<&str> = backends.iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["memory", "synthetic"]);
    }
}
