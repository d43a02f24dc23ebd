//! Synthetic warehouse.
//!
//! Generates a deterministic weekday random walk per ticker, with a small
//! weekly pattern, encoded with `YYMMDD` date keys. Developer/demo use only.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::Rng;
use tracing::warn;

use super::date_key::DateEncoding;
use super::warehouse::{
    order_by_date, Connection, PriceQuery, RawPriceRow, Warehouse, WarehouseError,
    WarehouseSession,
};
use crate::domain::CalendarDate;
use crate::rng::SeedHierarchy;

#[derive(Debug, Clone)]
pub struct SyntheticWarehouse {
    seeds: SeedHierarchy,
    days: usize,
    start: NaiveDate,
}

impl SyntheticWarehouse {
    pub fn new(seed: u64, days: usize) -> Self {
        Self {
            seeds: SeedHierarchy::new(seed),
            days,
            start: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap_or_default(),
        }
    }

    pub fn with_start(mut self, start: NaiveDate) -> Self {
        self.start = start;
        self
    }

    /// The weekday series for one ticker.
    pub fn generate(&self, ticker: &str) -> Vec<RawPriceRow> {
        let mut rng = self.seeds.rng_for(ticker, 0);
        let mut price: f64 = rng.gen_range(50.0..400.0);
        let drift: f64 = rng.gen_range(-0.0005..0.001);
        let weekly_amp: f64 = rng.gen_range(0.0..0.004);

        let mut rows = Vec::with_capacity(self.days);
        let mut current = self.start;
        while rows.len() < self.days {
            let weekday = current.weekday();
            if weekday == Weekday::Sat || weekday == Weekday::Sun {
                current += Duration::days(1);
                continue;
            }

            let phase = f64::from(weekday.num_days_from_monday()) - 2.0;
            let daily_return = drift + weekly_amp * phase / 2.0 + rng.gen_range(-0.02..0.02);
            price = (price * (1.0 + daily_return)).max(1.0);

            rows.push(RawPriceRow {
                ticker: ticker.to_string(),
                date_key: DateEncoding::Yymmdd.encode(CalendarDate::from_naive(current)),
                average_last_price: price,
            });
            current += Duration::days(1);
        }
        rows
    }
}

impl Warehouse for SyntheticWarehouse {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn open(&self) -> Result<WarehouseSession, WarehouseError> {
        warn!("using synthetic price data; results are not real market data");
        Ok(WarehouseSession::new(
            self.name(),
            Box::new(SyntheticConnection {
                warehouse: self.clone(),
            }),
        ))
    }
}

struct SyntheticConnection {
    warehouse: SyntheticWarehouse,
}

impl Connection for SyntheticConnection {
    fn query_prices(&mut self, query: &PriceQuery) -> Result<Vec<RawPriceRow>, WarehouseError> {
        let mut rows: Vec<RawPriceRow> = query
            .tickers()
            .iter()
            .flat_map(|t| self.warehouse.generate(t.as_str()))
            .collect();
        order_by_date(&mut rows);
        Ok(rows)
    }
}
