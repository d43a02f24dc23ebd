//! The loaded price table.
//!
//! A thin wrapper over a polars `DataFrame` with a fixed three-column schema.
//! Every transformation returns a new table; the source frame is never mutated.

use polars::prelude::*;
use tracing::warn;

use super::date_key::DateEncoding;
use super::warehouse::{RawPriceRow, WarehouseError};
use crate::domain::{HistoricalSeries, PriceRecord, Ticker};

pub const TICKER: &str = "ticker";
pub const DATE_KEY: &str = "date_key";
pub const PRICE: &str = "average_last_price";

#[derive(Debug, Clone)]
pub struct PriceTable {
    df: DataFrame,
}

impl PriceTable {
    /// Canonical schema of the table.
    pub fn schema() -> Schema {
        Schema::from_iter(vec![
            Field::new(TICKER.into(), DataType::String),
            Field::new(DATE_KEY.into(), DataType::Int64),
            Field::new(PRICE.into(), DataType::Float64),
        ])
    }

    pub fn from_rows(rows: &[RawPriceRow]) -> Result<Self, WarehouseError> {
        let tickers: Vec<&str> = rows.iter().map(|r| r.ticker.as_str()).collect();
        let keys: Vec<i64> = rows.iter().map(|r| r.date_key).collect();
        let prices: Vec<f64> = rows.iter().map(|r| r.average_last_price).collect();

        let df = DataFrame::new(vec![
            Column::new(TICKER.into(), tickers),
            Column::new(DATE_KEY.into(), keys),
            Column::new(PRICE.into(), prices),
        ])?;
        Ok(Self { df })
    }

    /// Wrap an existing frame after checking it against [`PriceTable::schema`].
    /// Extra columns are dropped.
    pub fn from_frame(df: DataFrame) -> Result<Self, WarehouseError> {
        let expected = Self::schema();
        let actual = df.schema();
        for field in expected.iter_fields() {
            let dtype = actual.get(field.name()).ok_or_else(|| {
                WarehouseError::Schema(format!("missing column '{}'", field.name()))
            })?;
            if dtype != field.dtype() {
                return Err(WarehouseError::Schema(format!(
                    "column '{}' has type {dtype:?}, expected {:?}",
                    field.name(),
                    field.dtype()
                )));
            }
        }
        let df = df.select([TICKER, DATE_KEY, PRICE])?;
        Ok(Self { df })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Rows for one ticker, date ascending, ties in original order.
    pub fn filter_ticker(&self, ticker: &Ticker) -> Result<PriceTable, WarehouseError> {
        let df = self
            .df
            .clone()
            .lazy()
            .filter(col(TICKER).eq(lit(ticker.as_str())))
            .sort(
                [DATE_KEY],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .collect()?;
        Ok(Self { df })
    }

    /// Materialize rows. Rows with a null field are skipped with a warning.
    pub fn rows(&self) -> Result<Vec<RawPriceRow>, WarehouseError> {
        let map_err = |e: PolarsError| WarehouseError::Schema(format!("column read: {e}"));
        let tickers = self.df.column(TICKER).map_err(map_err)?.str().map_err(map_err)?;
        let keys = self.df.column(DATE_KEY).map_err(map_err)?.i64().map_err(map_err)?;
        let prices = self.df.column(PRICE).map_err(map_err)?.f64().map_err(map_err)?;

        let mut rows = Vec::with_capacity(self.df.height());
        let mut skipped = 0usize;
        for i in 0..self.df.height() {
            match (tickers.get(i), keys.get(i), prices.get(i)) {
                (Some(ticker), Some(date_key), Some(price)) => rows.push(RawPriceRow {
                    ticker: ticker.to_string(),
                    date_key,
                    average_last_price: price,
                }),
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, "dropped price rows with null fields");
        }
        Ok(rows)
    }

    /// Decode every row into a [`PriceRecord`].
    pub fn to_records(&self, encoding: DateEncoding) -> Result<Vec<PriceRecord>, WarehouseError> {
        self.rows()?
            .into_iter()
            .map(|r| {
                let ticker = Ticker::new(&r.ticker)
                    .map_err(|e| WarehouseError::Schema(format!("bad ticker in result: {e}")))?;
                Ok(PriceRecord {
                    ticker,
                    date: encoding.decode(r.date_key),
                    average_last_price: r.average_last_price,
                })
            })
            .collect()
    }

    /// Filter to one ticker and decode into its historical series.
    pub fn series_for(
        &self,
        ticker: &Ticker,
        encoding: DateEncoding,
    ) -> Result<HistoricalSeries, WarehouseError> {
        let records = self.filter_ticker(ticker)?.to_records(encoding)?;
        Ok(HistoricalSeries::new(ticker.clone(), records))
    }

    /// Distinct tickers in first-seen order.
    pub fn tickers(&self) -> Result<Vec<String>, WarehouseError> {
        let mut seen: Vec<String> = Vec::new();
        for row in self.rows()? {
            if !seen.contains(&row.ticker) {
                seen.push(row.ticker);
            }
        }
        Ok(seen)
    }

    /// BLAKE3 fingerprint of the table contents, row order included.
    pub fn dataset_hash(&self) -> Result<String, WarehouseError> {
        let mut hasher = blake3::Hasher::new();
        for row in self.rows()? {
            hasher.update(row.ticker.as_bytes());
            hasher.update(&[0]);
            hasher.update(&row.date_key.to_le_bytes());
            hasher.update(&row.average_last_price.to_bits().to_le_bytes());
        }
        Ok(hasher.finalize().to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ticker: &str, key: i64, price: f64) -> RawPriceRow {
        RawPriceRow {
            ticker: ticker.into(),
            date_key: key,
            average_last_price: price,
        }
    }

    fn sample() -> PriceTable {
        PriceTable::from_rows(&[
            row("AAPL", 240102, 185.0),
            row("MSFT", 240102, 370.0),
            row("AAPL", 240103, 184.0),
            row("AAPL", 240101, 183.0),
            row("MSFT", 240103, 372.0),
        ])
        .unwrap()
    }

    #[test]
    fn filter_keeps_only_ticker_sorted_by_date() {
        let aapl = sample().filter_ticker(&Ticker::new("AAPL").unwrap()).unwrap();
        let rows = aapl.rows().unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.ticker == "AAPL"));
        let keys: Vec<i64> = rows.iter().map(|r| r.date_key).collect();
        assert_eq!(keys, vec![240101, 240102, 240103]);
    }

    #[test]
    fn filter_does_not_touch_source() {
        let table = sample();
        let _ = table.filter_ticker(&Ticker::new("MSFT").unwrap()).unwrap();
        assert_eq!(table.height(), 5);
    }

    #[test]
    fn unknown_ticker_filters_to_empty() {
        let none = sample().filter_ticker(&Ticker::new("TSLA").unwrap()).unwrap();
        assert!(none.is_empty());
        let series = sample()
            .series_for(&Ticker::new("TSLA").unwrap(), DateEncoding::Yymmdd)
            .unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn series_decodes_dates_with_encoding() {
        let series = sample()
            .series_for(&Ticker::new("MSFT").unwrap(), DateEncoding::Yymmdd)
            .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.records()[0].date.year, 2024);
        assert_eq!(series.values(), vec![370.0, 372.0]);
    }

    #[test]
    fn from_frame_rejects_wrong_types() {
        let df = DataFrame::new(vec![
            Column::new(TICKER.into(), vec!["AAPL"]),
            Column::new(DATE_KEY.into(), vec!["240101"]),
            Column::new(PRICE.into(), vec![1.0f64]),
        ])
        .unwrap();
        let err = PriceTable::from_frame(df).unwrap_err();
        assert!(matches!(err, WarehouseError::Schema(ref m) if m.contains(DATE_KEY)));
    }

    #[test]
    fn from_frame_rejects_missing_column() {
        let df = DataFrame::new(vec![Column::new(TICKER.into(), vec!["AAPL"])]).unwrap();
        assert!(matches!(
            PriceTable::from_frame(df),
            Err(WarehouseError::Schema(_))
        ));
    }

    #[test]
    fn dataset_hash_is_content_sensitive() {
        let a = sample().dataset_hash().unwrap();
        let b = sample().dataset_hash().unwrap();
        assert_eq!(a, b);
        let other = PriceTable::from_rows(&[row("AAPL", 240101, 183.5)])
            .unwrap()
            .dataset_hash()
            .unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn tickers_in_first_seen_order() {
        assert_eq!(sample().tickers().unwrap(), vec!["AAPL", "MSFT"]);
    }
}
