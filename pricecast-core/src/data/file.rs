//! File-backed warehouse: a Parquet or CSV export of `avg_last_price`.
//!
//! The export carries the warehouse column names (`ticker`, `date`,
//! `average_last_price`). The IN-filter, date ordering and type coercion all
//! run inside the polars lazy plan.

use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

use super::table::{PriceTable, DATE_KEY, PRICE, TICKER};
use super::warehouse::{
    Connection, PriceQuery, RawPriceRow, Warehouse, WarehouseError, WarehouseSession,
};

/// Export file format, from the path extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Parquet,
    Csv,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self, WarehouseError> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("parquet") | Some("pq") => Ok(ExportFormat::Parquet),
            Some("csv") => Ok(ExportFormat::Csv),
            _ => Err(WarehouseError::Source(format!(
                "unsupported export format: {} (expected .parquet or .csv)",
                path.display()
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileWarehouse {
    path: PathBuf,
}

impl FileWarehouse {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn scan(&self) -> Result<LazyFrame, WarehouseError> {
        match ExportFormat::from_path(&self.path)? {
            ExportFormat::Parquet => Ok(LazyFrame::scan_parquet(&self.path, Default::default())?),
            ExportFormat::Csv => Ok(LazyCsvReader::new(&self.path)
                .with_has_header(true)
                .finish()?),
        }
    }
}

impl Warehouse for FileWarehouse {
    fn name(&self) -> &str {
        "file"
    }

    fn open(&self) -> Result<WarehouseSession, WarehouseError> {
        if !self.path.is_file() {
            return Err(WarehouseError::Source(format!(
                "export file not found: {}",
                self.path.display()
            )));
        }
        Ok(WarehouseSession::new(
            self.name(),
            Box::new(FileConnection {
                warehouse: self.clone(),
            }),
        ))
    }
}

struct FileConnection {
    warehouse: FileWarehouse,
}

/// `ticker = t1 OR ticker = t2 OR ...`; matches nothing for an empty list.
fn ticker_predicate(query: &PriceQuery) -> Expr {
    query
        .tickers()
        .iter()
        .map(|t| col(TICKER).eq(lit(t.as_str())))
        .reduce(|acc, e| acc.or(e))
        .unwrap_or_else(|| lit(false))
}

impl Connection for FileConnection {
    fn query_prices(&mut self, query: &PriceQuery) -> Result<Vec<RawPriceRow>, WarehouseError> {
        let df = self
            .warehouse
            .scan()?
            .select([
                col("ticker").cast(DataType::String).alias(TICKER),
                col("date").cast(DataType::Int64).alias(DATE_KEY),
                col("average_last_price").cast(DataType::Float64).alias(PRICE),
            ])
            .filter(ticker_predicate(query))
            .sort(
                [DATE_KEY],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .collect()
            .map_err(|e| WarehouseError::Query(e.to_string()))?;

        info!(
            path = %self.warehouse.path.display(),
            rows = df.height(),
            "scanned price export"
        );
        PriceTable::from_frame(df)?.rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Ticker;
    use std::io::Write;

    fn write_csv(dir: &Path) -> PathBuf {
        let path = dir.join("avg_last_price.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "ticker,date,average_last_price").unwrap();
        writeln!(f, "AAPL,240103,186.5").unwrap();
        writeln!(f, "MSFT,240101,370.1").unwrap();
        writeln!(f, "AAPL,240101,185.0").unwrap();
        writeln!(f, "TSLA,240102,250.0").unwrap();
        writeln!(f, "AAPL,240102,185.7").unwrap();
        path
    }

    #[test]
    fn csv_export_is_filtered_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let wh = FileWarehouse::new(write_csv(dir.path()));
        let mut session = wh.open().unwrap();
        let rows = session
            .query_prices(&[Ticker::new("AAPL").unwrap(), Ticker::new("MSFT").unwrap()])
            .unwrap();

        let got: Vec<(&str, i64)> = rows.iter().map(|r| (r.ticker.as_str(), r.date_key)).collect();
        assert_eq!(
            got,
            vec![
                ("MSFT", 240101),
                ("AAPL", 240101),
                ("AAPL", 240102),
                ("AAPL", 240103)
            ]
        );
    }

    #[test]
    fn parquet_export_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.parquet");
        let mut df = DataFrame::new(vec![
            Column::new("ticker".into(), vec!["AAPL", "AAPL"]),
            Column::new("date".into(), vec![240102i64, 240101]),
            Column::new("average_last_price".into(), vec![2.0f64, 1.0]),
        ])
        .unwrap();
        let file = std::fs::File::create(&path).unwrap();
        ParquetWriter::new(file).finish(&mut df).unwrap();

        let mut session = FileWarehouse::new(&path).open().unwrap();
        let rows = session.query_prices(&[Ticker::new("AAPL").unwrap()]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date_key, 240101);
        assert_eq!(rows[0].average_last_price, 1.0);
    }

    #[test]
    fn missing_file_is_a_permanent_source_error() {
        let err = FileWarehouse::new("/nonexistent/prices.csv").open().unwrap_err();
        assert!(matches!(err, WarehouseError::Source(ref m) if m.contains("/nonexistent/prices.csv")));
        assert!(!err.is_transient());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(ExportFormat::from_path(Path::new("prices.xlsx")).is_err());
        assert_eq!(
            ExportFormat::from_path(Path::new("p.PARQUET")).unwrap(),
            ExportFormat::Parquet
        );
    }
}
