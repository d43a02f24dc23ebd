//! Price records and the per-ticker historical series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ticker::Ticker;
use crate::error::PipelineError;

/// Calendar date as decomposed from an integer date key.
///
/// Fields are stored exactly as decomposed; nothing here checks that the
/// combination exists on a calendar. Use [`CalendarDate::to_naive`] where a
/// real date is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarDate {
    pub year: i64,
    pub month: i64,
    pub day: i64,
}

impl CalendarDate {
    pub fn new(year: i64, month: i64, day: i64) -> Self {
        Self { year, month, day }
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        use chrono::Datelike;
        Self {
            year: i64::from(date.year()),
            month: i64::from(date.month()),
            day: i64::from(date.day()),
        }
    }

    /// The real calendar date, or `None` if the fields do not name one.
    pub fn to_naive(&self) -> Option<NaiveDate> {
        let year = i32::try_from(self.year).ok()?;
        let month = u32::try_from(self.month).ok()?;
        let day = u32::try_from(self.day).ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }

    pub fn is_valid(&self) -> bool {
        self.to_naive().is_some()
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// One row of `avg_last_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub ticker: Ticker,
    pub date: CalendarDate,
    pub average_last_price: f64,
}

/// The date-ascending price history of one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    ticker: Ticker,
    records: Vec<PriceRecord>,
}

impl HistoricalSeries {
    /// Build a series. Records are kept in the order given.
    pub fn new(ticker: Ticker, records: Vec<PriceRecord>) -> Self {
        Self { ticker, records }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.average_last_price).collect()
    }

    pub fn last(&self) -> Option<&PriceRecord> {
        self.records.last()
    }

    /// Fail with `InsufficientData` when no rows matched the ticker.
    pub fn require_non_empty(&self) -> Result<(), PipelineError> {
        if self.is_empty() {
            return Err(PipelineError::InsufficientData(format!(
                "no price history for {}",
                self.ticker
            )));
        }
        Ok(())
    }

    /// Every record date as a real calendar date.
    pub fn calendar_dates(&self) -> Result<Vec<NaiveDate>, PipelineError> {
        self.records
            .iter()
            .map(|r| {
                r.date.to_naive().ok_or_else(|| {
                    PipelineError::InvalidDateEncoding(format!(
                        "{} on {} is not a calendar date",
                        self.ticker, r.date
                    ))
                })
            })
            .collect()
    }

    /// Last record date as a real calendar date.
    pub fn last_calendar_date(&self) -> Result<NaiveDate, PipelineError> {
        self.require_non_empty()?;
        let last = &self.records[self.records.len() - 1];
        last.date.to_naive().ok_or_else(|| {
            PipelineError::InvalidDateEncoding(format!(
                "last {} date {} is not a calendar date",
                self.ticker, last.date
            ))
        })
    }
}
