//! Domain types for PriceCast

pub mod forecast;
pub mod price;
pub mod ticker;
pub mod window;

pub use forecast::{CvFold, ErrorMetric, ForecastPoint, HyperparamResult};
pub use price::{CalendarDate, HistoricalSeries, PriceRecord};
pub use ticker::{Ticker, TickerError};
pub use window::{Window, WindowError};
