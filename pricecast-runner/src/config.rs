//! Dashboard configuration (TOML).
//!
//! Every field has a default, so a missing file or a partial file is fine:
//!
//! ```toml
//! tickers = ["AAPL", "AMZN", "GOOGL", "MSFT", "TSLA"]
//! fit_budget_secs = 60
//! date_encoding = "yymmdd"
//!
//! [warehouse]
//! kind = "snowflake"
//! account = "acme-xy12345"
//! warehouse = "COMPUTE_WH"
//! database = "MARKET"
//! schema = "PUBLIC"
//! token_env = "SNOWFLAKE_TOKEN"
//!
//! [backtest]
//! initial = "30 days"
//! period = "20 days"
//! horizon = "9 days"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use pricecast_core::data::{
    DateEncoding, FileWarehouse, SnowflakeSettings, SnowflakeWarehouse, SyntheticWarehouse,
    Warehouse,
};
use pricecast_core::domain::{Ticker, Window};
use pricecast_core::models::ArimaOrder;

use crate::data_loader::RetryPolicy;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pricecast.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("failed to serialize config: {0}")]
    Serialize(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

// ─── Sections ────────────────────────────────────────────────────────

/// Where prices come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WarehouseConfig {
    Snowflake(SnowflakeSettings),
    /// Parquet or CSV export of `avg_last_price`.
    File { path: PathBuf },
    Synthetic { seed: u64, days: usize },
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        WarehouseConfig::Synthetic {
            seed: 42,
            days: 250,
        }
    }
}

impl WarehouseConfig {
    pub fn build(&self) -> Box<dyn Warehouse> {
        match self {
            WarehouseConfig::Snowflake(settings) => {
                Box::new(SnowflakeWarehouse::new(settings.clone()))
            }
            WarehouseConfig::File { path } => Box::new(FileWarehouse::new(path.clone())),
            WarehouseConfig::Synthetic { seed, days } => {
                Box::new(SyntheticWarehouse::new(*seed, *days))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.base_delay_ms))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArimaConfig {
    /// `[p, d, q]`
    pub order: [usize; 3],
    pub horizon: usize,
}

impl Default for ArimaConfig {
    fn default() -> Self {
        Self {
            order: [2, 1, 2],
            horizon: 30,
        }
    }
}

impl ArimaConfig {
    pub fn order(&self) -> ArimaOrder {
        ArimaOrder::new(self.order[0], self.order[1], self.order[2])
    }
}

/// Rolling-origin cross-validation windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvWindows {
    pub initial: Window,
    pub period: Window,
    pub horizon: Window,
}

impl CvWindows {
    pub fn new(initial: Window, period: Window, horizon: Window) -> Self {
        Self {
            initial,
            period,
            horizon,
        }
    }

    /// Windows for the backtest panel: 30 / 20 / 9 days.
    pub fn backtest_default() -> Self {
        Self::new(Window::days(30), Window::days(20), Window::days(9))
    }

    /// Windows for hyperparameter tuning: 30 / 30 / 10 days.
    pub fn tuning_default() -> Self {
        Self::new(Window::days(30), Window::days(30), Window::days(10))
    }
}

impl Default for CvWindows {
    fn default() -> Self {
        Self::backtest_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    pub changepoint_grid: Vec<f64>,
    pub seasonality_grid: Vec<f64>,
    #[serde(flatten)]
    pub windows: CvWindows,
    /// Evaluate grid cells on the rayon pool.
    pub parallel: bool,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            changepoint_grid: vec![0.001, 0.01, 0.1, 0.5],
            seasonality_grid: vec![0.01, 0.1, 1.0, 10.0],
            windows: CvWindows::tuning_default(),
            parallel: true,
        }
    }
}

// ─── Top level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricecastConfig {
    /// The fixed set offered by the ticker selector.
    pub tickers: Vec<Ticker>,
    /// Wall-clock budget per model fit, in seconds.
    pub fit_budget_secs: u64,
    pub date_encoding: DateEncoding,
    pub warehouse: WarehouseConfig,
    pub retry: RetryConfig,
    pub arima: ArimaConfig,
    pub backtest: CvWindows,
    pub tuning: TuningConfig,
}

impl Default for PricecastConfig {
    fn default() -> Self {
        let tickers = ["AAPL", "AMZN", "GOOGL", "MSFT", "TSLA"]
            .iter()
            .filter_map(|s| Ticker::new(s).ok())
            .collect();
        Self {
            tickers,
            fit_budget_secs: 60,
            date_encoding: DateEncoding::default(),
            warehouse: WarehouseConfig::default(),
            retry: RetryConfig::default(),
            arima: ArimaConfig::default(),
            backtest: CvWindows::backtest_default(),
            tuning: TuningConfig::default(),
        }
    }
}

impl PricecastConfig {
    /// Load and validate a config file that must exist.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            info!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn fit_budget(&self) -> Duration {
        Duration::from_secs(self.fit_budget_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.tickers.is_empty() {
            return invalid("tickers must not be empty".into());
        }
        for (i, t) in self.tickers.iter().enumerate() {
            if self.tickers[..i].contains(t) {
                return invalid(format!("ticker {t} is listed twice"));
            }
        }
        if self.fit_budget_secs == 0 {
            return invalid("fit_budget_secs must be at least 1".into());
        }
        if self.retry.max_retries > 10 {
            return invalid(format!(
                "retry.max_retries must be at most 10, got {}",
                self.retry.max_retries
            ));
        }

        let [p, d, q] = self.arima.order;
        if p > 10 || q > 10 || d > 2 {
            return invalid(format!(
                "arima.order [{p}, {d}, {q}] out of range (p, q <= 10, d <= 2)"
            ));
        }
        if self.arima.horizon == 0 {
            return invalid("arima.horizon must be at least 1".into());
        }

        for (name, grid) in [
            ("changepoint_grid", &self.tuning.changepoint_grid),
            ("seasonality_grid", &self.tuning.seasonality_grid),
        ] {
            if grid.is_empty() {
                return invalid(format!("tuning.{name} must not be empty"));
            }
            if let Some(v) = grid.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
                return invalid(format!("tuning.{name} values must be positive, got {v}"));
            }
        }

        match &self.warehouse {
            WarehouseConfig::Snowflake(s) => {
                for (name, value) in [
                    ("account", &s.account),
                    ("warehouse", &s.warehouse),
                    ("database", &s.database),
                    ("schema", &s.schema),
                    ("token_env", &s.token_env),
                ] {
                    if value.trim().is_empty() {
                        return invalid(format!("warehouse.{name} must not be empty"));
                    }
                }
                if s.timeout_secs == 0 {
                    return invalid("warehouse.timeout_secs must be at least 1".into());
                }
            }
            WarehouseConfig::File { path } => {
                if path.as_os_str().is_empty() {
                    return invalid("warehouse.path must not be empty".into());
                }
            }
            WarehouseConfig::Synthetic { days, .. } => {
                if *days == 0 {
                    return invalid("warehouse.days must be at least 1".into());
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_settings() {
        let c = PricecastConfig::default();
        let symbols: Vec<&str> = c.tickers.iter().map(|t| t.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "AMZN", "GOOGL", "MSFT", "TSLA"]);
        assert_eq!(c.arima.order(), ArimaOrder::new(2, 1, 2));
        assert_eq!(c.arima.horizon, 30);
        assert_eq!(c.backtest.initial.num_days(), 30);
        assert_eq!(c.backtest.period.num_days(), 20);
        assert_eq!(c.backtest.horizon.num_days(), 9);
        assert_eq!(c.tuning.windows.period.num_days(), 30);
        assert_eq!(c.tuning.windows.horizon.num_days(), 10);
        assert_eq!(c.tuning.changepoint_grid.len() * c.tuning.seasonality_grid.len(), 16);
        assert_eq!(c.date_encoding, DateEncoding::Yymmdd);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(PricecastConfig::from_toml("").unwrap(), PricecastConfig::default());
    }

    #[test]
    fn partial_toml_overrides_only_given_fields() {
        let c = PricecastConfig::from_toml(
            r#"
            tickers = ["nvda", "AMD"]
            date_encoding = "literal"

            [warehouse]
            kind = "file"
            path = "exports/avg_last_price.parquet"

            [backtest]
            initial = "8 weeks"
            period = "10d"
            horizon = "5 days"

            [tuning]
            changepoint_grid = [0.05]
            "#,
        )
        .unwrap();
        assert_eq!(c.tickers[0].as_str(), "NVDA");
        assert_eq!(c.date_encoding, DateEncoding::Literal);
        assert!(matches!(c.warehouse, WarehouseConfig::File { .. }));
        assert_eq!(c.backtest.initial.num_days(), 56);
        assert_eq!(c.tuning.changepoint_grid, vec![0.05]);
        assert_eq!(c.tuning.seasonality_grid.len(), 4);
        assert_eq!(c.tuning.windows.initial.num_days(), 30);
        assert_eq!(c.arima.horizon, 30);
    }

    #[test]
    fn snowflake_section_parses() {
        let c = PricecastConfig::from_toml(
            r#"
            [warehouse]
            kind = "snowflake"
            account = "acme-xy12345"
            warehouse = "COMPUTE_WH"
            database = "MARKET"
            schema = "PUBLIC"
            "#,
        )
        .unwrap();
        match c.warehouse {
            WarehouseConfig::Snowflake(s) => {
                assert_eq!(s.token_env, "SNOWFLAKE_TOKEN");
                assert_eq!(s.timeout_secs, 60);
                assert!(s.role.is_none());
            }
            other => panic!("expected snowflake, got {other:?}"),
        }
    }

    #[test]
    fn toml_roundtrip() {
        let c = PricecastConfig::default();
        let text = c.to_toml().unwrap();
        assert_eq!(PricecastConfig::from_toml(&text).unwrap(), c);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for bad in [
            "tickers = []",
            "tickers = [\"AAPL\", \"aapl\"]",
            "fit_budget_secs = 0",
            "[arima]\nhorizon = 0",
            "[arima]\norder = [2, 3, 2]",
            "[tuning]\nseasonality_grid = []",
            "[tuning]\nchangepoint_grid = [0.1, -1.0]",
            "[warehouse]\nkind = \"synthetic\"\nseed = 1\ndays = 0",
        ] {
            assert!(
                matches!(PricecastConfig::from_toml(bad), Err(ConfigError::Invalid(_))),
                "accepted: {bad}"
            );
        }
    }

    #[test]
    fn malformed_values_are_parse_errors() {
        assert!(matches!(
            PricecastConfig::from_toml("[backtest]\ninitial = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            PricecastConfig::from_toml("tickers = [\"BAD TICKER\"]"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            PricecastConfig::from_toml("date_encoding = \"julian\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let c = PricecastConfig::load_or_default(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(c, PricecastConfig::default());
        assert!(matches!(
            PricecastConfig::from_file(&dir.path().join("nope.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "fit_budget_secs = 5\n").unwrap();
        let c = PricecastConfig::load_or_default(&path).unwrap();
        assert_eq!(c.fit_budget(), Duration::from_secs(5));
    }
}
