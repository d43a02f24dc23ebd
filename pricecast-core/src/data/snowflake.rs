//! Snowflake warehouse over the SQL REST API (v2).
//!
//! Statements are submitted with positional bindings, so ticker values never
//! reach the SQL text. Long-running statements (HTTP 202) are polled until
//! they finish or the statement timeout elapses, and multi-partition results
//! are fetched partition by partition.
//!
//! Retrying transient failures is the caller's job; this module only maps
//! HTTP outcomes onto [`WarehouseError`] variants that say whether a retry
//! makes sense.

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::warehouse::{
    Connection, PriceQuery, RawPriceRow, Warehouse, WarehouseError, WarehouseSession,
};

/// Connection settings. The bearer token is read from `token_env` at open time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnowflakeSettings {
    pub account: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// `KEYPAIR_JWT` or `OAUTH`.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Override for the API host, e.g. a private-link URL.
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_token_env() -> String {
    "SNOWFLAKE_TOKEN".into()
}

fn default_token_type() -> String {
    "KEYPAIR_JWT".into()
}

fn default_timeout_secs() -> u64 {
    60
}

impl SnowflakeSettings {
    pub fn api_base(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.snowflakecomputing.com", self.account),
        }
    }
}

// ─── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    statement_handle: Option<String>,
    #[serde(default)]
    statement_status_url: Option<String>,
    #[serde(default)]
    result_set_meta_data: Option<ResultSetMetaData>,
    #[serde(default)]
    data: Option<Vec<Vec<Option<String>>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetaData {
    row_type: Vec<RowType>,
    #[serde(default)]
    partition_info: Vec<PartitionInfo>,
}

#[derive(Debug, Deserialize)]
struct RowType {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartitionInfo {
    #[allow(dead_code)]
    row_count: u64,
}

#[derive(Debug, Deserialize)]
struct PartitionResponse {
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

/// Column positions of the three selected fields in a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnIndex {
    ticker: usize,
    date: usize,
    price: usize,
}

impl ColumnIndex {
    fn from_row_type(row_type: &[RowType]) -> Result<Self, WarehouseError> {
        let find = |name: &str| {
            row_type
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| WarehouseError::Schema(format!("result has no column '{name}'")))
        };
        Ok(Self {
            ticker: find("ticker")?,
            date: find("date")?,
            price: find("average_last_price")?,
        })
    }
}

// ─── Warehouse ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SnowflakeWarehouse {
    settings: SnowflakeSettings,
}

impl SnowflakeWarehouse {
    pub fn new(settings: SnowflakeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SnowflakeSettings {
        &self.settings
    }
}

impl Warehouse for SnowflakeWarehouse {
    fn name(&self) -> &str {
        "snowflake"
    }

    fn open(&self) -> Result<WarehouseSession, WarehouseError> {
        let token = std::env::var(&self.settings.token_env).map_err(|_| {
            WarehouseError::Authentication(format!(
                "environment variable {} is not set",
                self.settings.token_env
            ))
        })?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.settings.timeout_secs + 30))
            .user_agent(concat!("pricecast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WarehouseError::Unreachable(format!("failed to build HTTP client: {e}")))?;

        info!(account = %self.settings.account, "opening Snowflake session");
        Ok(WarehouseSession::new(
            self.name(),
            Box::new(SnowflakeConnection {
                settings: self.settings.clone(),
                client,
                token,
            }),
        ))
    }
}

struct SnowflakeConnection {
    settings: SnowflakeSettings,
    client: reqwest::blocking::Client,
    token: String,
}

impl SnowflakeConnection {
    fn statements_url(&self) -> String {
        format!("{}/api/v2/statements", self.settings.api_base())
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, WarehouseError> {
        self.client
            .get(url)
            .bearer_auth(&self.token)
            .header("X-Snowflake-Authorization-Token-Type", &self.settings.token_type)
            .header("Accept", "application/json")
            .send()
            .map_err(map_transport_error)
    }

    /// Submit the statement and wait for its first partition.
    fn submit(&self, query: &PriceQuery) -> Result<StatementResponse, WarehouseError> {
        let body = statement_body(&self.settings, query);
        let resp = self
            .client
            .post(self.statements_url())
            .bearer_auth(&self.token)
            .header("X-Snowflake-Authorization-Token-Type", &self.settings.token_type)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .map_err(map_transport_error)?;

        match resp.status().as_u16() {
            200 => read_statement(resp),
            202 => self.wait_for(read_statement(resp)?),
            _ => Err(failure(resp)),
        }
    }

    /// Poll an in-progress statement until it completes or times out.
    fn wait_for(&self, pending: StatementResponse) -> Result<StatementResponse, WarehouseError> {
        let status_url = match (&pending.statement_status_url, &pending.statement_handle) {
            (Some(path), _) => format!("{}{}", self.settings.api_base(), path),
            (None, Some(handle)) => format!("{}/{}", self.statements_url(), handle),
            (None, None) => {
                return Err(WarehouseError::Schema(
                    "asynchronous response without statement handle".into(),
                ))
            }
        };

        let deadline = Instant::now() + Duration::from_secs(self.settings.timeout_secs);
        let mut delay = Duration::from_millis(250);
        loop {
            if Instant::now() >= deadline {
                return Err(WarehouseError::StatementTimeout {
                    secs: self.settings.timeout_secs,
                });
            }
            std::thread::sleep(delay);
            delay = (delay * 2).min(Duration::from_secs(2));

            let resp = self.get(&status_url)?;
            match resp.status().as_u16() {
                200 => return read_statement(resp),
                202 => debug!("statement still executing"),
                _ => return Err(failure(resp)),
            }
        }
    }

    fn fetch_partition(&self, handle: &str, partition: usize) -> Result<Vec<Vec<Option<String>>>, WarehouseError> {
        let url = format!("{}/{}?partition={}", self.statements_url(), handle, partition);
        let resp = self.get(&url)?;
        if resp.status().as_u16() != 200 {
            return Err(failure(resp));
        }
        let body: PartitionResponse = resp
            .json()
            .map_err(|e| WarehouseError::Schema(format!("partition {partition}: {e}")))?;
        Ok(body.data)
    }
}

impl Connection for SnowflakeConnection {
    fn query_prices(&mut self, query: &PriceQuery) -> Result<Vec<RawPriceRow>, WarehouseError> {
        let first = self.submit(query)?;
        let meta = first
            .result_set_meta_data
            .as_ref()
            .ok_or_else(|| WarehouseError::Schema("response has no result metadata".into()))?;
        let columns = ColumnIndex::from_row_type(&meta.row_type)?;

        let mut rows = parse_rows(first.data.as_deref().unwrap_or_default(), columns)?;
        if meta.partition_info.len() > 1 {
            let handle = first
                .statement_handle
                .as_deref()
                .ok_or_else(|| WarehouseError::Schema("partitioned result without handle".into()))?;
            for partition in 1..meta.partition_info.len() {
                let data = self.fetch_partition(handle, partition)?;
                rows.extend(parse_rows(&data, columns)?);
            }
        }

        info!(rows = rows.len(), "Snowflake query complete");
        Ok(rows)
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Wait used for a 429 that carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

fn statement_body(settings: &SnowflakeSettings, query: &PriceQuery) -> Value {
    let mut bindings = Map::new();
    for (i, ticker) in query.tickers().iter().enumerate() {
        bindings.insert(
            (i + 1).to_string(),
            json!({ "type": "TEXT", "value": ticker.as_str() }),
        );
    }
    if bindings.is_empty() {
        // `IN (?)` still needs one binding; a NULL matches nothing.
        bindings.insert("1".into(), json!({ "type": "TEXT", "value": null }));
    }

    let mut body = json!({
        "statement": query.sql(),
        "timeout": settings.timeout_secs,
        "database": settings.database,
        "schema": settings.schema,
        "warehouse": settings.warehouse,
        "bindings": bindings,
    });
    if let (Some(role), Some(obj)) = (&settings.role, body.as_object_mut()) {
        obj.insert("role".into(), Value::String(role.clone()));
    }
    body
}

fn read_statement(resp: reqwest::blocking::Response) -> Result<StatementResponse, WarehouseError> {
    resp.json::<StatementResponse>()
        .map_err(|e| WarehouseError::Schema(format!("failed to parse statement response: {e}")))
}

/// Best-effort body of an error response; may not be JSON at all.
fn error_body(resp: reqwest::blocking::Response) -> StatementResponse {
    resp.json().unwrap_or_default()
}

/// Seconds from a `Retry-After` header given in delta-seconds form.
fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// Classify a non-success response, reading headers before the body.
fn failure(resp: reqwest::blocking::Response) -> WarehouseError {
    let status = resp.status().as_u16();
    let retry_after = retry_after_secs(resp.headers());
    status_error(status, retry_after, &error_body(resp))
}

fn map_transport_error(e: reqwest::Error) -> WarehouseError {
    if e.is_connect() || e.is_timeout() {
        WarehouseError::Unreachable(e.to_string())
    } else {
        WarehouseError::Query(e.to_string())
    }
}

/// Classify a non-success HTTP status.
fn status_error(status: u16, retry_after: Option<u64>, body: &StatementResponse) -> WarehouseError {
    let message = match (&body.code, &body.message) {
        (Some(code), Some(msg)) => format!("{code}: {msg}"),
        (None, Some(msg)) => msg.clone(),
        (Some(code), None) => code.clone(),
        (None, None) => format!("HTTP {status}"),
    };
    match status {
        401 | 403 => WarehouseError::Authentication(message),
        408 => WarehouseError::Unreachable(message),
        429 => WarehouseError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        500..=599 => WarehouseError::Server { status, message },
        _ => WarehouseError::Query(message),
    }
}

fn parse_rows(data: &[Vec<Option<String>>], cols: ColumnIndex) -> Result<Vec<RawPriceRow>, WarehouseError> {
    let field = |row: &Vec<Option<String>>, idx: usize, name: &str, n: usize| {
        row.get(idx)
            .cloned()
            .flatten()
            .ok_or_else(|| WarehouseError::Schema(format!("row {n}: null or missing {name}")))
    };

    data.iter()
        .enumerate()
        .map(|(n, row)| {
            let ticker = field(row, cols.ticker, "ticker", n)?;
            let date = field(row, cols.date, "date", n)?;
            let price = field(row, cols.price, "average_last_price", n)?;

            // NUMBER columns may come back as "240102" or "240102.000".
            let date_key = date
                .parse::<i64>()
                .ok()
                .or_else(|| date.parse::<f64>().ok().filter(|v| v.fract() == 0.0).map(|v| v as i64))
                .ok_or_else(|| WarehouseError::Schema(format!("row {n}: bad date key '{date}'")))?;
            let average_last_price = price
                .parse::<f64>()
                .map_err(|_| WarehouseError::Schema(format!("row {n}: bad price '{price}'")))?;

            Ok(RawPriceRow {
                ticker,
                date_key,
                average_last_price,
            })
        })
        .collect()
}
