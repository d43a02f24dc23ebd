//! Warehouse access and the in-memory price table.

pub mod date_key;
pub mod file;
pub mod memory;
pub mod snowflake;
pub mod synthetic;
pub mod table;
pub mod warehouse;

pub use date_key::{decompose, DateEncoding};
pub use file::FileWarehouse;
pub use memory::MemoryWarehouse;
pub use snowflake::{SnowflakeSettings, SnowflakeWarehouse};
pub use synthetic::SyntheticWarehouse;
pub use table::{PriceTable, DATE_KEY, PRICE, TICKER};
pub use warehouse::{Connection, PriceQuery, RawPriceRow, Warehouse, WarehouseError, WarehouseSession};
