//! # orma-data-sqlx: SQLx backend for the Orma data layer
//!
//! Implements the [`Driver`](orma_data::Driver) boundary of `orma-data` over
//! a single `sqlx` connection, so descriptors, entity CRUD and the query
//! builder run against a real database.
//!
//! | Item | Description |
//! |------|-------------|
//! | [`SqlxDriver`] | `Driver` over `sqlx::AnyConnection` (MySQL or SQLite, chosen by URL scheme) |
//! | [`connect`] | Open a `Database` from a [`DatabaseConfig`](orma_core::DatabaseConfig) |
//! | [`SqlxErrorExt`] | Extension trait to convert `sqlx::Error` → `DataError` (`.into_data_error()`) |
//! | [`SqlxResult<T>`] | Type alias for `Result<T, DataError>` |
//!
//! # Feature flags
//!
//! | Feature  | Driver |
//! |----------|--------|
//! | `sqlite` | SQLite via `sqlx/sqlite` (default) |
//! | `mysql`  | MySQL / MariaDB via `sqlx/mysql` (default) |
//!
//! # Quick start
//!
//! ```ignore
//! use orma_core::{DatabaseConfig, OrmaConfig};
//! use orma_data::prelude::*;
//!
//! let config: DatabaseConfig = OrmaConfig::load("dev")?.section()?;
//! let mut db = orma_data_sqlx::connect(&config).await?;
//! let mut widget = Widget { mess: "x".into(), ..Default::default() };
//! widget.create(&mut db).await?;
//! ```

pub mod connect;
pub mod driver;
pub mod error;

pub use connect::{connect, connect_with_sink};
pub use driver::SqlxDriver;
pub use error::{SqlxErrorExt, SqlxResult};

/// Re-exports of the most commonly used types from both `orma-data` and this crate.
pub mod prelude {
    pub use crate::{connect, SqlxDriver, SqlxErrorExt};
    pub use orma_data::prelude::*;
}
