//! Orma: relational mapping and query layer for MySQL and SQLite.
//!
//! This facade crate re-exports the Orma sub-crates through a single
//! dependency with feature flags. Import everything you need with:
//!
//! ```ignore
//! use orma::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature  | Default | Crate                          |
//! |----------|---------|--------------------------------|
//! | `sqlx`   | **yes** | `orma-data-sqlx` (no drivers)  |
//! | `sqlite` | **yes** | `orma-data-sqlx/sqlite`        |
//! | `mysql`  | **yes** | `orma-data-sqlx/mysql`         |
//!
//! # Example
//!
//! ```ignore
//! use orma::prelude::*;
//!
//! #[derive(Debug, Clone, Default, Entity)]
//! #[entity(table = "widget", key = "widget_id")]
//! pub struct Widget {
//!     pub id: i64,
//!     pub a_date: i64,
//!     pub mess: String,
//! }
//!
//! orma::core::init_tracing();
//! let config: DatabaseConfig = OrmaConfig::load("dev")?.section()?;
//! let mut db = orma::sqlx::connect(&config).await?;
//!
//! let mut widget = Widget { a_date: 1_700_000_000, mess: "hello".into(), ..Default::default() };
//! widget.create(&mut db).await?;
//! let page = QueryBuilder::<Widget>::select()
//!     .filter_like("mess", "he%")
//!     .pager(Pager::new(1, 20))?
//!     .fetch_page(&mut db)
//!     .await?;
//! ```

// The derives use `proc-macro-crate` to detect whether the user depends on
// `orma` (facade) or `orma-data`, and generate `::orma::data::...` paths
// accordingly.
extern crate self as orma;

pub use orma_core as core;
pub use orma_data as data;

#[cfg(feature = "sqlx")]
pub use orma_data_sqlx as sqlx;

pub use orma_macros::{Entity, Link};

/// Everything needed to declare entities and run queries.
pub mod prelude {
    pub use orma_core::prelude::*;
    pub use orma_data::prelude::*;
    pub use orma_macros::{Entity, Link};

    #[cfg(feature = "sqlx")]
    pub use orma_data_sqlx::prelude::*;
}
