//! Relational mapping and query layer.
//!
//! Plain Rust structs declare their table, key column and persisted
//! properties (usually through `#[derive(Entity)]` / `#[derive(Link)]`);
//! this crate derives the SQL for them, introspects column types once per
//! connection target, and executes everything through a [`Database`].
//!
//! | Concern | Items |
//! |---------|-------|
//! | Execution | [`Database`], [`Statement`], [`Cursor`], [`Params`], [`Driver`] |
//! | Metadata | [`Descriptor`], [`LinkDescriptor`], [`Registry`] |
//! | Entities | [`Entity`], [`Crud`], [`EntitySchema`] |
//! | Links | [`Link`], [`LinkCrud`], [`LinkSchema`] |
//! | Queries | [`QueryBuilder`], [`Pager`], [`Page`] |
//! | Diagnostics | [`DiagnosticSink`], [`TracingSink`] |

// Lets derive output (`::orma_data::...`) resolve inside this crate.
extern crate self as orma_data;

pub mod column;
pub mod cursor;
pub mod database;
pub mod diagnostics;
pub mod dialect;
pub mod driver;
pub mod entity;
pub mod error;
pub mod link;
pub mod link_meta;
pub mod meta;
pub mod page;
pub mod params;
pub mod query;
pub mod registry;
pub mod value;

pub use column::{column_name, ColumnDef, ColumnKind};
pub use cursor::Cursor;
pub use database::{Database, DatabaseOptions, Statement};
pub use diagnostics::{DiagnosticSink, TracingSink};
pub use dialect::{Dialect, LockMode};
pub use driver::{Driver, ExecOutcome};
pub use entity::{hydrate, Crud, Entity, EntitySchema, UNSAVED_ID};
pub use error::{DataError, DataResult};
pub use link::{Link, LinkCrud, LinkSchema, Side};
pub use link_meta::{LinkDescriptor, LINK_BUILTINS};
pub use meta::{expand_placeholders, Descriptor, ENTITY_BUILTINS, ID_PROPERTY};
pub use page::{Page, Pager};
pub use params::Params;
pub use query::{QueryBuilder, QueryKind};
pub use registry::Registry;
pub use value::{FromValue, Row, ToValue, Value};

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        Crud, Cursor, DataError, Database, DatabaseOptions, Entity, Link, LinkCrud, Page, Pager,
        Params, QueryBuilder, Value,
    };
}
