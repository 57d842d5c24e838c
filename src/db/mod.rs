//! Database layer
//!
//! Supports:
//! - SQLite (default, single-binary deployment)
//! - MySQL (larger deployments)
//!
//! The driver is selected by `database.driver`. Repositories hold a
//! [`DynDatabasePool`] and never know which backend they talk to.
//!
//! ```ignore
//! use hr_companion::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config.database).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub(crate) use pool::with_pool;
pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, LastInsertId, MysqlDatabase,
    SqliteDatabase,
};
