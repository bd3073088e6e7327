//! Postgres-backed implementation of `banner_core::store::Store`.

mod migrate;
mod sql;
mod store;

pub use migrate::run_migrations;
pub use store::PgStore;
