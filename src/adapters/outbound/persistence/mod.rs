//! SQLite-backed `MappingStore` implementation (§4.6), grounded on the teacher's `db/mod.rs`:
//! a single `Database` struct wrapping a `SqlitePool`, schema created with `CREATE TABLE IF NOT
//! EXISTS` at startup, CRUD via raw `sqlx::query` + `.bind()` rather than the `query!` macros
//! (no network access to a dev database at build time).

mod schema;
mod sqlite_store;

#[cfg(test)]
mod tests;

pub use sqlite_store::SqliteStore;
