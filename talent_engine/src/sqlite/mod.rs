//! SQLite storage backend for the talent engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
