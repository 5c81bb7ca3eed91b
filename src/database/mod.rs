//! Local SQLite store for search history.
//!
//! Provides connection management and schema migrations for the tables the
//! [`SqliteHistoryRepository`](crate::repository::sqlite::SqliteHistoryRepository)
//! reads and writes.
//!
//! # Usage
//!
//! ```no_run
//! use research_assistant::database::Database;
//!
//! let db = Database::open("history.db").expect("failed to open database");
//! let conn = db.connection();
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
