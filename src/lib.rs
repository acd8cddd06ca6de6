//! DB Query Export Library
//!
//! This library runs a list of SQL queries against PostgreSQL, MySQL or SQLite and
//! writes each result to its own CSV file, and commits parameterized statements
//! row by row inside a single transaction.

pub mod config;
pub mod console;
pub mod db;
pub mod error;
pub mod input;
pub mod models;
pub mod tools;

pub use config::Config;
pub use console::{Console, Verbosity};
pub use error::{DbError, DbResult, ErrorKind};
