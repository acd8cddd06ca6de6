//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Opening and closing the single connection of a run
//! - Query and commit execution
//! - Statement templates and parameter binding
//! - Type mappings from driver rows to cell values
//! - Database dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod connection;
pub mod executor;
pub mod params;
pub mod template;
pub mod types;

pub use connection::{Connector, DbConnection};
pub use executor::QueryExecutor;
pub use template::StatementTemplate;
