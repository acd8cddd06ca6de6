//! Data models for the query exporter.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;

// Re-export commonly used types
pub use connection::{ConnectionConfig, ConnectionDescriptor, DatabaseType};
pub use query::{
    CommitMode, CommitRow, CommitSummary, ExportSummary, ExportedFile, QueryParam, QueryResult,
    QuerySpec,
};
