//! Export and commit drivers.
//!
//! This module contains the two operator-facing runs:
//! - `export`: run a query list and write one CSV file per query
//! - `commit`: run a statement for every data row inside one transaction
//! - `format`: file naming and CSV layout shared by the export run

pub mod commit;
pub mod export;
pub mod format;

pub use commit::CommitHandler;
pub use export::{ExportHandler, default_output_dir};

use crate::error::DbError;

/// Error reported when a run has no open connection to work with.
pub(crate) fn no_connection() -> DbError {
    DbError::connection(
        "No open database connection",
        "Check the connection settings and that the database is reachable",
    )
}
