//! Configuration handling for the query exporter.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::console::Verbosity;
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionConfig, ConnectionDescriptor, DatabaseType};
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Folder created under the desktop (or home) directory when no output directory is given.
pub const DEFAULT_OUTPUT_FOLDER: &str = "Queries";

/// Record terminator of the written CSV files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LineEnding {
    /// `\r\n`
    #[default]
    Crlf,
    /// `\n`
    Lf,
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crlf => write!(f, "crlf"),
            Self::Lf => write!(f, "lf"),
        }
    }
}

/// Where and as whom to connect.
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// Database driver
    #[arg(long, value_enum, default_value = "postgres", env = "EXPORT_DB_DRIVER")]
    pub driver: DatabaseType,

    /// Connection descriptor: user[/password]@host[:port]/database.
    /// For SQLite, the database file path.
    #[arg(long, value_name = "DESCRIPTOR", env = "EXPORT_DB_CONNECT", hide_env_values = true)]
    pub connect: Option<String>,

    /// Database user (ignored when --connect is given)
    #[arg(long, env = "EXPORT_DB_USER")]
    pub user: Option<String>,

    /// Database host (ignored when --connect is given)
    #[arg(long, env = "EXPORT_DB_HOST")]
    pub host: Option<String>,

    /// Database port, defaults to the driver's standard port
    #[arg(long, env = "EXPORT_DB_PORT")]
    pub port: Option<u16>,

    /// Database name, or the database file path for SQLite
    #[arg(long, env = "EXPORT_DB_NAME")]
    pub database: Option<String>,

    /// Database password; prompted for on the terminal when absent
    #[arg(long, env = "EXPORT_DB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "EXPORT_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,
}

impl ConnectionArgs {
    /// Build the connection configuration for this run.
    ///
    /// `prompt` is asked for the password only when a server database is targeted
    /// and neither the descriptor nor `--password` carries one.
    pub fn resolve<P>(&self, prompt: P) -> DbResult<ConnectionConfig>
    where
        P: FnOnce(&str) -> DbResult<String>,
    {
        let timeout = Duration::from_secs(self.connect_timeout);

        if !self.driver.needs_secret() {
            let path = self
                .database
                .as_deref()
                .or(self.connect.as_deref())
                .ok_or_else(|| {
                    DbError::invalid_input("SQLite needs a database file: use --database <PATH>")
                })?;
            return Ok(ConnectionConfig::sqlite(path).with_connect_timeout(timeout));
        }

        let mut descriptor = match &self.connect {
            Some(text) => text.parse::<ConnectionDescriptor>()?,
            None => {
                let user = self
                    .user
                    .clone()
                    .ok_or_else(|| DbError::invalid_input("Missing database user: use --user or --connect"))?;
                let database = self.database.clone().ok_or_else(|| {
                    DbError::invalid_input("Missing database name: use --database or --connect")
                })?;
                let host = self.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string());
                ConnectionDescriptor::new(user, None, host, self.port, database)
            }
        };

        if !descriptor.has_secret() {
            let secret = match &self.password {
                Some(password) => password.clone(),
                None => prompt(&format!(
                    "Password for {}@{}: ",
                    descriptor.user, descriptor.host
                ))?,
            };
            descriptor = descriptor.with_secret(secret);
        }

        Ok(ConnectionConfig::new(self.driver, descriptor).with_connect_timeout(timeout))
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run every query of a query list and write one CSV file per query
    Export(ExportArgs),
    /// Execute a statement once per data row inside a single transaction
    Commit(CommitArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    /// JSON file with the query list: [{"sql": ..., "description": ...}] or [[sql, description]]
    #[arg(long, value_name = "FILE", env = "EXPORT_QUERIES")]
    pub queries: PathBuf,

    /// Directory receiving the CSV files [default: <desktop>/Queries]
    #[arg(long, value_name = "DIR", env = "EXPORT_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Record terminator of the CSV files
    #[arg(long, value_enum, default_value = "crlf", env = "EXPORT_LINE_ENDING")]
    pub line_ending: LineEnding,

    /// Per-query timeout in seconds; no limit when absent
    #[arg(long, value_name = "SECS", env = "EXPORT_QUERY_TIMEOUT")]
    pub query_timeout: Option<u64>,

    /// Write binary columns as base64 even when they hold UTF-8 text
    #[arg(long)]
    pub binary_as_base64: bool,
}

impl ExportArgs {
    pub fn new(queries: impl Into<PathBuf>) -> Self {
        Self {
            queries: queries.into(),
            output_dir: None,
            line_ending: LineEnding::default(),
            query_timeout: None,
            binary_as_base64: false,
        }
    }

    pub fn query_timeout_duration(&self) -> Option<Duration> {
        self.query_timeout.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Args)]
#[command(group(
    ArgGroup::new("statement_source")
        .required(true)
        .args(["statement", "statement_file"])
))]
pub struct CommitArgs {
    /// Statement to execute; `{}`/`{N}` or native placeholders take the row values
    #[arg(long, value_name = "SQL")]
    pub statement: Option<String>,

    /// File holding the statement to execute
    #[arg(long, value_name = "FILE")]
    pub statement_file: Option<PathBuf>,

    /// Rows to bind: a JSON array of arrays, or a CSV file
    #[arg(long, value_name = "FILE")]
    pub data: Option<PathBuf>,

    /// The CSV data file has no header record
    #[arg(long)]
    pub no_header: bool,

    /// Per-statement timeout in seconds; no limit when absent
    #[arg(long, value_name = "SECS", env = "EXPORT_STATEMENT_TIMEOUT")]
    pub statement_timeout: Option<u64>,
}

impl CommitArgs {
    pub fn statement_timeout_duration(&self) -> Option<Duration> {
        self.statement_timeout.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "db-query-export",
    about = "Run a list of SQL queries and export each result to a CSV file",
    version,
    author
)]
pub struct Config {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, env = "EXPORT_LOG_LEVEL", global = true)]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "EXPORT_JSON_LOGS", global = true)]
    pub json_logs: bool,

    /// Append log output to this file instead of stderr
    #[arg(long, value_name = "FILE", env = "EXPORT_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Print cursor and per-row progress
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Print nothing but errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            connection: ConnectionArgs {
                driver: DatabaseType::PostgreSQL,
                connect: None,
                user: None,
                host: None,
                port: None,
                database: None,
                password: None,
                connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            json_logs: false,
            log_file: None,
            verbose: false,
            quiet: false,
            command: Command::Export(ExportArgs::new("queries.json")),
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn no_prompt(_: &str) -> DbResult<String> {
        panic!("password prompt should not be used")
    }

    #[test]
    fn test_default_config() {
        let config = Config::default_config();
        assert_eq!(config.connection.driver, DatabaseType::PostgreSQL);
        assert_eq!(config.connection.connect_timeout, DEFAULT_CONNECT_TIMEOUT_SECS);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.verbosity(), Verbosity::Normal);
    }

    #[test]
    fn test_parse_export_command() {
        let config = Config::try_parse_from([
            "db-query-export",
            "--driver",
            "mysql",
            "--connect",
            "app@db:3307/sales",
            "export",
            "--queries",
            "q.json",
            "--line-ending",
            "lf",
            "-v",
        ])
        .unwrap();

        assert_eq!(config.connection.driver, DatabaseType::MySQL);
        assert_eq!(config.verbosity(), Verbosity::Verbose);
        match config.command {
            Command::Export(args) => {
                assert_eq!(args.queries, PathBuf::from("q.json"));
                assert_eq!(args.line_ending, LineEnding::Lf);
                assert_eq!(args.query_timeout_duration(), None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_commit_requires_a_statement() {
        let result = Config::try_parse_from(["db-query-export", "commit", "--data", "rows.csv"]);
        assert!(result.is_err());

        let config = Config::try_parse_from([
            "db-query-export",
            "commit",
            "--statement",
            "DELETE FROM t",
            "--statement-timeout",
            "5",
        ])
        .unwrap();
        match config.command {
            Command::Commit(args) => {
                assert_eq!(args.statement.as_deref(), Some("DELETE FROM t"));
                assert_eq!(args.statement_timeout_duration(), Some(Duration::from_secs(5)));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        let result = Config::try_parse_from([
            "db-query-export",
            "-v",
            "-q",
            "export",
            "--queries",
            "q.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_descriptor_with_secret_skips_prompt() {
        let mut args = Config::default_config().connection;
        args.connect = Some("scott/tiger@db:5433/hr".to_string());

        let config = args.resolve(no_prompt).unwrap();
        assert_eq!(config.db_type, DatabaseType::PostgreSQL);
        assert_eq!(config.descriptor.secret.as_deref(), Some("tiger"));
        assert_eq!(config.descriptor.port, Some(5433));
        assert!(!config.writable);
    }

    #[test]
    fn test_resolve_from_parts_prompts_for_password() {
        let mut args = Config::default_config().connection;
        args.user = Some("scott".to_string());
        args.database = Some("hr".to_string());

        let config = args
            .resolve(|prompt| {
                assert_eq!(prompt, "Password for scott@localhost: ");
                Ok("entered".to_string())
            })
            .unwrap();
        assert_eq!(config.descriptor.host, DEFAULT_HOST);
        assert_eq!(config.descriptor.secret.as_deref(), Some("entered"));
    }

    #[test]
    fn test_resolve_password_option_wins_over_prompt() {
        let mut args = Config::default_config().connection;
        args.connect = Some("scott@db/hr".to_string());
        args.password = Some("from-env".to_string());

        let config = args.resolve(no_prompt).unwrap();
        assert_eq!(config.descriptor.secret.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_resolve_sqlite_never_prompts() {
        let mut args = Config::default_config().connection;
        args.driver = DatabaseType::SQLite;
        args.database = Some("/tmp/data.db".to_string());

        let config = args.resolve(no_prompt).unwrap();
        assert_eq!(config.db_type, DatabaseType::SQLite);
        assert_eq!(config.descriptor.database, "/tmp/data.db");
    }

    #[test]
    fn test_resolve_missing_user_is_invalid_input() {
        let mut args = Config::default_config().connection;
        args.database = Some("hr".to_string());

        let err = args.resolve(no_prompt).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
