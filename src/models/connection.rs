//! Connection-related data models.
//!
//! This module defines the supported database types, the connection descriptor
//! (`user/secret@host:port/database`) and the configuration handed to the connector.

use crate::config::DEFAULT_CONNECT_TIMEOUT_SECS;
use crate::error::{DbError, DbResult};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Supported database types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    #[value(name = "postgres", alias = "postgresql")]
    PostgreSQL,
    /// Includes MariaDB
    #[value(name = "mysql", alias = "mariadb")]
    MySQL,
    #[value(name = "sqlite")]
    SQLite,
}

impl DatabaseType {
    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Get the default port for this database type.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::PostgreSQL => Some(5432),
            Self::MySQL => Some(3306),
            Self::SQLite => None,
        }
    }

    /// Whether the driver numbers its placeholders (`$1`, `$2`) instead of using `?`.
    pub fn numbered_placeholders(&self) -> bool {
        matches!(self, Self::PostgreSQL)
    }

    /// Whether connecting requires a password.
    pub fn needs_secret(&self) -> bool {
        !matches!(self, Self::SQLite)
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Where and as whom to connect.
///
/// Textual form is `user/secret@host:port/database`; the secret and the port may be
/// omitted. `Display` and `Debug` never reveal the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub user: String,
    /// Sensitive - never log
    pub secret: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    /// Database name, or the database file path for SQLite.
    pub database: String,
}

impl ConnectionDescriptor {
    pub fn new(
        user: impl Into<String>,
        secret: Option<String>,
        host: impl Into<String>,
        port: Option<u16>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            secret,
            host: host.into(),
            port,
            database: database.into(),
        }
    }

    /// Descriptor for a SQLite database file; only the path is meaningful.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::new("", None, "", None, path)
    }

    /// Replace the secret, typically with the one entered at runtime.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Port to use, falling back to the database type's default.
    pub fn port_or_default(&self, db_type: DatabaseType) -> Option<u16> {
        self.port.or(db_type.default_port())
    }

    fn parse_host_port(s: &str) -> DbResult<(String, Option<u16>)> {
        // Bracketed IPv6 literal, with or without a port
        if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(|| {
                DbError::invalid_input(format!("Unterminated IPv6 address in '{s}'"))
            })?;
            let port = match tail.strip_prefix(':') {
                Some(p) => Some(Self::parse_port(p)?),
                None if tail.is_empty() => None,
                None => {
                    return Err(DbError::invalid_input(format!(
                        "Unexpected characters after host in '{s}'"
                    )));
                }
            };
            return Ok((host.to_string(), port));
        }

        match s.rsplit_once(':') {
            Some((host, port)) => Ok((host.to_string(), Some(Self::parse_port(port)?))),
            None => Ok((s.to_string(), None)),
        }
    }

    fn parse_port(s: &str) -> DbResult<u16> {
        s.parse()
            .map_err(|_| DbError::invalid_input(format!("Invalid port '{s}'")))
    }
}

impl FromStr for ConnectionDescriptor {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // Host names never contain '@', secrets might
        let (credentials, location) = s.rsplit_once('@').ok_or_else(|| {
            DbError::invalid_input(
                "Connection descriptor must look like user/secret@host:port/database",
            )
        })?;

        let (user, secret) = match credentials.split_once('/') {
            Some((user, secret)) => (user, Some(secret.to_string())),
            None => (credentials, None),
        };
        if user.is_empty() {
            return Err(DbError::invalid_input(
                "Connection descriptor is missing the user name",
            ));
        }

        let (host_port, database) = location.split_once('/').ok_or_else(|| {
            DbError::invalid_input(format!(
                "Connection descriptor is missing the database after '{location}'"
            ))
        })?;
        if database.is_empty() {
            return Err(DbError::invalid_input(
                "Connection descriptor is missing the database name",
            ));
        }

        let (host, port) = Self::parse_host_port(host_port)?;
        if host.is_empty() {
            return Err(DbError::invalid_input(
                "Connection descriptor is missing the host",
            ));
        }

        Ok(Self::new(user, secret, host, port, database))
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user)?;
        if self.secret.is_some() {
            write!(f, "/****")?;
        }
        if self.host.contains(':') {
            write!(f, "@[{}]", self.host)?;
        } else {
            write!(f, "@{}", self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        write!(f, "/{}", self.database)
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("user", &self.user)
            .field("secret", &self.secret.as_ref().map(|_| "****"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

/// Configuration for the single database connection of a run.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub db_type: DatabaseType,
    pub descriptor: ConnectionDescriptor,
    /// Export runs read-only; commit runs need write access.
    pub writable: bool,
    pub connect_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(db_type: DatabaseType, descriptor: ConnectionDescriptor) -> Self {
        Self {
            db_type,
            descriptor,
            writable: false,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Shorthand for a SQLite database file.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::new(DatabaseType::SQLite, ConnectionDescriptor::sqlite(path))
    }

    pub fn writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Get a display-safe description of the connection target (credentials masked).
    pub fn masked_target(&self) -> String {
        match self.db_type {
            DatabaseType::SQLite => format!("sqlite:{}", self.descriptor.database),
            _ => self.descriptor.to_string(),
        }
    }
}
