//! Opening and closing the single database connection of a run.
//!
//! One connection per run, no pool: the exporter runs every statement in sequence
//! on the same session. The handle is consumed by [`Connector::close`], so it cannot
//! be used or closed again afterwards.

use crate::console::Console;
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionConfig, DatabaseType};
use sqlx::mysql::MySqlConnectOptions;
use sqlx::postgres::PgConnectOptions;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, MySqlConnection, PgConnection, SqliteConnection};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Database-specific connection handle.
#[derive(Debug)]
pub enum DbConnection {
    MySql(MySqlConnection),
    Postgres(PgConnection),
    SQLite(SqliteConnection),
}

impl DbConnection {
    /// Get the database type for this connection.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbConnection::MySql(_) => DatabaseType::MySQL,
            DbConnection::Postgres(_) => DatabaseType::PostgreSQL,
            DbConnection::SQLite(_) => DatabaseType::SQLite,
        }
    }

    async fn close(self) -> DbResult<()> {
        impl_db_dispatch!(self, {
            MySql(c) => c.close().await?,
            Postgres(c) => c.close().await?,
            SQLite(c) => c.close().await?,
        });
        Ok(())
    }

    async fn server_version(&mut self) -> Option<String> {
        let result = impl_db_dispatch!(self, {
            MySql(c) => sqlx::query_scalar::<_, String>("SELECT version()").fetch_one(c).await,
            Postgres(c) => sqlx::query_scalar::<_, String>("SELECT version()").fetch_one(c).await,
            SQLite(c) => sqlx::query_scalar::<_, String>("SELECT sqlite_version()").fetch_one(c).await,
        });
        match result {
            Ok(version) => {
                debug!(version = %version, "Got server version");
                Some(version)
            }
            Err(e) => {
                warn!(error = %e, "Failed to get server version");
                None
            }
        }
    }
}

/// Opens and releases connections, narrating both to the console and the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct Connector {
    console: Console,
}

impl Connector {
    pub fn new(console: Console) -> Self {
        Self { console }
    }

    /// Open a connection, or report why it could not be opened.
    ///
    /// Makes exactly one attempt, bounded by the configured connect timeout.
    pub async fn try_connect(&self, config: &ConnectionConfig) -> DbResult<DbConnection> {
        info!(
            db_type = %config.db_type,
            target = %config.masked_target(),
            writable = config.writable,
            "Opening database connection"
        );

        let mut conn = match timeout(config.connect_timeout, open(config)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(DbError::connection(
                    format!(
                        "Timed out after {}s",
                        config.connect_timeout.as_secs()
                    ),
                    format!(
                        "Check that the {} server is running and reachable",
                        config.db_type
                    ),
                ));
            }
        };

        conn.server_version().await;
        Ok(conn)
    }

    /// Open a connection; on failure log and print the reason and return `None`.
    pub async fn connect(&self, config: &ConnectionConfig) -> Option<DbConnection> {
        self.console
            .status_inline("Opening connection to database...");

        match self.try_connect(config).await {
            Ok(conn) => {
                self.console.status("connected!");
                self.console.status("");
                info!("Connected to database");
                Some(conn)
            }
            Err(e) => {
                error!(
                    error = %e,
                    suggestion = e.suggestion().unwrap_or_default(),
                    "Unable to connect to database!"
                );
                error!("Database connection closed.");
                self.console.status("unable to connect to database!");
                self.console.status(&e);
                self.console.status("Database connection closed.");
                self.console.status("");
                None
            }
        }
    }

    /// Release the connection. Errors while closing are logged and otherwise ignored.
    pub async fn close(&self, conn: DbConnection) {
        if let Err(e) = conn.close().await {
            warn!(error = %e, "Error while closing database connection");
        }
        self.console.status("Database connection closed.");
        self.console.status("");
        info!("Database connection closed.");
    }
}

async fn open(config: &ConnectionConfig) -> DbResult<DbConnection> {
    let descriptor = &config.descriptor;
    let port = descriptor.port_or_default(config.db_type);

    match config.db_type {
        DatabaseType::PostgreSQL => {
            let mut options = PgConnectOptions::new()
                .host(&descriptor.host)
                .username(&descriptor.user)
                .database(&descriptor.database);
            if let Some(port) = port {
                options = options.port(port);
            }
            if let Some(secret) = &descriptor.secret {
                options = options.password(secret);
            }

            let conn = PgConnection::connect_with(&options)
                .await
                .map_err(|e| connect_error(config.db_type, e))?;
            Ok(DbConnection::Postgres(conn))
        }
        DatabaseType::MySQL => {
            let mut options = MySqlConnectOptions::new()
                .host(&descriptor.host)
                .username(&descriptor.user)
                .database(&descriptor.database)
                .charset("utf8mb4");
            if let Some(port) = port {
                options = options.port(port);
            }
            if let Some(secret) = &descriptor.secret {
                options = options.password(secret);
            }

            let conn = MySqlConnection::connect_with(&options)
                .await
                .map_err(|e| connect_error(config.db_type, e))?;
            Ok(DbConnection::MySql(conn))
        }
        DatabaseType::SQLite => {
            let mut options = SqliteConnectOptions::new().filename(&descriptor.database);
            if config.writable {
                options = options.create_if_missing(true).read_only(false);
            } else {
                options = options.read_only(true);
            }

            let conn = SqliteConnection::connect_with(&options)
                .await
                .map_err(|e| connect_error(config.db_type, e))?;
            Ok(DbConnection::SQLite(conn))
        }
    }
}

fn connect_error(db_type: DatabaseType, error: sqlx::Error) -> DbError {
    DbError::connection(
        format!("Failed to connect: {}", error),
        connection_suggestion(db_type, &error),
    )
}

fn connection_suggestion(db_type: DatabaseType, error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return format!(
            "Check that the {} server is running and accessible",
            db_type
        );
    }

    if error_str.contains("authentication") || error_str.contains("password") {
        return "Verify the user name and password".to_string();
    }

    if error_str.contains("does not exist") || error_str.contains("unknown database") {
        return "Check that the database name exists".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    match db_type {
        DatabaseType::PostgreSQL | DatabaseType::MySQL => {
            "Verify the connection descriptor: user/secret@host:port/database".to_string()
        }
        DatabaseType::SQLite => "Verify the database file exists and is readable".to_string(),
    }
}
