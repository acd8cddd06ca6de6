//! Database dispatch macros for reducing code duplication.
//!
//! The connection handle is an enum with one variant per driver. These macros
//! generate the match over its variants while keeping call sites linear.

/// Macro for generating database dispatch match arms.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(conn, {
///     MySql(c) => mysql::run(c).await,
///     Postgres(c) => postgres::run(c).await,
///     SQLite(c) => sqlite::run(c).await,
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($conn:expr, { $($variant:ident($c:ident) => $body:expr),+ $(,)? }) => {
        match $conn {
            $(
                $crate::db::connection::DbConnection::$variant($c) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;

#[cfg(test)]
mod tests {
    use crate::db::connection::DbConnection;
    use crate::models::DatabaseType;

    fn dispatch_name(conn: &DbConnection) -> &'static str {
        impl_db_dispatch!(conn, {
            MySql(_c) => "mysql",
            Postgres(_c) => "postgres",
            SQLite(_c) => "sqlite",
        })
    }

    #[tokio::test]
    async fn test_dispatch_matches_db_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dispatch.db");
        let config = crate::models::ConnectionConfig::sqlite(path.to_string_lossy()).writable(true);
        let conn = crate::db::Connector::new(crate::console::Console::quiet())
            .try_connect(&config)
            .await
            .unwrap();

        assert_eq!(dispatch_name(&conn), "sqlite");
        assert_eq!(conn.db_type(), DatabaseType::SQLite);
        crate::db::Connector::new(crate::console::Console::quiet())
            .close(conn)
            .await;
    }
}
