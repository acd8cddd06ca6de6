//! db-query-export - Main entry point.
//!
//! Runs a list of SQL queries and exports each result to a CSV file, or commits a
//! parameterized statement for every row of a data file.

use db_query_export::config::{CommitArgs, Command, Config, ExportArgs};
use db_query_export::db::QueryExecutor;
use db_query_export::input;
use db_query_export::tools::{CommitHandler, ExportHandler, default_output_dir};
use db_query_export::{Console, DbError, DbResult};
use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) -> DbResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let writer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| DbError::file(path, e))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json().with_writer(writer)).init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(config.log_file.is_none())
                    .with_writer(writer),
            )
            .init();
    }
    Ok(())
}

fn prompt_password(prompt: &str) -> DbResult<String> {
    rpassword::prompt_password(prompt)
        .map_err(|e| DbError::invalid_input(format!("Could not read password: {}", e)))
}

async fn export(config: &Config, args: &ExportArgs, console: Console) -> DbResult<()> {
    let queries = input::load_queries(&args.queries)?;
    let connection = config.connection.resolve(prompt_password)?;

    let executor = QueryExecutor::new(console)
        .with_timeout(args.query_timeout_duration())
        .with_decode_binary(!args.binary_as_base64);
    let handler = ExportHandler::new(
        console,
        args.output_dir.clone().unwrap_or_else(default_output_dir),
    )
    .with_executor(executor)
    .with_line_ending(args.line_ending);

    let summary = handler.run(&connection, &queries).await?;
    console.status(format!(
        "Exported {} of {} queries to {}",
        summary.files.len(),
        queries.len(),
        handler.output_dir().display()
    ));
    Ok(())
}

async fn commit(config: &Config, args: &CommitArgs, console: Console) -> DbResult<()> {
    let statement = match (&args.statement, &args.statement_file) {
        (Some(statement), _) => statement.clone(),
        (None, Some(path)) => input::load_statement(path)?,
        (None, None) => {
            return Err(DbError::invalid_input(
                "Provide the statement with --statement or --statement-file",
            ));
        }
    };
    let rows = match &args.data {
        Some(path) => input::load_rows(path, !args.no_header)?,
        None => Vec::new(),
    };
    let connection = config.connection.resolve(prompt_password)?;

    let executor = QueryExecutor::new(console).with_timeout(args.statement_timeout_duration());
    let summary = CommitHandler::new(console)
        .with_executor(executor)
        .run(&connection, &statement, &rows)
        .await?;
    console.status(format!(
        "{} {} statement(s) executed, {} row(s) affected.",
        summary.message(),
        summary.statements_executed,
        summary.rows_affected
    ));
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    if let Err(e) = init_tracing(&config) {
        eprintln!("Error: {}", e);
        return ExitCode::from(e.kind().exit_code());
    }

    let console = Console::new(config.verbosity());
    info!(
        driver = %config.connection.driver,
        "Starting db-query-export v{}",
        env!("CARGO_PKG_VERSION")
    );

    let result = match &config.command {
        Command::Export(args) => export(&config, args, console).await,
        Command::Commit(args) => commit(&config, args, console).await,
    };

    match result {
        Ok(()) => {
            info!("Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, kind = ?e.kind(), "Run failed");
            eprintln!("Error: {}", e);
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Hint: {}", suggestion);
            }
            ExitCode::from(e.kind().exit_code())
        }
    }
}
