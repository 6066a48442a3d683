use std::io::Write;

use clap::Parser;
use futures::StreamExt;
use scim_query::{
    Builder, Connection, ConnectionError, DirectoryConfig, PageCursor, connection::LoggedQuery,
    observability::init_tracing,
};

#[derive(Parser, Debug)]
#[command(version, about = "Query SCIM 2.0 directories", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to config file
    #[arg(short, long, global = true, default_value = "scim-query.toml")]
    config: String,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Search the directory and print matching entries as JSON lines
    Search {
        /// Equality condition, `attribute=value` (repeatable, joined with `and`)
        #[arg(short = 'w', long = "where", value_parser = parse_condition)]
        conditions: Vec<(String, String)>,
        /// Filter expression appended verbatim
        #[arg(long)]
        raw: Option<String>,
        /// Attributes to return (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        attributes: Vec<String>,
        /// Maximum number of entries to print
        #[arg(short, long, default_value = "100")]
        limit: u32,
        /// Print the requests that would be sent instead of sending them
        #[arg(long)]
        pretend: bool,
    },
    /// Validate the configuration file and exit
    Check,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match DirectoryConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_tracing(&config.observability.logging) {
        eprintln!("Warning: {}", e);
    }

    match args.command {
        Command::Check => {
            println!("Configuration OK: {} ({})", config.name, config.driver.url);
        }
        Command::Search {
            conditions,
            raw,
            attributes,
            limit,
            pretend,
        } => {
            let connection = match Connection::from_config(&config) {
                Ok(connection) => connection,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            let mut query = connection.query();
            apply_conditions(&mut query, conditions, raw);
            if !attributes.is_empty() {
                query.select(attributes);
            }
            query.limit(limit);

            if pretend {
                run_pretend(&connection, query).await;
            } else {
                run_search(&connection, &query).await;
            }
        }
    }
}

fn apply_conditions(query: &mut Builder, conditions: Vec<(String, String)>, raw: Option<String>) {
    for (attribute, value) in conditions {
        query.where_equals(attribute, value);
    }
    if let Some(raw) = raw {
        query.where_raw(raw);
    }
}

async fn run_search(connection: &Connection, query: &Builder) {
    let cursor = query.cursor(connection);
    let mut stdout = std::io::stdout().lock();

    if let Err(e) = write_entries(cursor, query.limit_value(), &mut stdout).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[derive(Debug, thiserror::Error)]
enum OutputError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes at most `limit` entries as JSON lines. The cursor may page past the
/// limit; the surplus is discarded.
async fn write_entries(
    cursor: PageCursor,
    limit: u32,
    out: &mut impl Write,
) -> Result<usize, OutputError> {
    let mut entries = std::pin::pin!(cursor.into_stream().take(limit as usize));
    let mut written = 0;
    while let Some(entry) = entries.next().await {
        writeln!(out, "{}", entry?)?;
        written += 1;
    }
    Ok(written)
}

async fn run_pretend(connection: &Connection, query: Builder) {
    let log = connection
        .pretend(|connection| async move {
            if let Err(e) = query.cursor(&connection).try_collect().await {
                tracing::warn!(error = %e, "Pretended search failed");
            }
        })
        .await;

    for LoggedQuery { query, .. } in log {
        match serde_json::to_string(&query) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to encode query: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn parse_condition(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((attribute, value)) if !attribute.trim().is_empty() => {
            Ok((attribute.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected attribute=value, got '{}'", s)),
    }
}
