use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eyre::{Context, Result, eyre};
use tracing::info;

use docstore::{CoordinationStore, Filter, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "docstore")]
#[command(author, version, about = "Inspect a coordination store", long_about = None)]
struct Cli {
    /// Path to the store database
    #[arg(short, long)]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List collections with document counts
    Collections,

    /// Print matching documents as JSON lines
    Find {
        /// Collection to search
        #[arg(required = true)]
        collection: String,

        /// Equality filter as field=value (repeatable)
        #[arg(long = "eq", value_name = "FIELD=VALUE")]
        eq: Vec<String>,
    },

    /// Delete every document in every collection
    Clear,
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .init();
}

fn parse_eq(raw: &str) -> Result<Filter> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| eyre!("Expected FIELD=VALUE, got '{}'", raw))?;
    Ok(match value.parse::<i64>() {
        Ok(n) => Filter::eq(field, n),
        Err(_) => Filter::eq(field, value),
    })
}

fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();
    let store = SqliteStore::open(&cli.store).context(format!("Failed to open store {}", cli.store.display()))?;

    match cli.command {
        Command::Collections => {
            for (name, count) in store.collections()? {
                println!("{name}\t{count}");
            }
        }
        Command::Find { collection, eq } => {
            let filters = eq.iter().map(|raw| parse_eq(raw)).collect::<Result<Vec<_>>>()?;
            for doc in store.find(&collection, &filters)? {
                println!("{}", serde_json::to_string(&doc)?);
            }
        }
        Command::Clear => {
            let mut total = 0;
            for (name, _) in store.collections()? {
                total += store.delete_many(&name, &[])?;
            }
            info!(total, "Cleared store");
            println!("Deleted {total} documents");
        }
    }

    Ok(())
}
