//! SQLVault CLI - open, import into, export and wipe vault databases.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlvault_import::{clear_database, JsonImporter};
use sqlvault_worker::{database_filename, Worker};
use tracing::info;

/// SQLVault command-line interface.
#[derive(Parser)]
#[command(name = "sqlvault")]
#[command(about = "Password-gated SQLite databases with JSON import")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Directory holding database files
    #[arg(long, default_value = ".", global = true)]
    base_dir: PathBuf,

    /// Database password, when the database is (or should be) protected
    #[arg(short, long, global = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or open a database, protecting it when a password is given
    Init {
        /// Logical database name (file becomes <name>.sqlite3)
        name: String,
    },
    /// Import a JSON file into a table tree
    Import {
        /// Logical database name
        name: String,
        /// Root table name
        table: String,
        /// Path to the JSON file
        file: PathBuf,
    },
    /// Export the database file's bytes
    Export {
        /// Logical database name
        name: String,
        /// Output path (defaults to <name>.sqlite3 in the current directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Drop every user table
    Clear {
        /// Logical database name
        name: String,
    },
}

fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let worker = Worker::spawn(&cli.base_dir)?;
    let password = cli.password.as_deref();

    match cli.command {
        Commands::Init { name } => {
            let filename = worker.init(&database_filename(&name), password).await?;
            info!(filename = %filename, "database ready");
        }
        Commands::Import { name, table, file } => {
            let filename = database_filename(&name);
            worker.init(&filename, password).await?;

            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let data: serde_json::Value =
                serde_json::from_str(&text).context("parsing JSON input")?;

            let importer = JsonImporter::new(worker.clone(), filename);
            let report = importer.import_complex(&table, &data).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Export { name, out } => {
            let filename = database_filename(&name);
            worker.init(&filename, password).await?;

            let bytes = worker.export_db(&filename, password).await?;
            let out = out.unwrap_or_else(|| PathBuf::from(&filename));
            tokio::fs::write(&out, bytes)
                .await
                .with_context(|| format!("writing {}", out.display()))?;
            info!(out = %out.display(), "database exported");
        }
        Commands::Clear { name } => {
            let filename = database_filename(&name);
            worker.init(&filename, password).await?;

            let dropped = clear_database(&worker, &filename).await?;
            println!("{{\"tablesDropped\":{dropped}}}");
        }
    }

    Ok(())
}
