use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use ddl_schema::model::export::export_schema_json;
use ddl_schema::{
    apply_operation, deparse, parse_operations, parse_schema_path, replay_detailed, ParseOptions,
    QualifierPolicy, Schema, SchemaError, VersionedOperationBatch,
};

#[derive(Parser)]
#[command(name = "ddl-schema")]
#[command(author, version, about = "PostgreSQL DDL to schema model, and schema edits back to DDL")]
struct Cli {
    /// Enable verbose (debug) logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a DDL file (or a directory of .sql files) and print the schema model
    Parse {
        /// Path to a .sql file or a directory of .sql files
        #[arg(short, long)]
        input: PathBuf,

        /// Schema whose qualifier is dropped from table names
        #[arg(long, default_value = ddl_schema::DEFAULT_SCHEMA)]
        default_schema: String,

        /// Drop every schema qualifier, not just the default schema
        #[arg(long)]
        drop_all_qualifiers: bool,

        /// Print the schema.json export instead of the full model
        #[arg(long)]
        export: bool,

        /// Database version reported in the export header
        #[arg(long)]
        database_version: Option<String>,
    },
    /// Render a JSON array of operations as DDL
    Deparse {
        /// Path to a JSON file holding an array of operations
        #[arg(short, long)]
        operations: PathBuf,
    },
    /// Render all operation batches up to a version as one script
    Replay {
        /// Path to a JSON file holding an array of versioned batches
        #[arg(short, long)]
        batches: PathBuf,

        /// Last version to include
        #[arg(short, long)]
        up_to: i64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Parse {
            input,
            default_schema,
            drop_all_qualifiers,
            export,
            database_version,
        } => {
            let options = ParseOptions {
                default_schema,
                qualifier_policy: if drop_all_qualifiers {
                    QualifierPolicy::DropAll
                } else {
                    QualifierPolicy::DropDefault
                },
                database_version,
            };

            let parsed = parse_schema_path(&input, &options)?;
            for skipped in &parsed.report.skipped {
                tracing::info!(line = skipped.line, kind = %skipped.kind, reason = %skipped.reason, "skipped");
            }

            let json = if export {
                export_schema_json(&parsed.schema, options.database_version.as_deref())?
            } else {
                serde_json::to_string_pretty(&parsed.schema)?
            };
            println!("{}", json);
        }
        Commands::Deparse { operations: path } => {
            let content = read_document(&path)?;
            let operations = parse_operations(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            let mut context = Schema::new();
            let mut failed = 0;
            for (index, operation) in operations.iter().enumerate() {
                match deparse(operation, &context) {
                    Ok(sql) => println!("{}\n", sql),
                    Err(errors) => {
                        failed += 1;
                        for error in errors {
                            eprintln!("operation {} ({}): {}", index, operation.kind(), error);
                        }
                    }
                }
                apply_operation(&mut context, operation);
            }
            if failed > 0 {
                eprintln!("{} of {} operations failed", failed, operations.len());
            }
        }
        Commands::Replay { batches, up_to } => {
            let batches: Vec<VersionedOperationBatch> = read_json(&batches)?;
            let output = replay_detailed(&batches, up_to);
            for failure in &output.failures {
                for error in &failure.errors {
                    eprintln!(
                        "version {} operation {}: {}",
                        failure.version, failure.index, error
                    );
                }
            }
            println!("{}", output.sql);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_document(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| SchemaError::OperationReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(content)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = read_document(path)?;
    serde_json::from_str(&content)
        .map_err(|e| SchemaError::InvalidOperationDocument {
            message: e.to_string(),
        })
        .with_context(|| format!("parsing {}", path.display()))
}
