use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

use bench_data::config::Config;
use bench_data::infra::{DynamoHttpStore, SupabaseObjectStore};
use bench_data::{
    fetch_benchmark_table, fetch_object, flat_records, logging, metrics, ObjectLister,
};

#[derive(Parser)]
#[command(name = "bench_data")]
#[command(about = "Fetch and flatten GPU benchmark records")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a benchmark's flat records as JSON lines
    Rows {
        benchmark_id: String,
    },
    /// Fetch a benchmark's records as a CSV table
    Table {
        benchmark_id: String,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List objects in a storage bucket
    ListObjects {
        #[arg(long)]
        bucket: String,
        #[arg(long, default_value = "")]
        prefix: String,
    },
    /// Download one object
    GetObject {
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        key: String,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn write_out(output: Option<PathBuf>, bytes: &[u8]) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), bytes = bytes.len(), "wrote output");
        }
        None => std::io::stdout().lock().write_all(bytes)?,
    }
    Ok(())
}

fn main() -> Result<()> {
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;
    if let Some(addr) = &config.metrics_addr {
        metrics::install_prometheus_exporter(addr).context("starting metrics exporter")?;
    }

    match cli.command {
        Commands::Rows { benchmark_id } => {
            let store = DynamoHttpStore::new(&config.store, config.http_timeout_secs)?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            let mut count = 0usize;
            for record in flat_records(&store, &benchmark_id) {
                let record =
                    record.with_context(|| format!("reading benchmark {}", benchmark_id))?;
                serde_json::to_writer(&mut out, &record)?;
                out.write_all(b"\n")?;
                count += 1;
            }
            info!(benchmark_id = %benchmark_id, records = count, "rows written");
        }
        Commands::Table { benchmark_id, output } => {
            let store = DynamoHttpStore::new(&config.store, config.http_timeout_secs)?;
            let table = fetch_benchmark_table(&store, &benchmark_id)
                .with_context(|| format!("building table for benchmark {}", benchmark_id))?;
            info!(rows = table.len(), columns = table.columns().len(), "table assembled");
            let csv = table.to_csv_string().context("rendering CSV")?;
            write_out(output, csv.as_bytes())?;
        }
        Commands::ListObjects { bucket, prefix } => {
            let store =
                SupabaseObjectStore::new(&config.object_store, config.http_timeout_secs)?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for object in ObjectLister::new(&store, bucket.as_str(), &prefix) {
                let object = object.with_context(|| format!("listing bucket {}", bucket))?;
                serde_json::to_writer(&mut out, &object)?;
                out.write_all(b"\n")?;
            }
        }
        Commands::GetObject { bucket, key, output } => {
            let store =
                SupabaseObjectStore::new(&config.object_store, config.http_timeout_secs)?;
            let bytes = fetch_object(&store, &bucket, &key)
                .with_context(|| format!("fetching {}/{}", bucket, key))?;
            write_out(output, &bytes)?;
        }
    }

    Ok(())
}
