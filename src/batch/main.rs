//! Batch geocoding of a CSV file of addresses.
//!
//! Reads `id,zip,city,name,number` rows and writes one JSON line per row with
//! its results or error.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use addrpoint::config::{Config, StoreBackend};
use addrpoint::models::HouseNumber;
use addrpoint::{store, Candidate, Geocoder, Query};

#[derive(Parser, Debug)]
#[command(name = "batch")]
#[command(about = "Geocode a CSV file of addresses")]
struct Args {
    /// Input CSV with columns id,zip,city,name,number
    #[arg(short, long)]
    input: PathBuf,

    /// Output JSON lines file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of CSV reference tables (selects the csv backend)
    #[arg(long, conflicts_with = "scylla_url")]
    data_dir: Option<PathBuf>,

    /// ScyllaDB node (selects the scylla backend)
    #[arg(long)]
    scylla_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InputRow {
    id: String,
    #[serde(default)]
    zip: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    number: Option<String>,
}

impl InputRow {
    fn to_query(&self) -> Query {
        Query {
            zip: self.zip.clone(),
            city: self.city.clone(),
            name: self.name.clone(),
            number: self.number.clone().map(HouseNumber::Text),
        }
    }
}

#[derive(Debug, Serialize)]
struct OutputLine {
    id: String,
    results: Vec<Candidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean JSON lines
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        config.store.backend = StoreBackend::Csv;
        config.store.data_dir = dir;
    }
    if let Some(url) = args.scylla_url {
        config.store.backend = StoreBackend::Scylla;
        config.store.scylla_url = url;
    }

    info!("Addrpoint Batch Geocoder");
    info!("Input: {}", args.input.display());

    let rows: Vec<InputRow> = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(&args.input)
        .context("Failed to open input CSV")?
        .deserialize()
        .collect::<Result<Vec<InputRow>, csv::Error>>()
        .context("Failed to parse input CSV")?;

    let datastore = store::connect(&config.store, config.matching.phonetic_len).await?;
    let geocoder = Geocoder::new(datastore, config.matching.clone());

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).context("Failed to create output file")?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    let pb = ProgressBar::new(rows.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
            )?
            .progress_chars("#>-"),
    );

    let mut matched = 0usize;
    let mut failed = 0usize;

    for row in &rows {
        let line = match geocoder.geocode(&row.to_query()).await {
            Ok(results) => {
                if !results.is_empty() {
                    matched += 1;
                }
                OutputLine {
                    id: row.id.clone(),
                    results,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Row {}: {}", row.id, e);
                failed += 1;
                OutputLine {
                    id: row.id.clone(),
                    results: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        };
        serde_json::to_writer(&mut out, &line)?;
        writeln!(out)?;
        pb.inc(1);
    }

    out.flush()?;
    pb.finish_and_clear();

    info!(
        "Done: {} rows, {} matched, {} unmatched, {} failed",
        rows.len(),
        matched,
        rows.len() - matched - failed,
        failed
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_row_to_query() {
        let row = InputRow {
            id: "1".to_string(),
            zip: Some("02139".to_string()),
            city: None,
            name: Some("Main Street".to_string()),
            number: Some("150".to_string()),
        };
        let query = row.to_query();
        assert_eq!(query.zip(), Some("02139"));
        assert_eq!(query.validate().unwrap(), ("Main Street", 150));
    }
}
