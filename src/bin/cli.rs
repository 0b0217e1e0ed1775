//! needlemap CLI
//!
//! Offline inspection of needle index files.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use needlemap::index::{IndexReader, IndexRecovery};
use needlemap::{Config, NeedleMap};
use tracing_subscriber::{fmt, EnvFilter};

/// needlemap CLI
#[derive(Parser, Debug)]
#[command(name = "needlemap-cli")]
#[command(about = "Inspect needle index files")]
#[command(version)]
struct Args {
    /// Padding unit size used to print byte offsets
    #[arg(short, long, default_value = "8")]
    padding_size: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay an index and print its counters
    Stats { index: PathBuf },

    /// Print decoded records in file order
    Dump {
        index: PathBuf,

        /// Stop after this many records
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Scan an index without loading it and report its shape
    Verify { index: PathBuf },

    /// Replay an index and look up one key
    Get { index: PathBuf, key: u64 },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,needlemap=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::builder().padding_size(args.padding_size).build();

    if let Err(e) = run(args.command, config) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn load(index: &Path, config: Config) -> needlemap::Result<NeedleMap> {
    // Read-only handle: inspection never appends
    let file = File::open(index)?;
    NeedleMap::load(file, index, config)
}

fn run(command: Command, config: Config) -> needlemap::Result<()> {
    match command {
        Command::Stats { index } => {
            let nm = load(&index, config)?;
            println!("live entries:   {}", nm.len());
            println!("file count:     {}", nm.file_count());
            println!("content size:   {}", nm.content_size());
            println!("deleted count:  {}", nm.deleted_count());
            println!("deleted size:   {}", nm.deleted_size());
            println!("max file key:   {}", nm.max_file_key());
        }
        Command::Dump { index, limit } => {
            let reader = IndexReader::open(&index)?;
            let limit = limit.unwrap_or(usize::MAX);
            for record in reader.records().take(limit) {
                let record = record?;
                if record.is_tombstone() {
                    println!("{:>20} deleted", record.key);
                } else {
                    println!(
                        "{:>20} offset={} size={}",
                        record.key,
                        u64::from(record.offset) * config.padding_size,
                        record.size
                    );
                }
            }
        }
        Command::Verify { index } => {
            let result = IndexRecovery::verify(&index)?;
            println!("records:        {}", result.records);
            println!("live records:   {}", result.live_records);
            println!("tombstones:     {}", result.tombstones);
            println!("max key:        {}", result.max_key);
            println!("trailing bytes: {}", result.trailing_bytes);
            if result.was_truncated {
                tracing::warn!("index ends with a partial record");
            }
        }
        Command::Get { index, key } => {
            let nm = load(&index, config)?;
            match nm.get(key) {
                Some(value) => println!(
                    "{} offset={} size={}",
                    key,
                    value.actual_offset(nm.padding_size()),
                    value.size
                ),
                None => println!("{} not found", key),
            }
        }
    }
    Ok(())
}
