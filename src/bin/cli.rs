//! commitlog CLI
//!
//! Operator tool for inspecting and maintaining a log directory.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use commitlog::{Config, Log, Record};
use tracing_subscriber::{fmt, EnvFilter};

/// commitlog CLI
#[derive(Parser, Debug)]
#[command(name = "commitlog-cli")]
#[command(about = "Inspect and maintain a segmented commit log")]
#[command(version)]
struct Args {
    /// Log directory
    #[arg(short, long, default_value = "./commitlog_data")]
    dir: PathBuf,

    /// Store rotation threshold in bytes
    #[arg(long, default_value = "1024")]
    max_store_bytes: u64,

    /// Index capacity / rotation threshold in bytes
    #[arg(long, default_value = "1024")]
    max_index_bytes: u64,

    /// Base offset for a brand-new log
    #[arg(long, default_value = "0")]
    initial_offset: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append one record per value
    Append {
        /// Values to append
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Read the record at an offset
    Read {
        /// Absolute offset
        offset: u64,
    },

    /// Print the lowest and highest offsets
    Offsets,

    /// Remove segments whose records are all below LOWEST
    Truncate {
        /// Retention boundary
        lowest: u64,
    },

    /// Write the raw framed bytes of the whole log
    Dump {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete the log and start an empty one
    Reset,
}

fn main() {
    // Logs go to stderr so `dump` output on stdout stays clean.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,commitlog=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("commitlog CLI v{}", commitlog::VERSION);
    tracing::info!("Log directory: {}", args.dir.display());

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> commitlog::Result<()> {
    let config = Config::builder()
        .data_dir(&args.dir)
        .max_store_bytes(args.max_store_bytes)
        .max_index_bytes(args.max_index_bytes)
        .initial_offset(args.initial_offset)
        .build();

    let log = Log::open(config)?;
    let result = execute(&log, args.command);

    // Close even when the command failed so index files get truncated.
    let closed = log.close();
    result.and(closed)
}

fn execute(log: &Log, command: Commands) -> commitlog::Result<()> {
    match command {
        Commands::Append { values } => {
            for value in values {
                let offset = log.append(Record::new(value))?;
                println!("{}", offset);
            }
        }
        Commands::Read { offset } => {
            let record = log.read(offset)?;
            println!("{}\t{}", record.offset, String::from_utf8_lossy(&record.value));
        }
        Commands::Offsets => {
            println!("lowest={}", log.lowest_offset()?);
            println!("highest={}", log.highest_offset()?);
            println!("segments={:?}", log.base_offsets());
        }
        Commands::Truncate { lowest } => {
            log.truncate(lowest)?;
            println!("segments={:?}", log.base_offsets());
        }
        Commands::Dump { output } => {
            let mut reader = log.reader();
            let copied = match output {
                Some(path) => {
                    let mut file = File::create(&path)?;
                    let copied = io::copy(&mut reader, &mut file)?;
                    file.sync_all()?;
                    copied
                }
                None => {
                    let mut stdout = io::stdout().lock();
                    let copied = io::copy(&mut reader, &mut stdout)?;
                    stdout.flush()?;
                    copied
                }
            };
            tracing::info!("Dumped {} bytes", copied);
        }
        Commands::Reset => {
            log.reset()?;
            println!("reset {}", log.dir().display());
        }
    }
    Ok(())
}
