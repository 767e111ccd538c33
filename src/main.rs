//! turbocsv - CSV reader benchmark
//!
//! Tokenizes a file repeatedly and reports throughput.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use turbocsv::{ByteStream, Dialect, FileSource, ReaderOptions, Tokenizer};

#[derive(Parser, Debug)]
#[command(name = "turbocsv")]
#[command(about = "Read a CSV file through the prefetching tokenizer", long_about = None)]
struct Args {
    /// CSV file to parse
    #[arg(value_name = "FILE")]
    file: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Dump the fields of every record
    #[arg(short, long)]
    dump: bool,

    /// Number of iterations for benchmarking
    #[arg(short, long, default_value = "10")]
    iterations: usize,

    /// Capacity of each prefetch buffer in bytes
    #[arg(short, long, default_value_t = turbocsv::options::DEFAULT_BUFFER_CAPACITY)]
    buffer_size: usize,

    /// Read on the calling thread instead of prefetching
    #[arg(long)]
    sync: bool,

    /// Field separator
    #[arg(long, default_value = ",")]
    delimiter: char,
}

/// Counts from one pass over the file
#[derive(Debug, Default, PartialEq)]
struct Tally {
    records: u64,
    fields: u64,
    bytes: u64,
}

fn tally(options: &ReaderOptions, args: &Args) -> Result<Tally> {
    let source = FileSource::open(&args.file, options)
        .with_context(|| format!("Could not load the file {}", args.file))?;
    let mut tokenizer = Tokenizer::new(source, options.dialect);
    let mut tally = Tally::default();

    for record in tokenizer.by_ref() {
        let record = record.context("read failed")?;
        tally.records += 1;
        tally.fields += record.field_count() as u64;

        if args.dump {
            let fields: Vec<String> = record.fields().map(|f| f.to_string()).collect();
            println!("{}: {}", tally.records, fields.join(" | "));
        }
    }

    tally.bytes = tokenizer.stream().bytes_read();
    Ok(tally)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if !args.delimiter.is_ascii() {
        bail!("delimiter must be a single ASCII character");
    }

    let options = ReaderOptions {
        dialect: Dialect::default().with_field_separator(args.delimiter as u8),
        buffer_capacity: args.buffer_size,
        prefetch_threshold: if args.sync { u64::MAX } else { 0 },
        has_headers: false,
    };
    info!(file = %args.file, ?options, "loading");

    // Warmup run
    let first = tally(&options, &args)?;
    println!("records                    : {}", first.records);
    println!("fields                     : {}", first.fields);
    if first.records > 0 {
        println!(
            "bytes per record           : {:.2}",
            first.bytes as f64 / first.records as f64
        );
    }

    let quiet = Args { dump: false, ..args };
    let mut total_time = 0.0;

    for iteration in 0..quiet.iterations {
        let start = Instant::now();
        let run = tally(&options, &quiet)?;
        total_time += start.elapsed().as_secs_f64();
        debug!(iteration, records = run.records, "pass complete");

        if run != first {
            bail!("pass {} disagreed with the warmup run", iteration);
        }
    }

    if quiet.verbose {
        println!("Total time in (s)          = {:.6}", total_time);
        println!("Number of iterations       = {}", quiet.iterations);
    }

    if quiet.iterations > 0 && total_time > 0.0 {
        let volume = quiet.iterations as f64 * first.bytes as f64;
        let gb_per_s = volume / total_time / (1024.0 * 1024.0 * 1024.0);
        println!(" GB/s: {:.5}", gb_per_s);
    }

    Ok(())
}
