use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use htk_core::format::DEFAULT_SAMPLE_PERIOD;
use htk_core::{ParamKind, Reader, Writer, WriterOptions};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "htkfeat",
    about = "Inspect, dump, and import HTK feature files",
    version
)]
struct Cli {
    /// Log filter used when RUST_LOG is not set (e.g. warn, debug)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print header fields and layout of a feature file
    Inspect {
        /// Feature file to inspect
        file: PathBuf,
    },
    /// Print rows as whitespace-separated text, one row per line
    Dump {
        /// Feature file to dump
        file: PathBuf,
        /// First row to print
        #[arg(short, long, default_value_t = 0)]
        start: u64,
        /// Maximum number of rows to print (all remaining by default)
        #[arg(short, long)]
        count: Option<usize>,
    },
    /// Write whitespace-separated text rows into a new feature file
    Import {
        /// Text file with one row per line ("-" reads stdin)
        input: PathBuf,
        /// Destination feature file
        output: PathBuf,
        /// Sample period in 100-ns units
        #[arg(long, default_value_t = DEFAULT_SAMPLE_PERIOD)]
        sample_period: u32,
        /// Parameter kind, e.g. MFCC_0 or PLP_E_D_A
        #[arg(short, long, default_value = "MFCC_0")]
        kind: String,
    },
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_inspect(file: PathBuf) -> anyhow::Result<()> {
    let mut reader =
        Reader::open(&file).with_context(|| format!("opening feature file {:?}", file))?;
    let header = *reader.header();
    let compressed = reader.compression().is_some();
    let vector_length = reader.vector_length();
    let data_offset = reader.data_offset();

    let available = reader
        .count_rows()
        .with_context(|| format!("reading rows of {:?}", file))?;

    println!("=== HTK feature file: {:?} ===", file);
    println!();
    println!("  samples        : {}", header.sample_count);
    println!(
        "  sample period  : {} ({:.3} ms)",
        header.sample_period,
        header.sample_period as f64 / 10_000.0
    );
    println!("  sample size    : {} bytes", header.sample_size);
    println!(
        "  parameter kind : {} (0x{:04x})",
        header.param_kind, header.param_kind.0
    );
    println!("  vector length  : {}", vector_length);
    println!("  data offset    : {}", data_offset);
    println!("  compressed     : {}", if compressed { "yes" } else { "no" });
    println!("  rows on disk   : {}", available);
    if header.param_kind.has_checksum() {
        println!("  checksum flag  : set (not verified)");
    }
    Ok(())
}

fn run_dump(file: PathBuf, start: u64, count: Option<usize>) -> anyhow::Result<()> {
    let mut reader =
        Reader::open(&file).with_context(|| format!("opening feature file {:?}", file))?;
    reader.seek(start)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for row in reader.vectors().take(count.unwrap_or(usize::MAX)) {
        let row = row?;
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(out, "{}", line.join(" "))?;
    }
    out.flush()?;
    Ok(())
}

fn parse_row(line: &str, line_no: usize) -> anyhow::Result<Vec<f32>> {
    line.split_whitespace()
        .map(|tok| {
            tok.parse::<f32>()
                .with_context(|| format!("line {}: '{}' is not a number", line_no, tok))
        })
        .collect()
}

fn run_import(
    input: PathBuf,
    output: PathBuf,
    sample_period: u32,
    kind: &str,
) -> anyhow::Result<()> {
    let param_kind: ParamKind = kind.parse()?;
    let src: Box<dyn BufRead> = if input.to_str() == Some("-") {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(
            File::open(&input).with_context(|| format!("opening input file {:?}", input))?,
        ))
    };

    let mut writer: Option<Writer> = None;
    for (idx, line) in src.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = parse_row(&line, idx + 1)?;
        // The first row fixes the vector length.
        if writer.is_none() {
            let options = WriterOptions {
                vector_length: row.len(),
                sample_period,
                param_kind,
            };
            writer = Some(
                Writer::create(&output, options)
                    .with_context(|| format!("creating output file {:?}", output))?,
            );
        }
        if let Some(w) = writer.as_mut() {
            w.write_vector(&row)
                .with_context(|| format!("line {}", idx + 1))?;
        }
    }

    let Some(writer) = writer else {
        anyhow::bail!("no rows found in {:?}", input);
    };
    let vector_length = writer.vector_length();
    let rows = writer.finish()?;
    info!(rows, vector_length, kind = %param_kind, "import complete");
    eprintln!("  rows          : {}", rows);
    eprintln!("  vector length : {}", vector_length);
    eprintln!("  kind          : {}", param_kind);
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(io::stderr))
        .init();

    match cli.command {
        Commands::Inspect { file } => run_inspect(file),
        Commands::Dump { file, start, count } => run_dump(file, start, count),
        Commands::Import {
            input,
            output,
            sample_period,
            kind,
        } => run_import(input, output, sample_period, &kind),
    }
}
