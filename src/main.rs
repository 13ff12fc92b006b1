//! DDS extraction CLI.
//!
//! Command-line tool for extracting files from raw DDS tape dumps.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser};
use dds_recover::{extract, DecodeOptions, DirGroupSource, ExtractSummary};

/// Extract files from a raw DDS dump.
///
/// Walks the Basic Group files in a directory, checking the data validity
/// reported by the decode process, and writes one file's reconstructed
/// bytes to the output path.
#[derive(Parser, Debug)]
#[command(name = "dds-extract")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The number of the basic group to start scanning
    start_group: u32,

    /// The number of the file to extract
    file_no: u32,

    /// Pathname of the file to receive the data
    outfile: PathBuf,

    /// Directory containing the g<NNNNNN>.bin group files
    #[arg(short = 'C', long = "dir", default_value = ".")]
    dir: PathBuf,

    /// Relax requirements for data validity; invalid bytes will not be
    /// checked
    #[arg(short = 'q', long)]
    relax: bool,

    /// ASCII extract; add newlines after every record
    #[arg(short = 'a', long)]
    ascii: bool,

    /// Verbose output during extraction (repeatable)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Print a JSON extraction summary on stdout when done
    #[arg(long)]
    summary: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => "dds_recover=warn",
        1 => "dds_recover=info",
        2 => "dds_recover=debug",
        _ => "dds_recover=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(summary) => {
            if args.summary {
                if let Ok(json) = serde_json::to_string_pretty(&summary) {
                    println!("{json}");
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("dds-extract: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<ExtractSummary> {
    let options = DecodeOptions {
        relax_validity: args.relax,
        ascii_newlines: args.ascii,
        verbosity: args.verbose,
    };

    let out = File::create(&args.outfile)
        .with_context(|| format!("creating {}", args.outfile.display()))?;
    let mut sink = BufWriter::new(out);

    let mut source = DirGroupSource::new(&args.dir, options);
    let summary = extract(
        &mut source,
        args.start_group,
        args.file_no,
        &options,
        &mut sink,
    )
    .with_context(|| {
        format!(
            "extracting file {} starting at group {}",
            args.file_no, args.start_group
        )
    })?;

    sink.flush().context("flushing output")?;
    Ok(summary)
}
