// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ncap-dump - Print the contents of audit record containers.
//!
//! Usage:
//!   ncap-dump IPv4.ncap
//!   ncap-dump --csv TransportFlow.ncap.gz
//!   ncap-dump --count *.ncap.gz

use anyhow::Context;
use clap::Parser;
use ncap_encoder::record::format_timestamp;
use ncap_encoder::NcapReader;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ncap-dump")]
#[command(about = "Print audit records from .ncap / .ncap.gz files")]
#[command(version)]
struct Args {
    /// Container files to read
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Print records as CSV rows
    #[arg(long, conflicts_with = "count")]
    csv: bool,

    /// Only print the number of records per file
    #[arg(short, long)]
    count: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    for input in &args.inputs {
        let mut reader = NcapReader::open(input)
            .with_context(|| format!("Failed to open {}", input.display()))?;

        if args.count {
            while reader.next_frame()?.is_some() {}
            writeln!(out, "{}: {} records", input.display(), reader.frames_read())?;
            continue;
        }

        let header = reader.header().clone();
        info!("{} written by ncap-encoder v{}", input.display(), header.version);

        if args.csv {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut out);
            writer.write_record(header.record_type.csv_header())?;
            for record in reader.records() {
                writer.write_record(record?.as_record().csv_record())?;
            }
            writer.flush()?;
        } else {
            writeln!(
                out,
                "# {} | type: {} | source: {} | created: {} | payloads: {}",
                input.display(),
                header.record_type,
                header.input_source,
                format_timestamp(&header.created),
                header.contains_payloads
            )?;
            for record in reader.records() {
                writeln!(out, "{:?}", record?)?;
            }
        }
    }

    Ok(())
}
