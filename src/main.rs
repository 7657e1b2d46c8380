// Binary includes library modules - some public API items are only for library consumers
#![allow(unused)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

mod data;
mod render;
mod report;
mod source;

use data::{parse_timestamp, parse_utc_offset, Cohorts};
use report::{ReportOptions, DEFAULT_TITLE};
use source::{CsvSource, ReadingSource};

#[cfg(feature = "withings")]
use source::WithingsSource;

#[derive(Parser, Debug)]
#[command(name = "blutdruck")]
#[command(about = "Blood pressure analysis with SVG charts and a PDF report")]
struct Args {
    /// CSV file with readings, one "Date,SYS,DIA,BPM" line per measurement
    #[cfg_attr(
        feature = "withings",
        arg(conflicts_with = "withings", required_unless_present = "withings")
    )]
    #[cfg_attr(not(feature = "withings"), arg(required = true))]
    csv_file: Option<PathBuf>,

    /// Fetch readings from the Withings API instead of a file
    #[cfg(feature = "withings")]
    #[arg(long)]
    withings: bool,

    /// Withings application credentials (JSON with client_id and client_secret)
    #[cfg(feature = "withings")]
    #[arg(long, default_value = "withings_credentials.json")]
    credentials: PathBuf,

    /// Cached Withings OAuth tokens, created and refreshed automatically
    #[cfg(feature = "withings")]
    #[arg(long, default_value = "withings_config.json")]
    tokens: PathBuf,

    /// Start of the reporting period ("YYYY-MM-DD HH:MM:SS")
    #[arg(short, long)]
    start: Option<String>,

    /// End of the reporting period ("YYYY-MM-DD HH:MM:SS")
    #[arg(short, long)]
    end: Option<String>,

    /// UTC offset applied to timestamps that carry none
    #[arg(long, default_value = "+02:00")]
    utc_offset: String,

    /// Directory for the generated files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Report title shown on the PDF title page
    #[arg(long)]
    title: Option<String>,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let offset = parse_utc_offset(&args.utc_offset)?;
    let start = args
        .start
        .as_deref()
        .map(|s| parse_timestamp(s, offset))
        .transpose()
        .context("invalid --start")?;
    let end = args
        .end
        .as_deref()
        .map(|s| parse_timestamp(s, offset))
        .transpose()
        .context("invalid --end")?;

    #[cfg(feature = "withings")]
    let mut source: Box<dyn ReadingSource> = if args.withings {
        Box::new(WithingsSource::connect(
            &args.credentials,
            &args.tokens,
            offset,
            start,
            end,
        )?)
    } else {
        let path = args.csv_file.as_deref().context("a CSV file is required")?;
        Box::new(CsvSource::new(path, offset))
    };

    #[cfg(not(feature = "withings"))]
    let mut source: Box<dyn ReadingSource> = {
        let path = args.csv_file.as_deref().context("a CSV file is required")?;
        Box::new(CsvSource::new(path, offset))
    };

    info!(source = source.description(), "fetching readings");
    let readings = source.fetch()?;

    let cohorts = Cohorts::classify(readings, start, end);
    info!(
        total = cohorts.complete.len(),
        morning = cohorts.morning.len(),
        evening = cohorts.evening.len(),
        "classified readings"
    );

    let options = ReportOptions {
        output_dir: args.output_dir.clone(),
        title: args.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        start,
        end,
    };
    let files = report::generate(&cohorts, &options)?;

    println!("Bericht erstellt: {}", files.pdf.display());
    for svg in &files.svgs {
        println!("  Diagramm: {}", svg.display());
    }

    Ok(())
}

fn init_logging(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_target(false)
        .init();
}
