use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use flatfinder::analytics;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "Exports filtered analytics sessions to per-channel worksheets"
)]
struct Args {
    /// Base URL of the session export endpoint
    #[clap(short = 'u', long)]
    source_url: String,

    /// First day of the range (YYYY-MM-DD)
    #[clap(long, default_value = "2017-07-24")]
    start_date: NaiveDate,

    /// Last day of the range, inclusive (YYYY-MM-DD)
    #[clap(long, default_value = "2017-07-31")]
    end_date: NaiveDate,

    /// Directory the per-channel worksheets are written into
    #[clap(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Number of concurrent day fetches
    #[clap(short, long, default_value = "4")]
    workers: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flatfinder=info")),
        )
        .init();

    let args = Args::parse();
    if args.start_date > args.end_date {
        bail!("Start date must not be after end date");
    }
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;

    let client = reqwest::Client::new();
    let all_rows = analytics::fetch_range(
        &client,
        &args.source_url,
        args.start_date,
        args.end_date,
        args.workers,
    )
    .await;
    println!(
        "Fetched {} session rows for {}..{}",
        all_rows.len(),
        args.start_date,
        args.end_date
    );

    let mut exported = 0;
    for (channel, rows) in analytics::split_by_channel(all_rows) {
        let filtered: Vec<_> = rows
            .into_iter()
            .filter(analytics::session_passes_filter)
            .collect();
        analytics::export_channel(&args.out_dir, &channel, &filtered)?;
        exported += filtered.len();
    }

    println!("\n=== Summary ===");
    println!("Rows exported after filtering: {}", exported);
    println!("Saved to: {}", args.out_dir.display());

    Ok(())
}
