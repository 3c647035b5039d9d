use anyhow::{Context, Result};
use clap::Parser;
use flatfinder::images;
use flatfinder::sheet::CsvSheet;
use indicatif::ProgressBar;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/96.0.4664.110 Safari/537.36";

#[derive(Parser, Debug)]
#[clap(author, version, about = "Fills image resolutions into a worksheet")]
struct Args {
    /// Worksheet with image URLs in column 1 under a header row; resolutions
    /// land in column 2
    #[clap(short, long, default_value = "images.csv")]
    sheet: String,

    /// Number of concurrent fetches
    #[clap(short, long, default_value = "50")]
    workers: usize,

    /// Per-request timeout in seconds
    #[clap(short, long, default_value = "10")]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flatfinder=info")),
        )
        .init();

    let args = Args::parse();

    let mut sheet = CsvSheet::open(&args.sheet)?;
    let links: Vec<String> = sheet.col_values(1).into_iter().skip(1).collect();
    if links.is_empty() {
        println!("No image URLs found in {}", args.sheet);
        return Ok(());
    }
    println!("Probing {} images with {} workers", links.len(), args.workers);

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(args.timeout))
        .build()
        .context("Failed to build HTTP client")?;

    let progress = ProgressBar::new(links.len() as u64);
    let resolutions = images::probe_all(&client, &links, args.workers, Some(&progress)).await;
    progress.finish_and_clear();

    for (i, resolution) in resolutions.iter().enumerate() {
        // Row 1 holds the headers, so URL i sits on row i + 2.
        if let Err(e) = sheet.update_cell(i + 2, 2, resolution) {
            tracing::warn!(row = i + 2, error = %format!("{:#}", e), "failed to update cell");
        }
    }

    println!("Resolutions updated in {}", args.sheet);
    Ok(())
}
