use anyhow::Result;
use clap::Parser;
use flatfinder::browser::HttpBrowser;
use flatfinder::crawler::{run_crawl, CrawlOptions};
use flatfinder::models::COLUMNS;
use flatfinder::sheet::{CsvSheet, RowSink};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Flatfinder - apartment listing crawler")]
struct Args {
    /// Search results page to start crawling from
    #[clap(
        short,
        long,
        default_value = "https://www.olx.ua/uk/nedvizhimost/kvartiry/"
    )]
    start_url: String,

    /// Path to the destination worksheet
    #[clap(short, long, default_value = "listings.csv")]
    output: String,

    /// Maximum number of result pages to visit
    #[clap(short, long)]
    max_pages: Option<usize>,

    /// Maximum number of listings to scrape
    #[clap(short = 'i', long)]
    max_items: Option<usize>,

    /// How long to wait for a page to render, in milliseconds
    #[clap(long, default_value = "2000")]
    settle_ms: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flatfinder=info")),
        )
        .init();

    let args = Args::parse();

    println!("Flatfinder - Apartment Listing Crawler");
    println!("======================================");

    let mut sheet = CsvSheet::open(&args.output)?;
    if sheet.is_empty() {
        let header: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
        sheet.insert_row(1, &header)?;
    }

    let mut browser = HttpBrowser::new(Duration::from_millis(args.settle_ms))?;
    let options = CrawlOptions {
        start_url: args.start_url,
        max_pages: args.max_pages,
        max_items: args.max_items,
        ..CrawlOptions::default()
    };

    let stats = run_crawl(&mut browser, &mut sheet, &options)?;

    println!("\n=== Summary ===");
    println!("Pages visited: {}", stats.pages);
    println!("Listings found: {}", stats.listings_found);
    println!("Listings written: {}", stats.listings_scraped);
    println!("Listings skipped: {}", stats.listings_skipped);
    if stats.sink_failures > 0 {
        println!("Rows lost to sink failures: {}", stats.sink_failures);
    }
    println!("Saved to: {}", args.output);

    Ok(())
}
