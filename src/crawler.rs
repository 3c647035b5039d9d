use crate::browser::Browser;
use crate::olx_scraper;
use crate::sheet::RowSink;
use anyhow::Result;
use std::time::Duration;

/// Outcome of trying to advance past the current results page. A missing
/// control ends the crawl; a navigation failure is retried before it does.
#[derive(Debug)]
pub enum Pagination {
    Advanced,
    NoMoreControl,
    NavigationError(String),
}

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub start_url: String,
    /// Stop after this many results pages; `None` runs until the next-page
    /// control disappears.
    pub max_pages: Option<usize>,
    /// Stop after this many scraped records.
    pub max_items: Option<usize>,
    /// Pause between listing visits.
    pub listing_delay: Duration,
    /// Attempts to re-follow a failing next-page link before giving up.
    pub nav_retries: u32,
    pub nav_retry_delay: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            start_url: "https://www.olx.ua/uk/nedvizhimost/kvartiry/".to_string(),
            max_pages: None,
            max_items: None,
            listing_delay: Duration::from_millis(500),
            nav_retries: 2,
            nav_retry_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct CrawlStats {
    pub pages: usize,
    pub listings_found: usize,
    pub listings_scraped: usize,
    pub listings_skipped: usize,
    pub sink_failures: usize,
}

/// Walks the results pages from `options.start_url`, scrapes every listing and
/// hands each record to the sink at strictly increasing row positions,
/// starting under the header at row 2. A failed listing is skipped, a failed
/// sink write is logged and the crawl moves on; only the initial navigation
/// can fail the whole run.
pub fn run_crawl<B: Browser, S: RowSink>(
    browser: &mut B,
    sink: &mut S,
    options: &CrawlOptions,
) -> Result<CrawlStats> {
    let mut stats = CrawlStats::default();
    let mut row = 2;

    browser.goto(&options.start_url, olx_scraper::CARD_SELECTOR)?;

    'crawl: loop {
        stats.pages += 1;
        let page_url = browser.current_url().to_string();

        let links = match olx_scraper::collect_listing_links(browser.document(), &page_url) {
            Ok(links) => links,
            Err(e) => {
                tracing::error!(page = %page_url, error = %format!("{:#}", e), "listing extraction failed, ending crawl");
                break;
            }
        };
        stats.listings_found += links.len();
        tracing::info!(page = %page_url, listings = links.len(), "results page");

        // The next-page target is read off the results document now, before
        // detail visits replace it in the session.
        let next = olx_scraper::find_next_page(browser.document(), &page_url);

        for url in links {
            if let Some(max) = options.max_items {
                if stats.listings_scraped >= max {
                    println!("Reached maximum number of items ({}), stopping", max);
                    break 'crawl;
                }
            }

            match olx_scraper::scrape_listing(browser, &url) {
                Ok(listing) => {
                    tracing::info!(url = %url, title = %listing.title, "scraped listing");
                    if let Err(e) = sink.insert_row(row, &listing.to_row()) {
                        tracing::warn!(url = %url, row, error = %format!("{:#}", e), "sink write failed, continuing");
                        stats.sink_failures += 1;
                    }
                    row += 1;
                    stats.listings_scraped += 1;
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %format!("{:#}", e), "skipping listing");
                    stats.listings_skipped += 1;
                }
            }

            std::thread::sleep(options.listing_delay);
        }

        if let Some(max) = options.max_pages {
            if stats.pages >= max {
                println!("Reached maximum number of pages ({}), stopping", max);
                break;
            }
        }

        match advance(browser, next.as_deref(), options) {
            Pagination::Advanced => {}
            Pagination::NoMoreControl => {
                tracing::info!("no next-page control, crawl complete");
                break;
            }
            Pagination::NavigationError(e) => {
                tracing::error!(error = %e, "pagination failed, ending crawl");
                break;
            }
        }
    }

    Ok(stats)
}

fn advance<B: Browser>(browser: &mut B, next: Option<&str>, options: &CrawlOptions) -> Pagination {
    let Some(next_url) = next else {
        return Pagination::NoMoreControl;
    };

    let mut last_error = String::new();
    for attempt in 0..=options.nav_retries {
        match browser.goto(next_url, olx_scraper::CARD_SELECTOR) {
            Ok(()) => return Pagination::Advanced,
            Err(e) => {
                last_error = format!("{:#}", e);
                tracing::warn!(url = next_url, attempt, error = %last_error, "next-page navigation failed");
                std::thread::sleep(options.nav_retry_delay);
            }
        }
    }

    Pagination::NavigationError(last_error)
}
